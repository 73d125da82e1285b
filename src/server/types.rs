use serde::{Deserialize, Serialize};

use crate::lang;

fn default_src_lang() -> String {
    lang::DEFAULT_SRC_LANG.to_string()
}

fn default_tgt_lang() -> String {
    lang::DEFAULT_TGT_LANG.to_string()
}

/// Request for translation
#[derive(Deserialize, Serialize, Clone)]
pub struct TranslateRequest {
    pub text: String,
    #[serde(default = "default_src_lang")]
    pub src_lang: String,
    #[serde(default = "default_tgt_lang")]
    pub tgt_lang: String,
}

/// Response for a successful translation
#[derive(Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translation: String,
}

/// Response for a failed translation
#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
