//! Language-tag aware wrapper around the checkpoint's subword tokenizer.
//!
//! The source-language tag is an argument of `encode`, not a field mutated
//! on a shared object, so concurrent requests with different source
//! languages cannot contaminate each other.

use std::path::Path;

use tokenizers::Tokenizer;

use crate::error::{Result, TranslateError};

pub struct NllbTokenizer {
    inner: Tokenizer,
    eos_token_id: u32,
}

impl NllbTokenizer {
    /// Loads tokenizer.json from the model directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = Tokenizer::from_file(path)
            .map_err(|e| TranslateError::ModelLoad(format!("failed to load tokenizer: {}", e)))?;
        Ok(Self::from_tokenizer(inner))
    }

    /// Wraps an already-constructed tokenizer.
    pub fn from_tokenizer(inner: Tokenizer) -> Self {
        let eos_token_id = inner.token_to_id("</s>").unwrap_or(2);
        Self {
            inner,
            eos_token_id,
        }
    }

    /// Resolves a language tag to its vocabulary id. This is where
    /// unknown codes are rejected.
    pub fn lang_id(&self, code: &str) -> Result<u32> {
        self.inner
            .token_to_id(code)
            .ok_or_else(|| TranslateError::UnknownLanguageCode {
                code: code.to_string(),
            })
    }

    /// Encodes `text` as a source sequence: `[src_lang] subwords [eos]`.
    ///
    /// Pure function of its arguments; nothing on the tokenizer changes.
    pub fn encode(&self, text: &str, src_code: &str) -> Result<Vec<u32>> {
        let src_lang_id = self.lang_id(src_code)?;
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| TranslateError::Tokenize(e.to_string()))?;

        let mut ids = Vec::with_capacity(encoding.get_ids().len() + 2);
        ids.push(src_lang_id);
        ids.extend_from_slice(encoding.get_ids());
        ids.push(self.eos_token_id);
        Ok(ids)
    }

    /// Decodes generated ids to text, stripping special and language-tag
    /// tokens.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map(|s| s.trim().to_string())
            .map_err(|e| TranslateError::Tokenize(e.to_string()))
    }
}
