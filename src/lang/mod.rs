//! Mapping from human-readable language names to NLLB language-tag codes.
//!
//! The table is static and read-only for the lifetime of the process.
//! Values that are not table keys are treated as already being raw NLLB
//! codes and passed through unchanged; the tokenizer vocabulary is the
//! final authority on whether a code is usable.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

/// Default source language when a request omits `src_lang`.
pub const DEFAULT_SRC_LANG: &str = "eng_Latn";

/// Default target language when a request omits `tgt_lang`.
pub const DEFAULT_TGT_LANG: &str = "hin_Deva";

static LANG_MAP: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("English", "eng_Latn"),
        ("Hindi", "hin_Deva"),
        ("Bengali", "ben_Beng"),
        ("Marathi", "mar_Deva"),
        ("Telugu", "tel_Telu"),
        ("Tamil", "tam_Taml"),
        ("Gujarati", "guj_Gujr"),
        ("Kannada", "kan_Knda"),
        ("Odia", "ory_Orya"),
        ("Malayalam", "mal_Mlym"),
        ("Punjabi", "pan_Guru"),
    ])
});

/// Resolves a request-supplied language identifier to an NLLB code.
///
/// Known human-readable names map to their code; anything else is returned
/// unchanged.
pub fn resolve(lang: &str) -> String {
    match LANG_MAP.get(lang) {
        Some(code) => (*code).to_string(),
        None => lang.to_string(),
    }
}

/// The full name-to-code table, for the listing endpoint.
pub fn table() -> &'static BTreeMap<&'static str, &'static str> {
    &LANG_MAP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_resolve_to_codes() {
        assert_eq!(resolve("English"), "eng_Latn");
        assert_eq!(resolve("Hindi"), "hin_Deva");
        assert_eq!(resolve("Punjabi"), "pan_Guru");
    }

    #[test]
    fn unknown_values_pass_through_unchanged() {
        assert_eq!(resolve("eng_Latn"), "eng_Latn");
        assert_eq!(resolve("xyz_Bogus"), "xyz_Bogus");
        assert_eq!(resolve(""), "");
    }

    #[test]
    fn table_holds_the_eleven_supported_names() {
        assert_eq!(table().len(), 11);
        assert_eq!(table().get("Odia"), Some(&"ory_Orya"));
    }
}
