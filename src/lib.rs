//! # nllb-serve
//!
//! An HTTP translation service that hosts the NLLB-200 multilingual
//! sequence-to-sequence model in-process. The model, its tokenizer and the
//! execution device are loaded exactly once at startup and shared immutably
//! with every request handler.
//!
//! ## Key Components
//!
//! - `TranslationEngine`: loads the checkpoint and runs encode/generate/decode
//! - `ApiServer`: the axum server exposing `POST /translate`
//! - `lang`: the static human-readable-name to NLLB-code table

pub mod config;
pub mod error;
pub mod lang;
pub mod nllb;
pub mod server;

pub use error::{Result, TranslateError};
pub use nllb::TranslationEngine;
