//! HTTP surface tests driven through the real router with a miniature
//! zero-weight checkpoint, so no model download is involved. The miniature
//! tokenizer carries the same special tokens and language tags as the real
//! one, which is all the endpoint behavior depends on.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use tokenizers::Tokenizer;
use tower::ServiceExt;

use nllb_serve::nllb::{NllbConfig, NllbModel, NllbTokenizer, TranslationEngine};
use nllb_serve::server::router;

fn tiny_tokenizer() -> NllbTokenizer {
    let json = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0, "content": "<s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 1, "content": "<pad>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 2, "content": "</s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 3, "content": "<unk>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 4, "content": "eng_Latn", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 5, "content": "hin_Deva", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 6, "content": "ben_Beng", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {
                "<s>": 0, "<pad>": 1, "</s>": 2, "<unk>": 3,
                "eng_Latn": 4, "hin_Deva": 5, "ben_Beng": 6,
                "hello": 7, "world": 8, "how": 9, "are": 10, "you": 11
            },
            "unk_token": "<unk>"
        }
    }"#;
    let inner = Tokenizer::from_bytes(json.as_bytes()).expect("valid tokenizer json");
    NllbTokenizer::from_tokenizer(inner)
}

fn tiny_engine() -> TranslationEngine {
    let config = NllbConfig {
        d_model: 16,
        encoder_layers: 2,
        decoder_layers: 2,
        encoder_attention_heads: 2,
        decoder_attention_heads: 2,
        encoder_ffn_dim: 32,
        decoder_ffn_dim: 32,
        vocab_size: 16,
        max_position_embeddings: 64,
        ..NllbConfig::default()
    };
    let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
    let model = NllbModel::load(&config, vb).expect("tiny model builds");
    TranslationEngine::new(model, tiny_tokenizer(), Device::Cpu, 8)
}

fn app() -> Router {
    router(Arc::new(tiny_engine()))
}

async fn post_translate(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/translate")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn translate_with_defaults_succeeds() {
    let (status, body) = post_translate(app(), r#"{"text": "hello world"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["translation"].is_string());
    assert!(body.get("detail").is_none());
}

#[tokio::test]
async fn human_readable_names_resolve_through_the_table() {
    let (status, body) = post_translate(
        app(),
        r#"{"text": "hello", "src_lang": "English", "tgt_lang": "Hindi"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["translation"].is_string());
}

#[tokio::test]
async fn raw_codes_pass_through_unchanged() {
    let (status, body) = post_translate(
        app(),
        r#"{"text": "hello", "src_lang": "ben_Beng", "tgt_lang": "eng_Latn"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["translation"].is_string());
}

#[tokio::test]
async fn unknown_language_code_yields_500_with_detail() {
    let (status, body) = post_translate(
        app(),
        r#"{"text": "hello", "tgt_lang": "xyz_Bogus"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().expect("detail is a string");
    assert!(!detail.is_empty());
    assert!(detail.contains("xyz_Bogus"));
    assert!(body.get("translation").is_none());
}

#[tokio::test]
async fn unknown_source_name_is_treated_as_a_raw_code_and_rejected() {
    let (status, body) = post_translate(
        app(),
        r#"{"text": "hello", "src_lang": "Klingon"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("Klingon"));
}

#[tokio::test]
async fn identical_requests_produce_identical_translations() {
    let app = app();
    let body = r#"{"text": "hello how are you"}"#;
    let (status_a, first) = post_translate(app.clone(), body).await;
    let (status_b, second) = post_translate(app, body).await;
    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_b, StatusCode::OK);
    assert_eq!(first["translation"], second["translation"]);
}

#[tokio::test]
async fn concurrent_requests_with_different_sources_both_succeed() {
    let app = app();
    let english = post_translate(
        app.clone(),
        r#"{"text": "hello", "src_lang": "English", "tgt_lang": "Hindi"}"#,
    );
    let bengali = post_translate(
        app,
        r#"{"text": "hello", "src_lang": "Bengali", "tgt_lang": "English"}"#,
    );

    let ((status_a, body_a), (status_b, body_b)) = tokio::join!(english, bengali);
    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_b, StatusCode::OK);
    assert!(body_a["translation"].is_string());
    assert!(body_b["translation"].is_string());
}

#[tokio::test]
async fn missing_text_field_is_rejected_before_the_handler() {
    let (status, _) = post_translate(app(), r#"{"src_lang": "English"}"#).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn health_check_responds() {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn languages_endpoint_lists_the_table() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/languages")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["English"], "eng_Latn");
    assert_eq!(value["Hindi"], "hin_Deva");
    assert_eq!(value.as_object().unwrap().len(), 11);
}

#[tokio::test]
async fn encoding_is_tagged_with_the_requested_source_language() {
    let tokenizer = tiny_tokenizer();
    let english = tokenizer.encode("hello world", "eng_Latn").unwrap();
    let bengali = tokenizer.encode("hello world", "ben_Beng").unwrap();

    // Layout: [src_lang] subwords [eos].
    assert_eq!(english.first(), Some(&4));
    assert_eq!(bengali.first(), Some(&6));
    assert_eq!(english.last(), Some(&2));
    assert_eq!(english[1..], bengali[1..]);
}

#[tokio::test]
async fn unknown_tag_is_rejected_by_the_tokenizer() {
    let tokenizer = tiny_tokenizer();
    let err = tokenizer.lang_id("xyz_Bogus").unwrap_err();
    assert!(err.to_string().contains("xyz_Bogus"));
}
