use std::fs;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use tracing::info;

use super::config::NllbConfig;
use super::model::NllbModel;
use super::tokenizer::NllbTokenizer;
use crate::config::Settings;
use crate::error::{Result, TranslateError};

/// The process-wide translation handle.
///
/// Holds the loaded model, its tokenizer, the execution device and the
/// generation cap. Constructed once at startup and immutable afterwards;
/// request handlers share it behind an `Arc` and only ever take `&self`.
pub struct TranslationEngine {
    model: NllbModel,
    tokenizer: NllbTokenizer,
    device: Device,
    max_target_length: usize,
}

impl TranslationEngine {
    /// Assembles an engine from already-loaded parts.
    pub fn new(
        model: NllbModel,
        tokenizer: NllbTokenizer,
        device: Device,
        max_target_length: usize,
    ) -> Self {
        Self {
            model,
            tokenizer,
            device,
            max_target_length,
        }
    }

    /// Loads the checkpoint named by the settings. Called exactly once,
    /// before any request is served; a failure here is fatal to the
    /// process. No retries, no fallback model, no lazy loading.
    pub fn load(settings: &Settings) -> Result<Self> {
        let dir = &settings.model.directory;
        info!("Loading {} from {}", settings.model.name, dir.display());

        // Accelerator if present, otherwise CPU.
        let device = Device::cuda_if_available(0)
            .map_err(|e| TranslateError::ModelLoad(format!("device probe failed: {}", e)))?;
        info!(
            "Using {} for inference",
            if device.is_cuda() { "cuda" } else { "cpu" }
        );

        let config_raw = fs::read_to_string(dir.join("config.json")).map_err(|e| {
            TranslateError::ModelLoad(format!("failed to read config.json: {}", e))
        })?;
        let config: NllbConfig = serde_json::from_str(&config_raw).map_err(|e| {
            TranslateError::ModelLoad(format!("failed to parse config.json: {}", e))
        })?;

        let tensors = candle_core::safetensors::load(dir.join("model.safetensors"), &device)
            .map_err(|e| TranslateError::ModelLoad(format!("failed to load weights: {}", e)))?;
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
        let model = NllbModel::load(&config, vb)
            .map_err(|e| TranslateError::ModelLoad(format!("failed to build model: {}", e)))?;

        let tokenizer = NllbTokenizer::from_file(&dir.join("tokenizer.json"))?;

        info!("Model loaded");

        Ok(Self::new(
            model,
            tokenizer,
            device,
            settings.generation.max_target_length,
        ))
    }

    /// Translates `text` from `src_code` to `tgt_code`, both raw NLLB
    /// language tags. Encode, generate constrained to begin with the target
    /// tag, decode. `&self` throughout: concurrent calls cannot interfere.
    pub fn translate(&self, text: &str, src_code: &str, tgt_code: &str) -> Result<String> {
        let tgt_lang_id = self.tokenizer.lang_id(tgt_code)?;
        let input_ids = self.tokenizer.encode(text, src_code)?;

        let input = Tensor::new(input_ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let output_ids = self
            .model
            .generate(&input, tgt_lang_id, self.max_target_length)?;

        self.tokenizer.decode(&output_ids)
    }
}
