use serde::Deserialize;

/// Feed-forward activation, read from the checkpoint configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Gelu,
}

impl Default for Activation {
    fn default() -> Self {
        Activation::Relu
    }
}

/// Checkpoint configuration, deserialized from the model directory's
/// config.json. Field names follow the serialized form; defaults match
/// facebook/nllb-200-distilled-600M.
#[derive(Debug, Clone, Deserialize)]
pub struct NllbConfig {
    #[serde(default = "default_d_model")]
    pub d_model: usize,
    #[serde(default = "default_layers")]
    pub encoder_layers: usize,
    #[serde(default = "default_layers")]
    pub decoder_layers: usize,
    #[serde(default = "default_heads")]
    pub encoder_attention_heads: usize,
    #[serde(default = "default_heads")]
    pub decoder_attention_heads: usize,
    #[serde(default = "default_ffn_dim")]
    pub encoder_ffn_dim: usize,
    #[serde(default = "default_ffn_dim")]
    pub decoder_ffn_dim: usize,
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
    #[serde(default = "default_max_positions")]
    pub max_position_embeddings: usize,
    #[serde(default = "default_pad")]
    pub pad_token_id: usize,
    #[serde(default = "default_bos")]
    pub bos_token_id: usize,
    #[serde(default = "default_eos")]
    pub eos_token_id: usize,
    #[serde(default = "default_eos")]
    pub decoder_start_token_id: usize,
    #[serde(default = "default_scale_embedding")]
    pub scale_embedding: bool,
    #[serde(default)]
    pub activation_function: Activation,
}

fn default_d_model() -> usize {
    1024
}

fn default_layers() -> usize {
    12
}

fn default_heads() -> usize {
    16
}

fn default_ffn_dim() -> usize {
    4096
}

fn default_vocab_size() -> usize {
    256206
}

fn default_max_positions() -> usize {
    1024
}

fn default_pad() -> usize {
    1
}

fn default_bos() -> usize {
    0
}

fn default_eos() -> usize {
    2
}

fn default_scale_embedding() -> bool {
    true
}

impl Default for NllbConfig {
    fn default() -> Self {
        Self {
            d_model: default_d_model(),
            encoder_layers: default_layers(),
            decoder_layers: default_layers(),
            encoder_attention_heads: default_heads(),
            decoder_attention_heads: default_heads(),
            encoder_ffn_dim: default_ffn_dim(),
            decoder_ffn_dim: default_ffn_dim(),
            vocab_size: default_vocab_size(),
            max_position_embeddings: default_max_positions(),
            pad_token_id: default_pad(),
            bos_token_id: default_bos(),
            eos_token_id: default_eos(),
            decoder_start_token_id: default_eos(),
            scale_embedding: default_scale_embedding(),
            activation_function: Activation::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_distilled_600m_checkpoint() {
        let config = NllbConfig::default();
        assert_eq!(config.d_model, 1024);
        assert_eq!(config.encoder_layers, 12);
        assert_eq!(config.vocab_size, 256206);
        assert_eq!(config.pad_token_id, 1);
        assert_eq!(config.decoder_start_token_id, 2);
        assert!(config.scale_embedding);
        assert_eq!(config.activation_function, Activation::Relu);
    }

    #[test]
    fn partial_config_json_overrides_defaults() {
        let config: NllbConfig =
            serde_json::from_str(r#"{"d_model": 16, "activation_function": "gelu"}"#)
                .expect("valid config");
        assert_eq!(config.d_model, 16);
        assert_eq!(config.activation_function, Activation::Gelu);
        assert_eq!(config.encoder_layers, 12);
    }
}
