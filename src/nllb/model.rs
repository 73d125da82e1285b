//! The NLLB-200 transformer (M2M-100 architecture) in candle.
//!
//! Weight names follow the Hugging Face checkpoint layout
//! (`model.encoder.layers.N.self_attn.q_proj` and so on). The input
//! embedding is shared between encoder, decoder and the output projection,
//! which is how the checkpoint serializes it: only `model.shared.weight`
//! carries the matrix and `lm_head` is tied to it.

use candle_core::{DType, Device, IndexOp, Module, Tensor, D};
use candle_nn::{layer_norm, linear, Embedding, LayerNorm, Linear, VarBuilder};

use super::config::{Activation, NllbConfig};

/// Fairseq-style sinusoidal position table. Positions are never learned, so
/// the table is computed at load time instead of being read from the
/// checkpoint. The row at `padding_idx` is zeroed and real positions start
/// at `padding_idx + 1`.
pub(crate) fn sinusoidal_position_embedding(
    num_positions: usize,
    embed_dim: usize,
    padding_idx: usize,
    device: &Device,
) -> candle_core::Result<Tensor> {
    let half_dim = embed_dim / 2;
    let emb_scale = (10000f64).ln() / (half_dim - 1) as f64;

    let positions: Vec<f32> = (0..num_positions).map(|i| i as f32).collect();
    let dim_scale: Vec<f32> = (0..half_dim)
        .map(|i| (-emb_scale * i as f64).exp() as f32)
        .collect();

    let positions = Tensor::new(positions.as_slice(), device)?.unsqueeze(1)?;
    let dim_scale = Tensor::new(dim_scale.as_slice(), device)?.unsqueeze(0)?;
    let emb = positions.broadcast_mul(&dim_scale)?;

    let emb = Tensor::cat(&[&emb.sin()?, &emb.cos()?], 1)?;

    if padding_idx >= num_positions {
        return Ok(emb);
    }

    let zeros = Tensor::zeros((1, embed_dim), DType::F32, device)?;
    let before = if padding_idx > 0 {
        Some(emb.i(0..padding_idx)?)
    } else {
        None
    };
    let after = if padding_idx < num_positions - 1 {
        Some(emb.i((padding_idx + 1)..)?)
    } else {
        None
    };
    let parts: Vec<&Tensor> = [before.as_ref(), Some(&zeros), after.as_ref()]
        .into_iter()
        .flatten()
        .collect();
    Tensor::cat(&parts, 0)
}

/// Additive causal mask for decoder self-attention: future positions get
/// negative infinity, shaped (1, 1, len, len) for broadcasting over batch
/// and heads.
pub(crate) fn causal_mask(seq_len: usize, device: &Device) -> candle_core::Result<Tensor> {
    let mut data = vec![0f32; seq_len * seq_len];
    for i in 0..seq_len {
        for j in (i + 1)..seq_len {
            data[i * seq_len + j] = f32::NEG_INFINITY;
        }
    }
    let mask = Tensor::from_vec(data, (seq_len, seq_len), device)?;
    mask.unsqueeze(0)?.unsqueeze(0)
}

struct MultiHeadAttention {
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    out_proj: Linear,
    num_heads: usize,
    head_dim: usize,
    scale: f64,
}

impl MultiHeadAttention {
    fn new(embed_dim: usize, num_heads: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let head_dim = embed_dim / num_heads;
        Ok(Self {
            q_proj: linear(embed_dim, embed_dim, vb.pp("q_proj"))?,
            k_proj: linear(embed_dim, embed_dim, vb.pp("k_proj"))?,
            v_proj: linear(embed_dim, embed_dim, vb.pp("v_proj"))?,
            out_proj: linear(embed_dim, embed_dim, vb.pp("out_proj"))?,
            num_heads,
            head_dim,
            scale: (head_dim as f64).powf(-0.5),
        })
    }

    fn forward(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
        attention_mask: Option<&Tensor>,
    ) -> candle_core::Result<Tensor> {
        let (batch_size, tgt_len, _) = query.dims3()?;
        let (_, src_len, _) = key.dims3()?;

        let q = self
            .q_proj
            .forward(query)?
            .reshape((batch_size, tgt_len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?;
        let k = self
            .k_proj
            .forward(key)?
            .reshape((batch_size, src_len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?;
        let v = self
            .v_proj
            .forward(value)?
            .reshape((batch_size, src_len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?;

        let mut attn_weights = (q.matmul(&k.transpose(2, 3)?)? * self.scale)?;
        if let Some(mask) = attention_mask {
            attn_weights = attn_weights.broadcast_add(mask)?;
        }
        let attn_weights = candle_nn::ops::softmax_last_dim(&attn_weights)?;

        let attn_output = attn_weights.matmul(&v)?.transpose(1, 2)?.reshape((
            batch_size,
            tgt_len,
            self.num_heads * self.head_dim,
        ))?;

        self.out_proj.forward(&attn_output)
    }
}

fn feed_forward(x: &Tensor, fc1: &Linear, fc2: &Linear, act: Activation) -> candle_core::Result<Tensor> {
    let x = fc1.forward(x)?;
    let x = match act {
        Activation::Relu => x.relu()?,
        Activation::Gelu => x.gelu()?,
    };
    fc2.forward(&x)
}

/// Pre-norm encoder layer: self-attention then feed-forward, residuals
/// around both.
struct EncoderLayer {
    self_attn: MultiHeadAttention,
    self_attn_layer_norm: LayerNorm,
    fc1: Linear,
    fc2: Linear,
    final_layer_norm: LayerNorm,
    activation: Activation,
}

impl EncoderLayer {
    fn new(config: &NllbConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        let embed_dim = config.d_model;
        Ok(Self {
            self_attn: MultiHeadAttention::new(
                embed_dim,
                config.encoder_attention_heads,
                vb.pp("self_attn"),
            )?,
            self_attn_layer_norm: layer_norm(embed_dim, 1e-5, vb.pp("self_attn_layer_norm"))?,
            fc1: linear(embed_dim, config.encoder_ffn_dim, vb.pp("fc1"))?,
            fc2: linear(config.encoder_ffn_dim, embed_dim, vb.pp("fc2"))?,
            final_layer_norm: layer_norm(embed_dim, 1e-5, vb.pp("final_layer_norm"))?,
            activation: config.activation_function,
        })
    }

    fn forward(&self, hidden_states: &Tensor) -> candle_core::Result<Tensor> {
        let residual = hidden_states;
        let hidden_states = self.self_attn_layer_norm.forward(hidden_states)?;
        let hidden_states =
            self.self_attn
                .forward(&hidden_states, &hidden_states, &hidden_states, None)?;
        let hidden_states = (residual + hidden_states)?;

        let residual = &hidden_states;
        let normed = self.final_layer_norm.forward(&hidden_states)?;
        let ffn = feed_forward(&normed, &self.fc1, &self.fc2, self.activation)?;
        residual + ffn
    }
}

/// Pre-norm decoder layer: causal self-attention, cross-attention over the
/// encoder output, feed-forward.
struct DecoderLayer {
    self_attn: MultiHeadAttention,
    self_attn_layer_norm: LayerNorm,
    encoder_attn: MultiHeadAttention,
    encoder_attn_layer_norm: LayerNorm,
    fc1: Linear,
    fc2: Linear,
    final_layer_norm: LayerNorm,
    activation: Activation,
}

impl DecoderLayer {
    fn new(config: &NllbConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        let embed_dim = config.d_model;
        Ok(Self {
            self_attn: MultiHeadAttention::new(
                embed_dim,
                config.decoder_attention_heads,
                vb.pp("self_attn"),
            )?,
            self_attn_layer_norm: layer_norm(embed_dim, 1e-5, vb.pp("self_attn_layer_norm"))?,
            encoder_attn: MultiHeadAttention::new(
                embed_dim,
                config.decoder_attention_heads,
                vb.pp("encoder_attn"),
            )?,
            encoder_attn_layer_norm: layer_norm(embed_dim, 1e-5, vb.pp("encoder_attn_layer_norm"))?,
            fc1: linear(embed_dim, config.decoder_ffn_dim, vb.pp("fc1"))?,
            fc2: linear(config.decoder_ffn_dim, embed_dim, vb.pp("fc2"))?,
            final_layer_norm: layer_norm(embed_dim, 1e-5, vb.pp("final_layer_norm"))?,
            activation: config.activation_function,
        })
    }

    fn forward(
        &self,
        hidden_states: &Tensor,
        encoder_hidden_states: &Tensor,
        self_attn_mask: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let residual = hidden_states;
        let hidden_states = self.self_attn_layer_norm.forward(hidden_states)?;
        let hidden_states = self.self_attn.forward(
            &hidden_states,
            &hidden_states,
            &hidden_states,
            Some(self_attn_mask),
        )?;
        let hidden_states = (residual + hidden_states)?;

        let residual = &hidden_states;
        let normed = self.encoder_attn_layer_norm.forward(&hidden_states)?;
        let hidden_states = self.encoder_attn.forward(
            &normed,
            encoder_hidden_states,
            encoder_hidden_states,
            None,
        )?;
        let hidden_states = (residual + hidden_states)?;

        let residual = &hidden_states;
        let normed = self.final_layer_norm.forward(&hidden_states)?;
        let ffn = feed_forward(&normed, &self.fc1, &self.fc2, self.activation)?;
        residual + ffn
    }
}

struct Encoder {
    embed_tokens: Embedding,
    embed_positions: Tensor,
    embed_scale: f64,
    layernorm_embedding: LayerNorm,
    layers: Vec<EncoderLayer>,
    layer_norm: LayerNorm,
    padding_idx: usize,
}

impl Encoder {
    fn new(
        config: &NllbConfig,
        embed_tokens: Embedding,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let embed_dim = config.d_model;
        let embed_positions = sinusoidal_position_embedding(
            config.max_position_embeddings + config.pad_token_id + 1,
            embed_dim,
            config.pad_token_id,
            vb.device(),
        )?;
        let layers = (0..config.encoder_layers)
            .map(|i| EncoderLayer::new(config, vb.pp(format!("layers.{}", i))))
            .collect::<candle_core::Result<Vec<_>>>()?;
        Ok(Self {
            embed_tokens,
            embed_positions,
            embed_scale: if config.scale_embedding {
                (embed_dim as f64).sqrt()
            } else {
                1.0
            },
            layernorm_embedding: layer_norm(embed_dim, 1e-5, vb.pp("layernorm_embedding"))?,
            layers,
            layer_norm: layer_norm(embed_dim, 1e-5, vb.pp("layer_norm"))?,
            padding_idx: config.pad_token_id,
        })
    }

    fn forward(&self, input_ids: &Tensor) -> candle_core::Result<Tensor> {
        let (batch_size, seq_len) = input_ids.dims2()?;

        let inputs_embeds = (self.embed_tokens.forward(input_ids)? * self.embed_scale)?;

        // Unpadded single sequences: positions run from padding_idx + 1.
        let position_ids: Vec<u32> = (0..seq_len)
            .map(|i| (self.padding_idx + 1 + i) as u32)
            .collect();
        let position_ids = Tensor::new(position_ids.as_slice(), input_ids.device())?;
        let positions = self.embed_positions.index_select(&position_ids, 0)?;
        let embed_dim = positions.dim(1)?;
        let positions = positions
            .unsqueeze(0)?
            .broadcast_as((batch_size, seq_len, embed_dim))?;

        let mut hidden_states = inputs_embeds.add(&positions)?;
        hidden_states = self.layernorm_embedding.forward(&hidden_states)?;

        for layer in &self.layers {
            hidden_states = layer.forward(&hidden_states)?;
        }

        self.layer_norm.forward(&hidden_states)
    }
}

struct Decoder {
    embed_tokens: Embedding,
    embed_positions: Tensor,
    embed_scale: f64,
    layernorm_embedding: LayerNorm,
    layers: Vec<DecoderLayer>,
    layer_norm: LayerNorm,
    padding_idx: usize,
}

impl Decoder {
    fn new(
        config: &NllbConfig,
        embed_tokens: Embedding,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let embed_dim = config.d_model;
        let embed_positions = sinusoidal_position_embedding(
            config.max_position_embeddings + config.pad_token_id + 1,
            embed_dim,
            config.pad_token_id,
            vb.device(),
        )?;
        let layers = (0..config.decoder_layers)
            .map(|i| DecoderLayer::new(config, vb.pp(format!("layers.{}", i))))
            .collect::<candle_core::Result<Vec<_>>>()?;
        Ok(Self {
            embed_tokens,
            embed_positions,
            embed_scale: if config.scale_embedding {
                (embed_dim as f64).sqrt()
            } else {
                1.0
            },
            layernorm_embedding: layer_norm(embed_dim, 1e-5, vb.pp("layernorm_embedding"))?,
            layers,
            layer_norm: layer_norm(embed_dim, 1e-5, vb.pp("layer_norm"))?,
            padding_idx: config.pad_token_id,
        })
    }

    fn forward(
        &self,
        input_ids: &Tensor,
        encoder_hidden_states: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let (batch_size, seq_len) = input_ids.dims2()?;

        let inputs_embeds = (self.embed_tokens.forward(input_ids)? * self.embed_scale)?;

        let position_ids: Vec<u32> = (0..seq_len)
            .map(|i| (self.padding_idx + 1 + i) as u32)
            .collect();
        let position_ids = Tensor::new(position_ids.as_slice(), input_ids.device())?;
        let positions = self.embed_positions.index_select(&position_ids, 0)?;
        let embed_dim = positions.dim(1)?;
        let positions = positions
            .unsqueeze(0)?
            .broadcast_as((batch_size, seq_len, embed_dim))?;

        let mut hidden_states = inputs_embeds.add(&positions)?;
        hidden_states = self.layernorm_embedding.forward(&hidden_states)?;

        let mask = causal_mask(seq_len, input_ids.device())?;

        for layer in &self.layers {
            hidden_states = layer.forward(&hidden_states, encoder_hidden_states, &mask)?;
        }

        self.layer_norm.forward(&hidden_states)
    }
}

/// The full encoder-decoder model with the tied output projection.
pub struct NllbModel {
    encoder: Encoder,
    decoder: Decoder,
    lm_head: Linear,
    decoder_start_token_id: u32,
    eos_token_id: u32,
}

impl NllbModel {
    /// Builds the model from a checkpoint's variables. `vb` must be rooted
    /// at the checkpoint top level so that `model.shared.weight` resolves.
    pub fn load(config: &NllbConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        let shared = vb.get(
            (config.vocab_size, config.d_model),
            "model.shared.weight",
        )?;
        let embed_tokens = Embedding::new(shared.clone(), config.d_model);
        // Output projection reuses the shared embedding matrix.
        let lm_head = Linear::new(shared, None);

        let encoder = Encoder::new(config, embed_tokens.clone(), vb.pp("model.encoder"))?;
        let decoder = Decoder::new(config, embed_tokens, vb.pp("model.decoder"))?;

        Ok(Self {
            encoder,
            decoder,
            lm_head,
            decoder_start_token_id: config.decoder_start_token_id as u32,
            eos_token_id: config.eos_token_id as u32,
        })
    }

    /// Greedy generation constrained to begin with the target-language tag.
    ///
    /// The decoder is seeded with `[decoder_start, forced_bos]` and extended
    /// one argmax token at a time until EOS or until the whole decoder
    /// sequence reaches `max_length` tokens. Returns the generated ids with
    /// the seed tokens stripped.
    pub fn generate(
        &self,
        input_ids: &Tensor,
        forced_bos_token_id: u32,
        max_length: usize,
    ) -> candle_core::Result<Vec<u32>> {
        let encoder_output = self.encoder.forward(input_ids)?;
        let device = encoder_output.device();

        let mut output_ids = vec![self.decoder_start_token_id, forced_bos_token_id];

        while output_ids.len() < max_length {
            let decoder_input = Tensor::new(output_ids.as_slice(), device)?.unsqueeze(0)?;
            let hidden_states = self.decoder.forward(&decoder_input, &encoder_output)?;
            let logits = self.lm_head.forward(&hidden_states)?;
            let last_logits = logits.i((0, output_ids.len() - 1))?;
            let next_token = last_logits.argmax(D::Minus1)?.to_scalar::<u32>()?;

            if next_token == self.eos_token_id {
                break;
            }
            output_ids.push(next_token);
        }

        Ok(output_ids.split_off(2))
    }
}
