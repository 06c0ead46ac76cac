// ============================================================
// Layer 5 — Co-Learning Networks
// ============================================================
// Two transformer encoders trained together:
//
//   MaskerNet   tokens [B,S] → probabilities [B,S]
//               softmax over POSITIONS: "how worth masking
//               is each token of this sequence"
//
//   LearnerNet  tokens [B,S] + masked flat indices [N]
//               → vocabulary logits [N,V], evaluated only at
//               the masked positions
//
// The loss engine sees them only through the `Masker` and
// `Predictor` traits, so any network (or a test stub) can be
// plugged in.
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};

use crate::data::batcher::MlmBatch;

/// Logit assigned to padding positions before the masker softmax
const PAD_SCORE: f32 = -1.0e4;

// ─── Collaborator traits ──────────────────────────────────────────────────────
/// Produces the per-position masking distribution.
pub trait Masker<B: Backend> {
    /// tokens: [batch, seq_len] → probabilities [batch, seq_len], rows sum to 1
    fn masking_probabilities(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2>;
}

/// Predicts the original token at masked positions.
pub trait Predictor<B: Backend> {
    /// `masked` holds row-major flat indices into [batch * seq_len].
    /// Returns [masked.len(), vocab] logits, or [batch * seq_len, vocab]
    /// when `masked` is `None`.
    fn masked_logits(
        &self,
        tokens: Tensor<B, 2, Int>,
        masked: Option<Tensor<B, 1, Int>>,
    ) -> Tensor<B, 2>;

    /// Supervision targets aligned with `src_tokens`, shape [batch, seq_len].
    fn get_targets(&self, batch: &MlmBatch<B>) -> Tensor<B, 2, Int> {
        batch.target.clone()
    }
}

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct CoLearnerConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    pub dropout:     f64,
    pub pad_id:      u32,
}

impl CoLearnerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CoLearnerModel<B> {
        let masker = MaskerNet {
            encoder: self.build_encoder(device),
            score:   LinearConfig::new(self.d_model, 1).init(device),
            pad_id:  self.pad_id as usize,
        };
        let learner = LearnerNet {
            encoder: self.build_encoder(device),
            lm_head: LinearConfig::new(self.d_model, self.vocab_size).init(device),
        };
        CoLearnerModel { masker, learner }
    }

    fn build_encoder<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let layers = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        Encoder {
            token_embedding:    EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            position_embedding: EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device),
            layers,
            final_norm: LayerNormConfig::new(self.d_model).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:   LayerNormConfig::new(self.d_model).init(device),
            norm2:   LayerNormConfig::new(self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── Shared encoder ───────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attn_output = self.self_attn.forward(MhaInput::self_attn(x.clone())).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub dropout:            Dropout,
}

impl<B: Backend> Encoder<B> {
    /// tokens: [batch, seq_len] → hidden states [batch, seq_len, d_model]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = tokens.dims();
        let tok_emb = self.token_embedding.forward(tokens);

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for layer in &self.layers {
            x = layer.forward(x);
        }
        self.final_norm.forward(x)
    }
}

// ─── Masker ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MaskerNet<B: Backend> {
    pub encoder: Encoder<B>,
    pub score:   Linear<B>,
    pub pad_id:  usize,
}

impl<B: Backend> MaskerNet<B> {
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, seq_len] = tokens.dims();
        let pad_mask = tokens.clone().equal_elem(self.pad_id as i64);

        let hidden = self.encoder.forward(tokens);
        let scores = self.score
            .forward(hidden)
            .reshape([batch_size, seq_len])
            .mask_fill(pad_mask, PAD_SCORE);

        activation::softmax(scores, 1)
    }
}

// ─── Learner ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct LearnerNet<B: Backend> {
    pub encoder: Encoder<B>,
    pub lm_head: Linear<B>,
}

impl<B: Backend> LearnerNet<B> {
    pub fn forward(
        &self,
        tokens: Tensor<B, 2, Int>,
        masked: Option<Tensor<B, 1, Int>>,
    ) -> Tensor<B, 2> {
        let [batch_size, seq_len] = tokens.dims();
        let hidden  = self.encoder.forward(tokens);
        let d_model = hidden.dims()[2];
        let flat    = hidden.reshape([batch_size * seq_len, d_model]);

        let flat = match masked {
            Some(index) => flat.select(0, index),
            None        => flat,
        };
        self.lm_head.forward(flat)
    }
}

// ─── Joint model ──────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct CoLearnerModel<B: Backend> {
    pub masker:  MaskerNet<B>,
    pub learner: LearnerNet<B>,
}

impl<B: Backend> Masker<B> for CoLearnerModel<B> {
    fn masking_probabilities(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        self.masker.forward(tokens)
    }
}

impl<B: Backend> Predictor<B> for CoLearnerModel<B> {
    fn masked_logits(
        &self,
        tokens: Tensor<B, 2, Int>,
        masked: Option<Tensor<B, 1, Int>>,
    ) -> Tensor<B, 2> {
        self.learner.forward(tokens, masked)
    }
}
