// ============================================================
// Layer 5 — Transformer QA Model
// ============================================================
// BERT-shaped encoder with a span head:
//
//   token + segment + position embeddings → LayerNorm
//       → N × (self-attention → add&norm → GELU FFN → add&norm)
//       → Linear(d_model, 2) → start_logits, end_logits
//
// The encoder is a module of its own so pretrained BERT weights
// can be loaded into it while the span head starts fresh.
//
// Padding positions are masked out of self-attention using the
// attention mask produced by the tokenizer.

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::data::batcher::InputBatch;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct QaModelConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    #[config(default = 256)]
    pub d_model:     usize,
    #[config(default = 8)]
    pub num_heads:   usize,
    #[config(default = 6)]
    pub num_layers:  usize,
    #[config(default = 1024)]
    pub d_ff:        usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
    #[config(default = 2)]
    pub type_vocab_size: usize,
    #[config(default = 1e-12)]
    pub layer_norm_eps: f64,
}

impl QaModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QaModel<B> {
        QaModel {
            encoder: self.init_encoder(device),
            qa_head: LinearConfig::new(self.d_model, 2).init(device),
        }
    }

    pub fn init_encoder<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        Encoder {
            token_embedding:    EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            segment_embedding:  EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device),
            position_embedding: EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device),
            embedding_norm:     self.layer_norm(device),
            layers,
            dropout:            DropoutConfig::new(self.dropout).init(),
        }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.d_model)
            .with_epsilon(self.layer_norm_eps)
            .init(device)
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = self.layer_norm(device);
        let norm2   = self.layer_norm(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

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
    /// `pad_mask`: [batch, seq_len], true where the position is padding.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input  = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

/// Embeddings plus the encoder stack; the part shared with BERT checkpoints.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub segment_embedding:  Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub embedding_norm:     LayerNorm<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub dropout:            Dropout,
}

impl<B: Backend> Encoder<B> {
    /// inputs: [batch, seq_len] each → hidden states [batch, seq_len, d_model]
    pub fn forward(&self, inputs: InputBatch<B>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = inputs.input_ids.dims();
        let pad_mask = inputs.attention_mask.equal_elem(0);

        let tok_emb = self.token_embedding.forward(inputs.input_ids);
        let seg_emb = self.segment_embedding.forward(inputs.token_type_ids);

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let mut x = self.dropout.forward(self.embedding_norm.forward(tok_emb + seg_emb + pos_emb));
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        x
    }
}

#[derive(Module, Debug)]
pub struct QaModel<B: Backend> {
    pub encoder: Encoder<B>,
    pub qa_head: Linear<B>,
}

pub struct QaModelOutput<B: Backend> {
    pub start_logits: Tensor<B, 2>,
    pub end_logits:   Tensor<B, 2>,
}

impl<B: Backend> QaModel<B> {
    /// Longest sequence the position embedding table can index.
    pub fn max_seq_len(&self) -> usize {
        self.encoder.position_embedding.weight.dims()[0]
    }

    /// inputs: [batch, seq_len] each → start_logits, end_logits: [batch, seq_len]
    pub fn forward(&self, inputs: InputBatch<B>) -> QaModelOutput<B> {
        let [batch_size, seq_len] = inputs.input_ids.dims();
        let x = self.encoder.forward(inputs); // [batch, seq_len, d_model]

        // Project to 2 logits per token then split into start / end.
        let logits = self.qa_head.forward(x); // [batch, seq_len, 2]
        let start_logits = logits.clone()
            .slice([0..batch_size, 0..seq_len, 0..1])
            .reshape([batch_size, seq_len]);
        let end_logits = logits
            .slice([0..batch_size, 0..seq_len, 1..2])
            .reshape([batch_size, seq_len]);

        QaModelOutput { start_logits, end_logits }
    }

    /// Loss = (CE_start + CE_end) / 2
    pub fn forward_loss(
        &self,
        inputs:          InputBatch<B>,
        start_positions: Tensor<B, 1, Int>,
        end_positions:   Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, QaModelOutput<B>) {
        let output = self.forward(inputs);
        let ce = CrossEntropyLossConfig::new().init(&output.start_logits.device());
        let loss = (ce.forward(output.start_logits.clone(), start_positions)
                  + ce.forward(output.end_logits.clone(),   end_positions)) / 2.0_f64;
        (loss, output)
    }
}
