// ============================================================
// Layer 3 — Bahdanau Attention
// ============================================================
// Additive attention over the encoder outputs, and the GRU
// cell it wraps in the decoder's middle stage.
//
// Per decoder step, with memory M = encoder outputs [b, T, 2·enc]:
//
//   keys      = memory_layer(M)                (once per batch)
//   score_t   = v · tanh(keys_t + query_layer(q))
//   score_t   = -1e9 where t >= input length
//   α         = softmax(score)                  [b, T]
//   context   = Σ_t α_t · M_t                   [b, 2·enc]
//
// The wrapped GRU step:
//
//   cell_out  = GRU([input, previous attention], cell_state)
//   α, ctx    = attend(query = cell_out)
//   attention = attention_layer([cell_out, ctx])
//
// `attention` is both the stage output and part of the next
// step's state. Alignments are optionally appended to a
// history for visualisation.
//
// Reference: Bahdanau et al. (2015) Neural Machine Translation
//            by Jointly Learning to Align and Translate

use burn::{
    nn::{Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

use crate::ml::cells::{GruCell, GruCellConfig};
use crate::ml::tensor_ops::sequence_mask;

/// Score written into padded memory positions before the softmax.
const MASKED_SCORE: f64 = -1.0e9;

fn projection<B: Backend>(inputs: usize, outputs: usize, device: &B::Device) -> Linear<B> {
    LinearConfig::new(inputs, outputs)
        .with_bias(false)
        .with_initializer(Initializer::XavierUniform { gain: 1.0 })
        .init(device)
}

// ─── AttentionMemory ──────────────────────────────────────────────────────────
/// Encoder outputs prepared once per batch.
#[derive(Debug, Clone)]
pub struct AttentionMemory<B: Backend> {
    /// Encoder outputs — [batch, time, memory_size]
    pub values: Tensor<B, 3>,

    /// memory_layer(values) — [batch, time, num_units]
    pub keys: Tensor<B, 3>,

    /// true where a memory position is padding — [batch, time]
    pub padding: Option<Tensor<B, 2, Bool>>,
}

impl<B: Backend> AttentionMemory<B> {
    pub fn batch_size(&self) -> usize {
        self.values.dims()[0]
    }

    pub fn time(&self) -> usize {
        self.values.dims()[1]
    }
}

// ─── BahdanauAttention ────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct BahdanauAttentionConfig {
    pub num_units:   usize,
    pub query_size:  usize,
    pub memory_size: usize,
}

impl BahdanauAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BahdanauAttention<B> {
        BahdanauAttention {
            memory_layer: projection(self.memory_size, self.num_units, device),
            query_layer:  projection(self.query_size, self.num_units, device),
            score_layer:  projection(self.num_units, 1, device),
        }
    }
}

#[derive(Module, Debug)]
pub struct BahdanauAttention<B: Backend> {
    pub memory_layer: Linear<B>,
    pub query_layer:  Linear<B>,
    /// the `v` vector, as a 1-output projection
    pub score_layer:  Linear<B>,
}

impl<B: Backend> BahdanauAttention<B> {
    /// Precompute keys and the padding mask for a batch of encoder outputs.
    pub fn prepare(&self, values: Tensor<B, 3>, lengths: Option<&[usize]>) -> AttentionMemory<B> {
        let time = values.dims()[1];
        let device = values.device();
        let keys = self.memory_layer.forward(values.clone());
        let padding = lengths.map(|lengths| sequence_mask::<B>(lengths, time, &device).lower_elem(0.5));
        AttentionMemory { values, keys, padding }
    }

    /// query: [batch, query_size] → (context [batch, memory_size], alignments [batch, time])
    pub fn attend(&self, query: Tensor<B, 2>, memory: &AttentionMemory<B>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, time, units] = memory.keys.dims();
        let memory_size = memory.values.dims()[2];

        let processed = self
            .query_layer
            .forward(query)
            .reshape([batch, 1, units])
            .expand([batch, time, units]);
        let energy = (memory.keys.clone() + processed).tanh();
        let mut scores = self.score_layer.forward(energy).reshape([batch, time]);
        if let Some(padding) = &memory.padding {
            scores = scores.mask_fill(padding.clone(), MASKED_SCORE);
        }

        let alignments = softmax(scores, 1);
        let context = alignments
            .clone()
            .reshape([batch, 1, time])
            .matmul(memory.values.clone())
            .reshape([batch, memory_size]);

        (context, alignments)
    }
}

// ─── AttentionState ───────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct AttentionState<B: Backend> {
    /// Wrapped GRU state — [batch, cell_size]
    pub cell: Tensor<B, 2>,

    /// Last attention output — [batch, attention_size]
    pub attention: Tensor<B, 2>,

    /// Last alignments — [batch, memory time]
    pub alignments: Tensor<B, 2>,

    /// One [batch, memory time] entry per step, when retained
    pub history: Option<Vec<Tensor<B, 2>>>,
}

impl<B: Backend> AttentionState<B> {
    /// Same tensors, no history.
    pub fn without_history(&self) -> Self {
        Self {
            cell:       self.cell.clone(),
            attention:  self.attention.clone(),
            alignments: self.alignments.clone(),
            history:    None,
        }
    }

    /// Stack the retained alignments into [batch, steps, memory time].
    pub fn alignment_history(&self) -> Option<Tensor<B, 3>> {
        match &self.history {
            Some(steps) if !steps.is_empty() => Some(Tensor::stack(steps.clone(), 1)),
            _ => None,
        }
    }
}

// ─── AttentionGru ─────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct AttentionGruConfig {
    pub input_size:     usize,
    pub cell_size:      usize,
    pub memory_size:    usize,
    pub attention_size: usize,
}

impl AttentionGruConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AttentionGru<B> {
        AttentionGru {
            cell: GruCellConfig::new(self.input_size + self.attention_size, self.cell_size).init(device),
            mechanism: BahdanauAttentionConfig::new(self.memory_size, self.cell_size, self.memory_size)
                .init(device),
            attention_layer: projection(self.cell_size + self.memory_size, self.attention_size, device),
            attention_size: self.attention_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct AttentionGru<B: Backend> {
    pub cell:            GruCell<B>,
    pub mechanism:       BahdanauAttention<B>,
    pub attention_layer: Linear<B>,
    pub attention_size:  usize,
}

impl<B: Backend> AttentionGru<B> {
    pub fn zero_state(&self, memory: &AttentionMemory<B>, keep_history: bool) -> AttentionState<B> {
        let batch = memory.batch_size();
        let device = memory.values.device();
        AttentionState {
            cell:       Tensor::zeros([batch, self.cell.hidden_size], &device),
            attention:  Tensor::zeros([batch, self.attention_size], &device),
            alignments: Tensor::zeros([batch, memory.time()], &device),
            history:    keep_history.then(Vec::new),
        }
    }

    /// One step. Consumes `state` so the alignment history is extended in place.
    pub fn forward(
        &self,
        input:  Tensor<B, 2>,
        state:  AttentionState<B>,
        memory: &AttentionMemory<B>,
    ) -> (Tensor<B, 2>, AttentionState<B>) {
        let AttentionState { cell, attention, history, .. } = state;
        let cell_input = Tensor::cat(vec![input, attention], 1);
        let cell_output = self.cell.forward(cell_input, cell);

        let (context, alignments) = self.mechanism.attend(cell_output.clone(), memory);
        let attention = self
            .attention_layer
            .forward(Tensor::cat(vec![cell_output.clone(), context], 1));

        let mut history = history;
        if let Some(steps) = history.as_mut() {
            steps.push(alignments.clone());
        }

        let next = AttentionState {
            cell: cell_output,
            attention: attention.clone(),
            alignments,
            history,
        };
        (attention, next)
    }
}
