// ============================================================
// Layer 3 — Attention Decoder
// ============================================================
// Three recurrent stages run as one ordered pipeline per step:
//
//   previous token (one-hot, output_size)
//       │
//       ▼
//   input GRU      (dec_rnn_size)       — projects the token
//       │
//       ▼
//   attention GRU  (2·enc, Bahdanau)    — attends over encoder
//       │
//       ▼
//   output GRU     (output_size)        — state = logits
//
// The decode loop is a small state machine over
//   (decoder state, current tokens, step, finished flags)
// driven by a FeedbackPolicy chosen once per decode:
//
//   Greedy     — feed back this step's argmax; an example is
//                finished once it emits end-of-sequence
//   Scheduled  — feed back the ground-truth next token, or with
//                probability p the model's own argmax; an
//                example is finished after its true length
//
// The loop stops at `max_iterations` or when every example is
// finished. Once an example is finished its emitted logits and
// ids are zero and its state is held (the step that finishes it
// is still emitted).

use burn::{prelude::*, tensor::TensorData};
use rand::{rngs::StdRng, Rng};

use crate::ml::attention::{AttentionGru, AttentionGruConfig, AttentionMemory, AttentionState};
use crate::ml::cells::{GruCell, GruCellConfig};
use crate::ml::tensor_ops::{blend_rows, one_hot_ids};

// ─── FeedbackPolicy ───────────────────────────────────────────────────────────
/// Chooses the next decoder input and the finished flags.
#[derive(Debug)]
pub enum FeedbackPolicy<'a> {
    Greedy {
        start_id: usize,
        end_id:   usize,
    },
    Scheduled {
        start_id:    usize,
        /// unpadded ground-truth outputs, one row per example
        targets:     Vec<Vec<usize>>,
        lengths:     Vec<usize>,
        /// chance of feeding back the model's own prediction
        probability: f64,
        rng:         &'a mut StdRng,
    },
}

impl<'a> FeedbackPolicy<'a> {
    pub fn greedy(start_id: usize, end_id: usize) -> Self {
        Self::Greedy { start_id, end_id }
    }

    pub fn scheduled(
        start_id:    usize,
        targets:     Vec<Vec<usize>>,
        lengths:     Vec<usize>,
        probability: f64,
        rng:         &'a mut StdRng,
    ) -> Self {
        Self::Scheduled {
            start_id,
            targets,
            lengths,
            probability: probability.clamp(0.0, 1.0),
            rng,
        }
    }

    /// First input tokens and initial finished flags.
    pub fn initialize(&self, batch: usize) -> (Vec<usize>, Vec<bool>) {
        match self {
            Self::Greedy { start_id, .. } => (vec![*start_id; batch], vec![false; batch]),
            Self::Scheduled { start_id, lengths, .. } => {
                (vec![*start_id; batch], lengths.iter().map(|&len| len == 0).collect())
            }
        }
    }

    /// Next input tokens and this step's finished flags, given the
    /// ids sampled at `step`.
    pub fn next(&mut self, step: usize, sampled: &[usize]) -> (Vec<usize>, Vec<bool>) {
        match self {
            Self::Greedy { end_id, .. } => {
                let finished = sampled.iter().map(|&id| id == *end_id).collect();
                (sampled.to_vec(), finished)
            }
            Self::Scheduled { targets, lengths, probability, rng, .. } => {
                let finished = lengths.iter().map(|&len| step + 1 >= len).collect();
                let tokens = sampled
                    .iter()
                    .zip(targets.iter())
                    .map(|(&own, truth)| {
                        let use_own = *probability > 0.0 && rng.gen_bool(*probability);
                        match truth.get(step) {
                            Some(&expected) if !use_own => expected,
                            _ => own,
                        }
                    })
                    .collect();
                (tokens, finished)
            }
        }
    }
}

// ─── DecoderState ─────────────────────────────────────────────────────────────
/// Composite state of the three stages.
#[derive(Debug, Clone)]
pub struct DecoderState<B: Backend> {
    pub input:     Tensor<B, 2>,
    pub attention: AttentionState<B>,
    pub output:    Tensor<B, 2>,
}

impl<B: Backend> DecoderState<B> {
    fn without_history(&self) -> Self {
        Self {
            input:     self.input.clone(),
            attention: self.attention.without_history(),
            output:    self.output.clone(),
        }
    }

    /// Keep `self` for live rows and `previous` for finished rows.
    fn hold_finished(self, previous: &Self, live: &Tensor<B, 2>) -> Self {
        let attention = AttentionState {
            cell:       blend_rows(live, self.attention.cell, previous.attention.cell.clone()),
            attention:  blend_rows(live, self.attention.attention, previous.attention.attention.clone()),
            alignments: blend_rows(live, self.attention.alignments, previous.attention.alignments.clone()),
            history:    self.attention.history,
        };
        Self {
            input:  blend_rows(live, self.input, previous.input.clone()),
            attention,
            output: blend_rows(live, self.output, previous.output.clone()),
        }
    }
}

// ─── DecoderOutput ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct DecoderOutput<B: Backend> {
    /// Per-step logits — [batch, steps, output_size]
    pub logits: Tensor<B, 3>,

    /// Per-step argmax ids — [batch, steps]
    pub sample_ids: Tensor<B, 2, Int>,

    /// State after the last step
    pub final_state: DecoderState<B>,

    /// Steps each example ran before it finished (inclusive)
    pub sequence_lengths: Vec<usize>,

    /// Number of steps the loop ran
    pub steps: usize,
}

// ─── DecoderStack ─────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct DecoderConfig {
    pub output_size:  usize,
    pub hidden_size:  usize,
    /// Width of the encoder outputs; also the attention stage size
    pub memory_size:  usize,
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DecoderStack<B> {
        DecoderStack {
            input_cell: GruCellConfig::new(self.output_size, self.hidden_size).init(device),
            attention: AttentionGruConfig::new(
                self.hidden_size,
                self.memory_size,
                self.memory_size,
                self.memory_size,
            )
            .init(device),
            output_cell: GruCellConfig::new(self.memory_size, self.output_size).init(device),
            output_size: self.output_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct DecoderStack<B: Backend> {
    pub input_cell:  GruCell<B>,
    pub attention:   AttentionGru<B>,
    pub output_cell: GruCell<B>,
    pub output_size: usize,
}

impl<B: Backend> DecoderStack<B> {
    pub fn zero_state(&self, memory: &AttentionMemory<B>, keep_alignments: bool) -> DecoderState<B> {
        let batch = memory.batch_size();
        let device = memory.values.device();
        DecoderState {
            input:     Tensor::zeros([batch, self.input_cell.hidden_size], &device),
            attention: self.attention.zero_state(memory, keep_alignments),
            output:    Tensor::zeros([batch, self.output_cell.hidden_size], &device),
        }
    }

    /// One step of the pipeline: input [batch, output_size] → logits [batch, output_size].
    pub fn step(
        &self,
        input:  Tensor<B, 2>,
        state:  DecoderState<B>,
        memory: &AttentionMemory<B>,
    ) -> (Tensor<B, 2>, DecoderState<B>) {
        let projected = self.input_cell.forward(input, state.input);
        let (attended, attention) = self.attention.forward(projected.clone(), state.attention, memory);
        let logits = self.output_cell.forward(attended, state.output);

        let next = DecoderState { input: projected, attention, output: logits.clone() };
        (logits, next)
    }

    /// Run the decode loop until `max_iterations` or every example finishes.
    pub fn decode(
        &self,
        memory:          &AttentionMemory<B>,
        mut policy:      FeedbackPolicy<'_>,
        max_iterations:  usize,
        keep_alignments: bool,
    ) -> DecoderOutput<B> {
        let batch = memory.batch_size();
        let device = memory.values.device();

        let (mut tokens, mut finished) = policy.initialize(batch);
        let mut state = self.zero_state(memory, keep_alignments);
        let mut sequence_lengths = vec![0usize; batch];
        let mut step_logits: Vec<Tensor<B, 2>> = Vec::new();
        let mut step_ids: Vec<Vec<usize>> = Vec::new();

        while step_ids.len() < max_iterations && !finished.iter().all(|&f| f) {
            let step = step_ids.len();
            let input = one_hot_ids::<B>(&tokens, self.output_size, &device);
            let held = state.without_history();
            let (logits, next_state) = self.step(input, state, memory);

            let sampled: Vec<usize> = logits
                .clone()
                .argmax(1)
                .into_data()
                .iter::<i64>()
                .map(|id| id.max(0) as usize)
                .collect();

            let live_rows: Vec<f32> = finished.iter().map(|&f| if f { 0.0 } else { 1.0 }).collect();
            let live = Tensor::<B, 2>::from_data(TensorData::new(live_rows, [batch, 1]), &device);

            step_logits.push(blend_rows(&live, logits.clone(), logits.zeros_like()));
            step_ids.push(
                sampled
                    .iter()
                    .zip(&finished)
                    .map(|(&id, &done)| if done { 0 } else { id })
                    .collect(),
            );
            state = next_state.hold_finished(&held, &live);

            let (next_tokens, step_finished) = policy.next(step, &sampled);
            for (b, done) in step_finished.into_iter().enumerate() {
                if !finished[b] {
                    sequence_lengths[b] += 1;
                }
                finished[b] |= done;
            }
            tokens = next_tokens;

            tracing::trace!(step, finished = finished.iter().filter(|&&f| f).count(), "decode step");
        }

        let steps = step_ids.len();
        let logits = if step_logits.is_empty() {
            Tensor::zeros([batch, 0, self.output_size], &device)
        } else {
            Tensor::stack(step_logits, 1)
        };
        let flat_ids: Vec<i64> = (0..batch)
            .flat_map(|b| step_ids.iter().map(move |row| row[b] as i64))
            .collect();
        let sample_ids = Tensor::from_data(TensorData::new(flat_ids, [batch, steps]), &device);

        DecoderOutput { logits, sample_ids, final_state: state, sequence_lengths, steps }
    }
}
