// ============================================================
// Layer 3 — Inferencer
// ============================================================
// Runs the inference graph on one host-side input sequence:
// builds the [1, time] input tensor, decodes greedily up to
// `max_output_len` steps, and copies ids and the attention
// alignments back to plain Vecs for the caller (e.g. to print
// the transcription or plot the alignment matrix).
use anyhow::{bail, Result};
use burn::prelude::*;

use crate::data::batcher::pad_rows;
use crate::ml::model::Seq2SeqModel;
use crate::ml::tensor_ops::host_rows;

pub const DEFAULT_MAX_OUTPUT_LEN: usize = 128;

/// Decoded output for one input sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    /// Emitted ids, including the end-of-sequence id when reached
    pub ids: Vec<usize>,

    /// One row per decode step, one weight per input position
    pub alignments: Vec<Vec<f32>>,

    /// Whether decoding stopped on end-of-sequence rather than the length bound
    pub reached_end: bool,
}

impl Transcription {
    /// Ids up to (not including) the first end-of-sequence id.
    pub fn symbols(&self, eos_id: usize) -> &[usize] {
        let end = self.ids.iter().position(|&id| id == eos_id).unwrap_or(self.ids.len());
        &self.ids[..end]
    }
}

pub struct Inferencer<B: Backend> {
    model:          Seq2SeqModel<B>,
    max_output_len: usize,
    device:         B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: Seq2SeqModel<B>, max_output_len: usize) -> Self {
        let device = model.device();
        Self { model, max_output_len, device }
    }

    /// Inferencer with the default output bound of 128 steps.
    pub fn with_default_len(model: Seq2SeqModel<B>) -> Self {
        Self::new(model, DEFAULT_MAX_OUTPUT_LEN)
    }

    pub fn model(&self) -> &Seq2SeqModel<B> {
        &self.model
    }

    pub fn infer(&self, input: &[usize]) -> Result<Transcription> {
        if input.is_empty() {
            bail!("cannot transcribe an empty input sequence");
        }
        if let Some(id) = input.iter().find(|&&id| id >= self.model.input_size) {
            bail!("input id {id} is outside the input alphabet of size {}", self.model.input_size);
        }

        let input_ids = pad_rows::<B>(&[input], &self.device);
        let output = self.model.infer(input_ids, self.max_output_len);

        let ids = host_rows(output.sample_ids.clone()).into_iter().next().unwrap_or_default();
        let reached_end = ids.last() == Some(&self.model.eos_id);

        let alignments = match output.alignment_history() {
            Some(history) => {
                let [_, steps, time] = history.dims();
                let flat: Vec<f32> = history.into_data().iter::<f32>().collect();
                flat.chunks(time.max(1)).take(steps).map(<[f32]>::to_vec).collect()
            }
            None => Vec::new(),
        };

        tracing::debug!(
            "Decoded {} ids from {} inputs (reached_end={})",
            ids.len(),
            input.len(),
            reached_end
        );

        Ok(Transcription { ids, alignments, reached_end })
    }
}
