// ============================================================
// Layer 2 — Seq2Seq Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<SequencePair>
// into the four batched input slots of the training graph.
//
// How batching works here:
//   Input:  N pairs with input lengths L_i and output lengths M_i
//   Output: input_ids  [N, max L_i]   (right-padded with PAD_ID)
//           output_ids [N, max M_i]   (right-padded with PAD_ID)
//           plus the true lengths L_i / M_i
//
// The padding value never matters to the model: the encoder
// and attention ignore input positions >= L_i, and the loss
// masks output positions >= M_i.
//
// Lengths stay on the host as Vec<usize>: the decode loop and
// the mask builders read them every step.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::sequence_pair::SequencePair;

/// Id written into padded positions.
pub const PAD_ID: usize = 0;

// ─── Seq2SeqBatch ─────────────────────────────────────────────────────────────
/// A padded batch ready for `Seq2SeqModel::forward_train`.
#[derive(Debug, Clone)]
pub struct Seq2SeqBatch<B: Backend> {
    /// Input symbol ids — shape: [batch_size, max_input_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// True input length per example
    pub input_lengths: Vec<usize>,

    /// Target symbol ids — shape: [batch_size, max_output_len]
    pub output_ids: Tensor<B, 2, Int>,

    /// True output length per example
    pub output_lengths: Vec<usize>,
}

impl<B: Backend> Seq2SeqBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.input_lengths.len()
    }
}

/// Stack variable-length id rows into a right-padded [rows, width] Int tensor.
pub fn pad_rows<B: Backend>(rows: &[&[usize]], device: &B::Device) -> Tensor<B, 2, Int> {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let flat: Vec<i64> = rows
        .iter()
        .flat_map(|row| {
            row.iter()
                .map(|&id| id as i64)
                .chain(std::iter::repeat(PAD_ID as i64))
                .take(width)
        })
        .collect();
    Tensor::from_data(TensorData::new(flat, [rows.len(), width]), device)
}

// ─── Seq2SeqBatcher ───────────────────────────────────────────────────────────
#[derive(Clone, Debug, Default)]
pub struct Seq2SeqBatcher;

impl Seq2SeqBatcher {
    pub fn new() -> Self {
        Self
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<B, SequencePair, Seq2SeqBatch<B>> for Seq2SeqBatcher {
    fn batch(&self, items: Vec<SequencePair>, device: &B::Device) -> Seq2SeqBatch<B> {
        let inputs: Vec<&[usize]>  = items.iter().map(|p| p.input_ids.as_slice()).collect();
        let outputs: Vec<&[usize]> = items.iter().map(|p| p.output_ids.as_slice()).collect();

        Seq2SeqBatch {
            input_ids:      pad_rows(&inputs, device),
            input_lengths:  items.iter().map(SequencePair::input_len).collect(),
            output_ids:     pad_rows(&outputs, device),
            output_lengths: items.iter().map(SequencePair::output_len).collect(),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_pads_to_longest() {
        let device = Default::default();
        let items = vec![
            SequencePair::new(vec![3, 4, 5], vec![7, 1]).unwrap(),
            SequencePair::new(vec![6], vec![8, 9, 2, 1]).unwrap(),
        ];
        let batch: Seq2SeqBatch<B> = Seq2SeqBatcher::new().batch(items, &device);

        assert_eq!(batch.batch_size(), 2);
        assert_eq!(batch.input_ids.dims(), [2, 3]);
        assert_eq!(batch.output_ids.dims(), [2, 4]);
        assert_eq!(batch.input_lengths, vec![3, 1]);
        assert_eq!(batch.output_lengths, vec![2, 4]);

        let inputs: Vec<i64> = batch.input_ids.into_data().iter::<i64>().collect();
        assert_eq!(inputs, vec![3, 4, 5, 6, 0, 0]);
        let outputs: Vec<i64> = batch.output_ids.into_data().iter::<i64>().collect();
        assert_eq!(outputs, vec![7, 1, 0, 0, 8, 9, 2, 1]);
    }
}
