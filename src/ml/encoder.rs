// ============================================================
// Layer 3 — Bidirectional Encoder
// ============================================================
// Two independent stacks of simple RNN cells read the one-hot
// input sequence, one left-to-right and one right-to-left.
// Their top-layer outputs are concatenated per time step:
//
//   inputs [b, t, input_size]
//       │
//       ├──► forward stack  (t = 0 → T-1) ──┐
//       │                                   ├─► concat → [b, t, 2·enc]
//       └──► backward stack (t = T-1 → 0) ──┘
//
// Length handling (per example, length L):
//   - positions t >= L neither update the state nor produce
//     output (their output row is zero)
//   - the backward stack walks T-1 → 0 but stays at its zero
//     initial state until it reaches t = L-1, so it reads
//     exactly the first L positions in reverse
//
// With no lengths (single unpadded example) every position is
// valid.

use burn::prelude::*;

use crate::ml::cells::{SimpleRnnCell, SimpleRnnCellConfig};
use crate::ml::tensor_ops::{blend_rows, step_mask};

#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
    #[config(default = 3)]
    pub num_layers:  usize,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BidirectionalEncoder<B> {
        BidirectionalEncoder {
            forward_stack:  self.build_stack(device),
            backward_stack: self.build_stack(device),
            hidden_size:    self.hidden_size,
        }
    }

    fn build_stack<B: Backend>(&self, device: &B::Device) -> RnnStack<B> {
        let cells = (0..self.num_layers)
            .map(|layer| {
                let input_size = if layer == 0 { self.input_size } else { self.hidden_size };
                SimpleRnnCellConfig::new(input_size, self.hidden_size).init(device)
            })
            .collect();
        RnnStack { cells }
    }
}

// ─── RnnStack ─────────────────────────────────────────────────────────────────
/// Stacked cells run in lock-step: at each time step the input
/// climbs the whole stack before the next step starts.
#[derive(Module, Debug)]
pub struct RnnStack<B: Backend> {
    pub cells: Vec<SimpleRnnCell<B>>,
}

impl<B: Backend> RnnStack<B> {
    /// Run the stack over `steps` in the given time `order`.
    ///
    /// Returns the top-layer outputs in processing order.
    fn run(
        &self,
        steps: &[Tensor<B, 2>],
        masks: Option<&[Tensor<B, 2>]>,
        order: impl Iterator<Item = usize>,
        batch: usize,
        device: &B::Device,
    ) -> Vec<Tensor<B, 2>> {
        let mut states: Vec<Tensor<B, 2>> = self
            .cells
            .iter()
            .map(|cell| Tensor::zeros([batch, cell.hidden_size], device))
            .collect();
        let mut outputs = Vec::with_capacity(steps.len());

        for t in order {
            let mut x = steps[t].clone();
            let mut candidates = Vec::with_capacity(self.cells.len());
            for (cell, state) in self.cells.iter().zip(&states) {
                x = cell.forward(x, state.clone());
                candidates.push(x.clone());
            }

            match masks {
                Some(masks) => {
                    let valid = &masks[t];
                    for (state, candidate) in states.iter_mut().zip(candidates) {
                        *state = blend_rows(valid, candidate, state.clone());
                    }
                    outputs.push(blend_rows(valid, x.clone(), x.zeros_like()));
                }
                None => {
                    states = candidates;
                    outputs.push(x);
                }
            }
        }

        outputs
    }
}

// ─── BidirectionalEncoder ─────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct BidirectionalEncoder<B: Backend> {
    pub forward_stack:  RnnStack<B>,
    pub backward_stack: RnnStack<B>,
    pub hidden_size:    usize,
}

impl<B: Backend> BidirectionalEncoder<B> {
    /// inputs: [batch, time, input_size] → [batch, time, 2 * hidden_size]
    pub fn forward(&self, inputs: Tensor<B, 3>, lengths: Option<&[usize]>) -> Tensor<B, 3> {
        let [batch, time, width] = inputs.dims();
        let device = inputs.device();

        let steps: Vec<Tensor<B, 2>> = (0..time)
            .map(|t| inputs.clone().slice([0..batch, t..t + 1, 0..width]).reshape([batch, width]))
            .collect();
        let masks: Option<Vec<Tensor<B, 2>>> =
            lengths.map(|lengths| (0..time).map(|t| step_mask(lengths, t, &device)).collect());

        let forward = self.forward_stack.run(&steps, masks.as_deref(), 0..time, batch, &device);
        let mut backward =
            self.backward_stack.run(&steps, masks.as_deref(), (0..time).rev(), batch, &device);
        // back to time order
        backward.reverse();

        let forward: Tensor<B, 3>  = Tensor::stack(forward, 1);
        let backward: Tensor<B, 3> = Tensor::stack(backward, 1);
        Tensor::cat(vec![forward, backward], 2)
    }

    /// Width of each encoder output row.
    pub fn output_size(&self) -> usize {
        2 * self.hidden_size
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::tensor_ops::one_hot;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type B = NdArray;

    fn encoder(device: &<B as Backend>::Device) -> BidirectionalEncoder<B> {
        EncoderConfig::new(6, 4).init(device)
    }

    fn inputs(device: &<B as Backend>::Device) -> Tensor<B, 3> {
        let ids = Tensor::<B, 2, Int>::from_data(
            TensorData::new(vec![1i64, 2, 3, 4, 5, 1, 0, 0], [2, 4]),
            device,
        );
        one_hot(ids, 6)
    }

    #[test]
    fn test_output_shape_ignores_lengths() {
        let device = Default::default();
        let enc = encoder(&device);
        let full = enc.forward(inputs(&device), None);
        let masked = enc.forward(inputs(&device), Some(&[4, 2]));
        assert_eq!(full.dims(), [2, 4, 8]);
        assert_eq!(masked.dims(), [2, 4, 8]);
        assert_eq!(enc.output_size(), 8);
    }

    #[test]
    fn test_padding_positions_are_zero() {
        let device = Default::default();
        let out = encoder(&device).forward(inputs(&device), Some(&[4, 2]));
        let padded: Vec<f32> = out.slice([1..2, 2..4, 0..8]).into_data().iter::<f32>().collect();
        assert!(padded.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_padding_does_not_leak_into_valid_positions() {
        // Example 1 has length 2: its valid outputs must match running
        // the same two symbols unpadded.
        let device = Default::default();
        let enc = encoder(&device);
        let padded = enc.forward(inputs(&device), Some(&[4, 2]));
        let short_ids = Tensor::<B, 2, Int>::from_data(TensorData::new(vec![5i64, 1], [1, 2]), &device);
        let alone = enc.forward(one_hot(short_ids, 6), None);

        let a: Vec<f32> = padded.slice([1..2, 0..2, 0..8]).into_data().iter::<f32>().collect();
        let b: Vec<f32> = alone.into_data().iter::<f32>().collect();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5, "{x} vs {y}");
        }
    }
}
