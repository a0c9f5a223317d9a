// ============================================================
// Layer 3 — Recurrent Cells
// ============================================================
// The two single-step recurrent cells the model is built from.
//
//   SimpleRnnCell (encoder):
//     h' = tanh(W [x, h] + b)
//
// Weights start Xavier-uniform. Biases start at 0, except the
// GRU gate bias, which starts at 1.
//
//   GruCell (decoder):
//     r, u = σ(W_g [x, h] + b_g)         reset / update gates (b_g starts at 1)
//     c    = tanh(W_c [x, r ⊙ h] + b_c)  candidate
//     h'   = u ⊙ h + (1 - u) ⊙ c
//
// Both take one time step [batch, input] plus the previous
// state [batch, hidden] and return the new state, which is
// also the cell's output.
//
// Reference: Cho et al. (2014) GRU
//            Burn Book §3 (Building Blocks)

use burn::{
    module::Param,
    nn::{Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::sigmoid,
};

/// Xavier-uniform weights, every bias entry set to `bias`.
fn xavier_linear<B: Backend>(inputs: usize, outputs: usize, bias: f32, device: &B::Device) -> Linear<B> {
    let mut linear = LinearConfig::new(inputs, outputs)
        .with_initializer(Initializer::XavierUniform { gain: 1.0 })
        .init(device);
    linear.bias = Some(Param::from_tensor(Tensor::full([outputs], bias, device)));
    linear
}

// ─── SimpleRnnCell ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct SimpleRnnCellConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
}

impl SimpleRnnCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SimpleRnnCell<B> {
        SimpleRnnCell {
            linear:      xavier_linear(self.input_size + self.hidden_size, self.hidden_size, 0.0, device),
            hidden_size: self.hidden_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct SimpleRnnCell<B: Backend> {
    pub linear:      Linear<B>,
    pub hidden_size: usize,
}

impl<B: Backend> SimpleRnnCell<B> {
    pub fn forward(&self, input: Tensor<B, 2>, state: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(Tensor::cat(vec![input, state], 1)).tanh()
    }
}

// ─── GruCell ──────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct GruCellConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
}

impl GruCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruCell<B> {
        let joined = self.input_size + self.hidden_size;
        GruCell {
            gates:       xavier_linear(joined, 2 * self.hidden_size, 1.0, device),
            candidate:   xavier_linear(joined, self.hidden_size, 0.0, device),
            hidden_size: self.hidden_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    pub gates:       Linear<B>,
    pub candidate:   Linear<B>,
    pub hidden_size: usize,
}

impl<B: Backend> GruCell<B> {
    pub fn forward(&self, input: Tensor<B, 2>, state: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = input.dims();
        let h = self.hidden_size;

        let gates = sigmoid(self.gates.forward(Tensor::cat(vec![input.clone(), state.clone()], 1)));
        let reset  = gates.clone().slice([0..batch, 0..h]);
        let update = gates.slice([0..batch, h..2 * h]);

        let candidate = self
            .candidate
            .forward(Tensor::cat(vec![input, reset * state.clone()], 1))
            .tanh();

        let carry = update.clone().neg().add_scalar(1.0);
        update * state + carry * candidate
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_rnn_cell_shape_and_range() {
        let device = Default::default();
        let cell = SimpleRnnCellConfig::new(5, 4).init::<B>(&device);
        let out = cell.forward(Tensor::ones([3, 5], &device), Tensor::zeros([3, 4], &device));
        assert_eq!(out.dims(), [3, 4]);
        // tanh output
        let values: Vec<f32> = out.into_data().iter::<f32>().collect();
        assert!(values.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn test_gru_cell_shape() {
        let device = Default::default();
        let cell = GruCellConfig::new(6, 8).init::<B>(&device);
        let out = cell.forward(Tensor::ones([2, 6], &device), Tensor::zeros([2, 8], &device));
        assert_eq!(out.dims(), [2, 8]);
    }

    fn bias_values(linear: &Linear<B>) -> Vec<f32> {
        linear.bias.as_ref().unwrap().val().into_data().iter::<f32>().collect()
    }

    #[test]
    fn test_initial_biases() {
        let device = Default::default();
        let gru = GruCellConfig::new(3, 4).init::<B>(&device);
        assert_eq!(bias_values(&gru.gates), vec![1.0; 8]);
        assert_eq!(bias_values(&gru.candidate), vec![0.0; 4]);

        let rnn = SimpleRnnCellConfig::new(3, 4).init::<B>(&device);
        assert_eq!(bias_values(&rnn.linear), vec![0.0; 4]);
    }

    #[test]
    fn test_gru_gates_open_at_bias_one() {
        // zero input and state: both gates are exactly σ(1)
        // and the candidate is tanh(0) = 0, so h' = 0
        let device = Default::default();
        let cell = GruCellConfig::new(3, 4).init::<B>(&device);
        let gates = sigmoid(cell.gates.forward(Tensor::<B, 2>::zeros([1, 7], &device)));
        let expected = 1.0 / (1.0 + (-1.0f32).exp());
        let values: Vec<f32> = gates.into_data().iter::<f32>().collect();
        assert!(values.iter().all(|g| (g - expected).abs() < 1e-6));

        let out = cell.forward(Tensor::zeros([1, 3], &device), Tensor::zeros([1, 4], &device));
        let values: Vec<f32> = out.into_data().iter::<f32>().collect();
        assert!(values.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_gru_state_is_convex_mix() {
        // with h = 0 the new state is (1 - u) * c, so |h'| < 1
        let device = Default::default();
        let cell = GruCellConfig::new(3, 4).init::<B>(&device);
        let out = cell.forward(Tensor::ones([1, 3], &device), Tensor::zeros([1, 4], &device));
        let values: Vec<f32> = out.into_data().iter::<f32>().collect();
        assert!(values.iter().all(|v| v.is_finite() && v.abs() < 1.0));
    }
}
