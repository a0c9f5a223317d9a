// ============================================================
// Layer 3 — Shaped Loss and Accuracy
// ============================================================
// Token-level cross-entropy with hand-tuned leniencies for the
// phoneme output alphabet:
//
//   1. CE(logits_t, target_t)                per position
//   2. × mask(t < output length)
//   3. × (1 - 0.4)  where target == space
//   4. × (1 - 0.2)  where target AND prediction are both in
//                   the confusable vowel class (AA AE AH AO AW)
//   5. × 1/√(t+1)   when time discounting is on
//   6. Σ_t          → one loss per example
//
// Accuracy = mean over ALL positions of
//   1 - [pred != target] × (1 - 0.1 × vowel_mask)
//
// Everything is first truncated to the shorter of the decoded
// length and the target width.

use burn::{prelude::*, tensor::activation::log_softmax};

use crate::ml::tensor_ops::sequence_mask;

/// Loss-shaping policy. Defaults match the ARPAbet layout the
/// model was tuned on: id 41 = space, ids 2..=6 = AA, AE, AH, AO, AW.
#[derive(Config, Debug)]
pub struct LossShapingConfig {
    #[config(default = 41)]
    pub space_id: usize,

    /// Fraction of the loss removed at space targets
    #[config(default = 0.4)]
    pub space_discount: f64,

    /// First id of the confusable vowel class (inclusive)
    #[config(default = 2)]
    pub vowel_first: usize,

    /// Last id of the confusable vowel class (inclusive)
    #[config(default = 6)]
    pub vowel_last: usize,

    /// Fraction of the loss removed when target and prediction are both vowels
    #[config(default = 0.2)]
    pub vowel_loss_discount: f64,

    /// Fraction of a miss forgiven by the accuracy metric for vowel confusions
    #[config(default = 0.1)]
    pub vowel_accuracy_discount: f64,

    /// Weight position t by 1/sqrt(t+1). Applies under both feedback policies.
    #[config(default = true)]
    pub time_discount: bool,
}

/// Per-example losses and the batch accuracy.
#[derive(Debug, Clone)]
pub struct ShapedLoss<B: Backend> {
    /// [batch]
    pub losses: Tensor<B, 1>,

    /// [1]
    pub accuracy: Tensor<B, 1>,
}

impl LossShapingConfig {
    /// 1.0 where `ids` fall in the vowel class.
    fn vowel_mask<B: Backend>(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let low = ids.clone().greater_equal_elem(self.vowel_first as i64).float();
        let high = ids.lower_equal_elem(self.vowel_last as i64).float();
        low * high
    }

    /// Weighted cross-entropy per position — [batch, len].
    ///
    /// `logits` [batch, steps, vocab], `predicted` [batch, steps],
    /// `targets` [batch, width]; `len = min(steps, width)`.
    pub fn position_losses<B: Backend>(
        &self,
        logits:         Tensor<B, 3>,
        predicted:      Tensor<B, 2, Int>,
        targets:        Tensor<B, 2, Int>,
        target_lengths: &[usize],
    ) -> Tensor<B, 2> {
        let (logits, predicted, targets) = truncate(logits, predicted, targets);
        let [batch, len, _] = logits.dims();
        let device = logits.device();

        let cross_entropy = log_softmax(logits, 2)
            .gather(2, targets.clone().reshape([batch, len, 1]))
            .reshape([batch, len])
            .neg();

        let mut losses = cross_entropy * sequence_mask::<B>(target_lengths, len, &device);

        let space = targets.clone().equal_elem(self.space_id as i64).float();
        losses = losses * space.mul_scalar(-self.space_discount).add_scalar(1.0);

        let vowel = self.vowel_mask(targets) * self.vowel_mask(predicted);
        losses = losses * vowel.mul_scalar(-self.vowel_loss_discount).add_scalar(1.0);

        if self.time_discount {
            let factors = Tensor::<B, 1, Int>::arange(1..len as i64 + 1, &device)
                .float()
                .sqrt()
                .recip()
                .reshape([1, len])
                .expand([batch, len]);
            losses = losses * factors;
        }

        losses
    }

    /// Per-example losses (summed over time) and the accuracy metric.
    pub fn shaped_loss<B: Backend>(
        &self,
        logits:         Tensor<B, 3>,
        predicted:      Tensor<B, 2, Int>,
        targets:        Tensor<B, 2, Int>,
        target_lengths: &[usize],
    ) -> ShapedLoss<B> {
        let [batch, _, _] = logits.dims();
        let accuracy = self.accuracy(predicted.clone(), targets.clone());
        let losses = self
            .position_losses(logits, predicted, targets, target_lengths)
            .sum_dim(1)
            .reshape([batch]);
        ShapedLoss { losses, accuracy }
    }

    /// Mean over every position (padding included) of the softened hit rate.
    pub fn accuracy<B: Backend>(&self, predicted: Tensor<B, 2, Int>, targets: Tensor<B, 2, Int>) -> Tensor<B, 1> {
        let len = predicted.dims()[1].min(targets.dims()[1]);
        let [batch, _] = predicted.dims();
        let predicted = predicted.slice([0..batch, 0..len]);
        let targets = targets.slice([0..batch, 0..len]);

        let vowel = self.vowel_mask(targets.clone()) * self.vowel_mask(predicted.clone());
        let misses = predicted.not_equal(targets).float()
            * vowel.mul_scalar(-self.vowel_accuracy_discount).add_scalar(1.0);
        misses.neg().add_scalar(1.0).mean()
    }
}

fn truncate<B: Backend>(
    logits:    Tensor<B, 3>,
    predicted: Tensor<B, 2, Int>,
    targets:   Tensor<B, 2, Int>,
) -> (Tensor<B, 3>, Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
    let [batch, steps, vocab] = logits.dims();
    let len = steps.min(targets.dims()[1]);
    (
        logits.slice([0..batch, 0..len, 0..vocab]),
        predicted.slice([0..batch, 0..len]),
        targets.slice([0..batch, 0..len]),
    )
}
