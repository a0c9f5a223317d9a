// ============================================================
// Layer 3 — Training Step and Epoch Loop
// ============================================================
// One optimiser step per batch:
//
//   forward_train → per-example losses [b] + accuracy
//   Σ losses      → backward
//   Adam          → new parameters
//
// plus a thin epoch loop over an in-memory PairDataset that
// shuffles, batches with Seq2SeqBatcher and steps.
//
// Backend notes:
//   - Training runs on an AutodiffBackend (e.g. Autodiff<NdArray>)
//   - model.valid() hands the weights to the inner backend for
//     inference without autodiff overhead
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::batcher::{Seq2SeqBatch, Seq2SeqBatcher};
use crate::data::dataset::PairDataset;
use crate::domain::sequence_pair::SequencePair;
use crate::infra::summary::{StepSummary, SummaryWriter};
use crate::ml::inferencer::Inferencer;
use crate::ml::loss::LossShapingConfig;
use crate::ml::model::Seq2SeqModel;

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct TrainConfig {
    pub batch_size: usize,

    #[config(default = 1e-4)]
    pub learning_rate: f64,

    /// Adam's numerical-stability term
    #[config(default = 1e-3)]
    pub epsilon: f32,

    /// Scheduled-sampling feedback instead of greedy feedback
    #[config(default = false)]
    pub scheduled_feedback: bool,

    /// Chance of feeding back the model's own prediction under scheduled feedback
    #[config(default = 0.2)]
    pub sampling_probability: f64,

    /// Seeds batch shuffling and the scheduled-sampling draws
    #[config(default = 42)]
    pub seed: u64,

    #[config(default = "LossShapingConfig::new()")]
    pub loss: LossShapingConfig,
}

/// What one optimiser step produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub step:     usize,
    /// Σ over the batch of the per-example losses
    pub loss:     f64,
    pub accuracy: f64,
    pub examples: Vec<f64>,
}

/// Averages over one pass of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    pub batches:  usize,
    pub loss:     f64,
    pub accuracy: f64,
}

// ─── Trainer ──────────────────────────────────────────────────────────────────
pub struct Trainer<B: AutodiffBackend, O> {
    model:   Seq2SeqModel<B>,
    optim:   O,
    config:  TrainConfig,
    rng:     StdRng,
    step:    usize,
    summary: Option<SummaryWriter>,
    device:  B::Device,
}

/// A trainer using Adam with the configured learning rate and epsilon.
pub fn adam_trainer<B: AutodiffBackend>(
    model:  Seq2SeqModel<B>,
    config: TrainConfig,
    device: B::Device,
) -> Trainer<B, impl Optimizer<Seq2SeqModel<B>, B>> {
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim = AdamConfig::new()
        .with_epsilon(config.epsilon)
        .init::<B, Seq2SeqModel<B>>();
    Trainer::with_optimizer(model, optim, config, device)
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2SeqModel<B>, B>,
{
    pub fn with_optimizer(model: Seq2SeqModel<B>, optim: O, config: TrainConfig, device: B::Device) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { model, optim, config, rng, step: 0, summary: None, device }
    }

    /// Record every step's loss and accuracy to `writer`.
    pub fn with_summary(mut self, writer: SummaryWriter) -> Self {
        self.summary = Some(writer);
        self
    }

    pub fn model(&self) -> &Seq2SeqModel<B> {
        &self.model
    }

    /// Forward, backward and one Adam update on `batch`.
    pub fn step(&mut self, batch: &Seq2SeqBatch<B>) -> Result<StepReport> {
        let output = self.model.forward_train(batch, &self.config, &mut self.rng);

        let examples: Vec<f64> = output.losses.clone().into_data().iter::<f64>().collect();
        let loss = examples.iter().sum::<f64>();
        let accuracy: f64 = output.accuracy.into_scalar().elem();

        // minimising the per-example losses together = minimising their sum
        let grads = output.losses.sum().backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.config.learning_rate, self.model.clone(), grads);
        self.step += 1;

        let report = StepReport { step: self.step, loss, accuracy, examples };
        tracing::debug!(
            "step {} | batch={} | loss={:.4} | accuracy={:.3}",
            report.step,
            batch.batch_size(),
            loss,
            accuracy
        );

        if let Some(writer) = &self.summary {
            writer.log(&StepSummary::new(report.step, report.loss, report.accuracy))?;
        }
        Ok(report)
    }

    /// One shuffled pass over `dataset` in batches of `batch_size`.
    pub fn fit_epoch<D: Dataset<SequencePair>>(&mut self, dataset: &D) -> Result<EpochReport> {
        if dataset.len() == 0 {
            bail!("cannot train on an empty dataset");
        }
        let batch_size = self.config.batch_size.max(1);

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        order.shuffle(&mut self.rng);

        let batcher = Seq2SeqBatcher::new();
        let mut loss_sum = 0.0f64;
        let mut accuracy_sum = 0.0f64;
        let mut batches = 0usize;

        for chunk in order.chunks(batch_size) {
            let items: Vec<SequencePair> = chunk.iter().filter_map(|&i| dataset.get(i)).collect();
            if items.is_empty() {
                continue;
            }
            for item in &items {
                item.check_vocab(self.model.input_size, self.model.output_size)?;
            }
            let batch: Seq2SeqBatch<B> = batcher.batch(items, &self.device);
            let report = self.step(&batch)?;
            loss_sum += report.loss;
            accuracy_sum += report.accuracy;
            batches += 1;
        }

        let report = EpochReport {
            batches,
            loss:     loss_sum / batches.max(1) as f64,
            accuracy: accuracy_sum / batches.max(1) as f64,
        };
        tracing::info!(
            "Epoch done | batches={} | loss={:.4} | accuracy={:.1}%",
            report.batches,
            report.loss,
            report.accuracy * 100.0,
        );
        Ok(report)
    }

    /// Run `epochs` passes over `dataset`, then hand the weights to an
    /// inferencer bounded by the dataset's longest output sequence.
    pub fn fit(
        mut self,
        dataset: &PairDataset,
        epochs:  usize,
    ) -> Result<(Vec<EpochReport>, Inferencer<B::InnerBackend>)> {
        let mut reports = Vec::with_capacity(epochs);
        for epoch in 1..=epochs {
            let report = self.fit_epoch(dataset)?;
            tracing::info!("Epoch {}/{} | loss={:.4}", epoch, epochs, report.loss);
            reports.push(report);
        }
        let max_output_len = dataset.max_output_len();
        Ok((reports, self.into_inferencer(max_output_len)))
    }

    /// Hand the trained weights to an inference engine on the inner backend.
    pub fn into_inferencer(self, max_output_len: usize) -> Inferencer<B::InnerBackend> {
        // model.valid() → Seq2SeqModel<B::InnerBackend>
        Inferencer::new(self.model.valid(), max_output_len)
    }
}
