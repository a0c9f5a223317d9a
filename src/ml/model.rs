use burn::prelude::*;
use rand::rngs::StdRng;

use crate::data::batcher::Seq2SeqBatch;
use crate::ml::decoder::{DecoderConfig, DecoderOutput, DecoderStack, DecoderState, FeedbackPolicy};
use crate::ml::encoder::{BidirectionalEncoder, EncoderConfig};
use crate::ml::tensor_ops::{host_rows, one_hot};
use crate::ml::trainer::TrainConfig;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    /// Size of the input alphabet
    pub input_size:     usize,
    /// Size of the output alphabet
    pub output_size:    usize,
    /// Fed to the decoder first; never produced
    #[config(default = 0)]
    pub sos_id:         usize,
    /// Ends greedy decoding
    #[config(default = 1)]
    pub eos_id:         usize,
    #[config(default = 32)]
    pub enc_rnn_size:   usize,
    #[config(default = 72)]
    pub dec_rnn_size:   usize,
    #[config(default = 3)]
    pub encoder_layers: usize,
}

impl Seq2SeqConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2SeqModel<B> {
        let encoder = EncoderConfig::new(self.input_size, self.enc_rnn_size)
            .with_num_layers(self.encoder_layers)
            .init(device);
        let decoder = DecoderConfig::new(self.output_size, self.dec_rnn_size, 2 * self.enc_rnn_size)
            .init(device);
        Seq2SeqModel {
            encoder,
            decoder,
            input_size:  self.input_size,
            output_size: self.output_size,
            sos_id:      self.sos_id,
            eos_id:      self.eos_id,
        }
    }
}

#[derive(Module, Debug)]
pub struct Seq2SeqModel<B: Backend> {
    pub encoder:     BidirectionalEncoder<B>,
    pub decoder:     DecoderStack<B>,
    pub input_size:  usize,
    pub output_size: usize,
    pub sos_id:      usize,
    pub eos_id:      usize,
}

pub struct TrainOutput<B: Backend> {
    /// [batch, steps, output_size]
    pub logits:      Tensor<B, 3>,
    /// [batch, steps]
    pub sample_ids:  Tensor<B, 2, Int>,
    pub final_state: DecoderState<B>,
    /// [batch]
    pub losses:      Tensor<B, 1>,
    /// [1]
    pub accuracy:    Tensor<B, 1>,
}

pub struct InferOutput<B: Backend> {
    /// [1, steps, output_size]
    pub logits:           Tensor<B, 3>,
    /// [1, steps]
    pub sample_ids:       Tensor<B, 2, Int>,
    /// Carries the alignment history
    pub final_state:      DecoderState<B>,
    pub sequence_lengths: Vec<usize>,
}

impl<B: Backend> InferOutput<B> {
    /// [1, steps, input time]
    pub fn alignment_history(&self) -> Option<Tensor<B, 3>> {
        self.final_state.attention.alignment_history()
    }
}

impl<B: Backend> Seq2SeqModel<B> {
    /// Device holding the parameters.
    pub fn device(&self) -> B::Device {
        self.decoder.output_cell.gates.weight.val().device()
    }

    /// input_ids: [batch, time] → encoder outputs [batch, time, 2 * enc_rnn_size]
    pub fn encode(&self, input_ids: Tensor<B, 2, Int>, lengths: Option<&[usize]>) -> Tensor<B, 3> {
        self.encoder.forward(one_hot(input_ids, self.input_size), lengths)
    }

    /// The graph shared by training and inference: encode, prepare the
    /// attention memory, then run the decode loop under `policy`.
    pub fn build(
        &self,
        input_ids:       Tensor<B, 2, Int>,
        input_lengths:   Option<&[usize]>,
        policy:          FeedbackPolicy<'_>,
        max_iterations:  usize,
        keep_alignments: bool,
    ) -> DecoderOutput<B> {
        let encoded = self.encode(input_ids, input_lengths);
        let memory = self.decoder.attention.mechanism.prepare(encoded, input_lengths);
        self.decoder.decode(&memory, policy, max_iterations, keep_alignments)
    }

    /// Training graph: decode at most `output_ids` width steps, then the
    /// shaped loss and accuracy.
    pub fn forward_train(
        &self,
        batch:  &Seq2SeqBatch<B>,
        config: &TrainConfig,
        rng:    &mut StdRng,
    ) -> TrainOutput<B> {
        let [_, target_width] = batch.output_ids.dims();

        let policy = if config.scheduled_feedback {
            let targets = host_rows(batch.output_ids.clone())
                .into_iter()
                .zip(&batch.output_lengths)
                .map(|(mut row, &len)| {
                    row.truncate(len);
                    row
                })
                .collect();
            FeedbackPolicy::scheduled(
                self.sos_id,
                targets,
                batch.output_lengths.clone(),
                config.sampling_probability,
                rng,
            )
        } else {
            FeedbackPolicy::greedy(self.sos_id, self.eos_id)
        };

        let decoded = self.build(
            batch.input_ids.clone(),
            Some(&batch.input_lengths),
            policy,
            target_width,
            false,
        );

        let shaped = config.loss.shaped_loss(
            decoded.logits.clone(),
            decoded.sample_ids.clone(),
            batch.output_ids.clone(),
            &batch.output_lengths,
        );

        TrainOutput {
            logits:      decoded.logits,
            sample_ids:  decoded.sample_ids,
            final_state: decoded.final_state,
            losses:      shaped.losses,
            accuracy:    shaped.accuracy,
        }
    }

    /// Inference graph for a single unpadded example: greedy feedback,
    /// no length masking, alignment history retained.
    ///
    /// input_ids: [1, time]
    pub fn infer(&self, input_ids: Tensor<B, 2, Int>, max_output_len: usize) -> InferOutput<B> {
        let policy = FeedbackPolicy::greedy(self.sos_id, self.eos_id);
        let decoded = self.build(input_ids, None, policy, max_output_len, true);
        InferOutput {
            logits:           decoded.logits,
            sample_ids:       decoded.sample_ids,
            final_state:      decoded.final_state,
            sequence_lengths: decoded.sequence_lengths,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::pad_rows;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;
    use rand::SeedableRng;

    type B = NdArray;

    fn small_config() -> Seq2SeqConfig {
        Seq2SeqConfig::new(8, 10).with_enc_rnn_size(4).with_dec_rnn_size(6)
    }

    #[test]
    fn test_config_defaults() {
        let cfg = Seq2SeqConfig::new(30, 45);
        assert_eq!(cfg.sos_id, 0);
        assert_eq!(cfg.eos_id, 1);
        assert_eq!(cfg.enc_rnn_size, 32);
        assert_eq!(cfg.dec_rnn_size, 72);
        assert_eq!(cfg.encoder_layers, 3);
    }

    #[test]
    fn test_encoder_width() {
        let device = Default::default();
        let model = small_config().init::<B>(&device);
        let ids = pad_rows::<B>(&[&[2, 3, 4], &[5]], &device);
        let encoded = model.encode(ids, Some(&[3, 1]));
        assert_eq!(encoded.dims(), [2, 3, 8]);
    }

    #[test]
    fn test_train_scenario_with_ground_truth_feedback() {
        let device = Default::default();
        let model = small_config().init::<B>(&device);
        let batch = Seq2SeqBatch {
            input_ids:      pad_rows::<B>(&[&[2, 3, 4, 5], &[6, 7]], &device),
            input_lengths:  vec![4, 2],
            output_ids:     pad_rows::<B>(&[&[4, 5, 1], &[7, 8, 1]], &device),
            output_lengths: vec![3, 3],
        };
        let config = TrainConfig::new(2)
            .with_scheduled_feedback(true)
            .with_sampling_probability(0.0);
        let mut rng = StdRng::seed_from_u64(1);

        let out = model.forward_train(&batch, &config, &mut rng);

        let [b, steps, vocab] = out.logits.dims();
        assert_eq!((b, vocab), (2, 10));
        assert!(steps <= 3);
        assert_eq!(out.sample_ids.dims(), [2, steps]);

        let losses: Vec<f32> = out.losses.into_data().iter::<f32>().collect();
        assert_eq!(losses.len(), 2);
        assert!(losses.iter().all(|l| l.is_finite() && *l >= 0.0));
        let accuracy: f32 = out.accuracy.into_scalar().elem();
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn test_train_with_greedy_feedback() {
        let device = Default::default();
        let model = small_config().init::<B>(&device);
        let batch = Seq2SeqBatch {
            input_ids:      pad_rows::<B>(&[&[2, 3]], &device),
            input_lengths:  vec![2],
            output_ids:     pad_rows::<B>(&[&[4, 5, 6, 1]], &device),
            output_lengths: vec![4],
        };
        let mut rng = StdRng::seed_from_u64(1);
        let out = model.forward_train(&batch, &TrainConfig::new(1), &mut rng);
        // never more steps than the target width
        assert!(out.logits.dims()[1] <= 4);
    }

    #[test]
    fn test_infer_scenario() {
        let device = Default::default();
        let model = small_config().init::<B>(&device);
        let input = Tensor::<B, 2, Int>::from_data(TensorData::new(vec![2i64, 3, 4], [1, 3]), &device);

        let out = model.infer(input, 5);
        let [batch, steps, _] = out.logits.dims();
        assert_eq!(batch, 1);
        assert!(steps >= 1 && steps <= 5);

        let ids: Vec<i64> = out.sample_ids.clone().into_data().iter::<i64>().collect();
        assert!(ids.iter().all(|&id| (0..10).contains(&id)));
        // ends on end-of-sequence unless the bound was hit
        if steps < 5 {
            assert_eq!(*ids.last().unwrap(), 1);
        }

        let history = out.alignment_history().unwrap();
        assert_eq!(history.dims(), [1, steps, 3]);
    }

    #[test]
    fn test_infer_terminates_on_reachable_eos() {
        let device = Default::default();
        let mut model = small_config().init::<B>(&device);
        let input = Tensor::<B, 2, Int>::from_data(TensorData::new(vec![2i64, 3, 4], [1, 3]), &device);

        // unreachable eos: runs to the bound
        model.eos_id = 99;
        let unbounded = model.infer(input.clone(), 5);
        assert_eq!(unbounded.logits.dims()[1], 5);
        let ids: Vec<i64> = unbounded.sample_ids.into_data().iter::<i64>().collect();

        // eos = the id emitted at step 2, so decoding ends at or before step 3
        let eos = ids[2];
        let first = ids.iter().position(|&id| id == eos).unwrap_or(2);
        model.eos_id = eos as usize;

        let out = model.infer(input, 5);
        let steps = out.logits.dims()[1];
        assert_eq!(steps, first + 1);
        assert!(steps <= 3);
        assert_eq!(out.sequence_lengths, vec![steps]);

        let emitted: Vec<i64> = out.sample_ids.clone().into_data().iter::<i64>().collect();
        assert_eq!(emitted, ids[..steps].to_vec());
        assert_eq!(*emitted.last().unwrap(), eos);
        assert_eq!(out.alignment_history().unwrap().dims(), [1, steps, 3]);
    }

    #[test]
    fn test_infer_is_deterministic() {
        let device = Default::default();
        let model = small_config().init::<B>(&device);
        let input = Tensor::<B, 2, Int>::from_data(TensorData::new(vec![5i64, 6], [1, 2]), &device);

        let a: Vec<i64> = model.infer(input.clone(), 8).sample_ids.into_data().iter::<i64>().collect();
        let b: Vec<i64> = model.infer(input, 8).sample_ids.into_data().iter::<i64>().collect();
        assert_eq!(a, b);
    }
}
