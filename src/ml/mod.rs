// ============================================================
// Layer 3 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds or reads Burn tensors lives here.
//
// What's in this layer:
//
//   tensor_ops.rs — one-hot encoding, length masks, host copies
//
//   cells.rs      — the two recurrent cells
//                   • SimpleRnnCell: h' = tanh(W[x, h])
//                   • GruCell:       reset/update gates + candidate
//
//   encoder.rs    — bidirectional stack of SimpleRnnCell layers,
//                   forward and backward outputs concatenated
//
//   attention.rs  — additive (Bahdanau) attention over the
//                   encoder outputs and the GRU it wraps
//
//   decoder.rs    — GRU → attention GRU → GRU projected to the
//                   output alphabet, plus the bounded decode loop
//                   and its two feedback policies
//
//   model.rs      — wires encoder and decoder into the training
//                   and inference graphs
//
//   loss.rs       — shaped cross-entropy and the accuracy metric
//
//   trainer.rs    — Adam steps and the epoch loop
//
//   inferencer.rs — single-sequence transcription
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Bahdanau et al. (2015) Neural Machine Translation by
//            Jointly Learning to Align and Translate

pub mod tensor_ops;

/// Simple RNN and GRU cells
pub mod cells;

pub mod encoder;

/// Bahdanau attention and the attention-wrapped GRU
pub mod attention;

/// Decoder stack and decode loop
pub mod decoder;

pub mod model;

pub mod loss;

/// Optimiser steps over batches and epochs
pub mod trainer;

/// Greedy transcription of one input sequence
pub mod inferencer;

/// CPU backend used by the tests and the default build.
pub type CpuBackend = burn::backend::NdArray;

/// CPU backend with autodiff, for training.
pub type CpuTrainBackend = burn::backend::Autodiff<CpuBackend>;

#[cfg(feature = "wgpu")]
pub type GpuBackend = burn::backend::Wgpu;

#[cfg(feature = "wgpu")]
pub type GpuTrainBackend = burn::backend::Autodiff<GpuBackend>;
