// ============================================================
// seq2seq-attn — attention sequence-to-sequence model (Burn)
// ============================================================
// Maps an input symbol sequence (e.g. letters) to an output
// symbol sequence (e.g. phonemes) with:
//
//   one-hot inputs
//       │
//       ▼
//   bidirectional 3-layer RNN encoder
//       │
//       ▼
//   GRU → Bahdanau-attention GRU → GRU   (decoder stack)
//       │
//       ▼
//   greedy / scheduled-sampling decode loop
//       │
//       ▼
//   shaped cross-entropy + accuracy → Adam step   (train only)
//
// Layers, lowest first:
//   domain — plain Rust types (no Burn)
//   data   — Burn Dataset / Batcher for the four input slots
//   ml     — everything that touches Burn tensors
//   infra  — tracing setup and the summary scalar log
#![recursion_limit = "256"]

pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;

pub use domain::sequence_pair::SequencePair;
pub use infra::logging::init_tracing;
pub use infra::summary::SummaryWriter;
pub use ml::inferencer::{Inferencer, Transcription};
pub use ml::loss::LossShapingConfig;
pub use ml::model::{Seq2SeqConfig, Seq2SeqModel};
pub use ml::trainer::{adam_trainer, TrainConfig, Trainer};
