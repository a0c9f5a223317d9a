// ============================================================
// Layer 2 — Data Layer
// ============================================================
// Turns in-memory SequencePairs into the four batched input
// slots the training graph declares:
//
//   Vec<SequencePair>
//       │
//       ▼
//   PairDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   Seq2SeqBatcher    → pads and stacks into Seq2SeqBatch
//       │
//       ▼
//   input_ids [b, t] · input_lengths [b]
//   output_ids [b, t'] · output_lengths [b]
//
// Reading files / building vocabularies happens upstream of
// this crate; pairs arrive already mapped to ids.

/// Implements Burn's Dataset trait for sequence pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create padded tensor batches
pub mod batcher;
