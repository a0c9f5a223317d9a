// ============================================================
// Layer 1 — Domain Layer
// ============================================================
// Plain Rust types describing what a training example IS.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs and their invariants
//
// Keeping it framework-free means the data pipeline that
// produces examples can be tested without any tensor backend.

// One (input ids, output ids) training example
pub mod sequence_pair;
