// ============================================================
// Layer 4 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the training and inference
// code but not part of the model itself:
//
//   logging.rs — tracing subscriber setup with an env filter
//                (RUST_LOG overrides the default directive)
//
//   summary.rs — per-step scalar log (loss, accuracy) written
//                to a CSV file for plotting learning curves
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Rust Book §12 (I/O and File Handling)

/// Tracing subscriber initialisation
pub mod logging;

/// Training scalar summaries
pub mod summary;
