// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem or the terminal:
//
//   checkpoint.rs — run directory, train_config.json and the
//                   best model's weights (CompactRecorder)
//
//   metrics.rs    — one CSV row per epoch in metrics.csv
//
//   reporter.rs   — the per-window / per-epoch / test lines
//                   printed while training runs
//
// metrics.rs and reporter.rs both implement ProgressReporter,
// so the ML layer emits reports without knowing where they go.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Best-model and config persistence
pub mod checkpoint;

/// Epoch metrics CSV logger
pub mod metrics;

/// Terminal progress output
pub mod reporter;
