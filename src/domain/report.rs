// ============================================================
// Layer 3 — Progress Reports
// ============================================================
// The three events a training run emits. These are plain data;
// formatting them for a terminal or a CSV file is the job of the
// reporters in Layer 6.

use serde::{Deserialize, Serialize};

/// Emitted every `log_interval` training windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    pub epoch:             usize,
    /// Index of the window that triggered the report (0-based).
    pub window:            usize,
    pub windows_per_epoch: usize,
    pub lr:                f64,
    /// Mean wall time per window since the previous report.
    pub ms_per_window:     f64,
    /// Mean loss over the windows since the previous report.
    pub loss:              f64,
    pub ppl:               f64,
}

/// Emitted once per epoch after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    pub epoch:        usize,
    /// Learning rate that was in effect during this epoch.
    pub lr:           f64,
    pub elapsed_secs: f64,
    pub val_loss:     f64,
    pub val_ppl:      f64,
    /// True when this epoch became the new best model.
    pub improved:     bool,
}

/// Emitted once, after the best model is scored on the test split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub best_epoch: usize,
    pub test_loss:  f64,
    pub test_ppl:   f64,
}

/// exp(mean per-token cross-entropy).
pub fn perplexity(loss: f64) -> f64 {
    loss.exp()
}
