// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records one CSV row per epoch so learning curves can be
// plotted after the run.
//
// Columns:
//   - epoch:        the epoch number (1, 2, 3, ...)
//   - lr:           learning rate used during the epoch
//   - elapsed_secs: wall time of train + validation
//   - val_loss:     token-averaged NLL on the validation split
//   - val_ppl:      exp(val_loss)
//   - improved:     whether the epoch became the new best model
//
// Output file: checkpoints/metrics.csv
//
// Example:
//   epoch,lr,elapsed_secs,val_loss,val_ppl,improved
//   1,20.000000,41.230000,5.812300,334.620000,true
//   2,5.000000,40.980000,5.641000,281.880000,true
//
// The logger is a ProgressReporter, so it rides along with the
// console reporter and only reacts to epoch summaries.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::report::EpochSummary;
use crate::domain::traits::ProgressReporter;

const CSV_HEADER: &str = "epoch,lr,elapsed_secs,val_loss,val_ppl,improved";

/// One row of the metrics CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:        usize,
    pub lr:           f64,
    pub elapsed_secs: f64,
    pub val_loss:     f64,
    pub val_ppl:      f64,
    pub improved:     bool,
}

impl From<&EpochSummary> for EpochMetrics {
    fn from(s: &EpochSummary) -> Self {
        Self {
            epoch:        s.epoch,
            lr:           s.lr,
            elapsed_secs: s.elapsed_secs,
            val_loss:     s.val_loss,
            val_ppl:      s.val_ppl,
            improved:     s.improved,
        }
    }
}

/// Appends epoch metrics to `metrics.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so
    /// several runs into one directory append to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{}",
            m.epoch,
            m.lr,
            m.elapsed_secs,
            m.val_loss,
            m.val_ppl,
            m.improved,
        )?;

        tracing::debug!("Logged epoch {} metrics: val_loss={:.4}", m.epoch, m.val_loss);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

impl ProgressReporter for MetricsLogger {
    fn epoch_summary(&mut self, summary: &EpochSummary) -> Result<()> {
        self.log(&EpochMetrics::from(summary))
    }
}
