// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves the best model of a run using Burn's CompactRecorder.
//
// What gets written to the save directory:
//   1. train_config.json  — every hyperparameter of the run,
//                           written before the first epoch
//   2. best_model.mpk     — weights of the lowest-val-loss epoch
//   3. best_epoch.json    — which epoch those weights came from
//
// The config is saved separately so the architecture (vocab,
// d_model, layers, heads) can be rebuilt before the weights
// are read back into it.
//
// File layout:
//   checkpoints/
//     train_config.json
//     best_model.mpk
//     best_epoch.json
//     metrics.csv          ← written by MetricsLogger
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    module::Module,
    record::{CompactRecorder, Recorder},
    tensor::backend::Backend,
};

use crate::application::train_use_case::TrainConfig;

/// Writes run artefacts into one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating `dir` (and parents) if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create save directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save the weights of the best model and record its epoch.
    ///
    /// CompactRecorder appends its own extension to `best_model`.
    pub fn save_model<B, M>(&self, model: &M, epoch: usize) -> Result<()>
    where
        B: Backend,
        M: Module<B>,
    {
        let path = self.dir.join("best_model");

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save best model to '{}'", path.display())
            })?;

        let epoch_path = self.dir.join("best_epoch.json");
        fs::write(&epoch_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", epoch_path.display()))?;

        tracing::debug!("Saved best model (epoch {}) to '{}'", epoch, path.display());
        Ok(())
    }

    /// Save the training configuration as pretty JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}
