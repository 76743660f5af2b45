// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration  (Layer 2)
//   Step 2: Load + tokenise the corpus  (Layer 4 - data)
//   Step 3: Batchify the three splits   (Layer 4 - data)
//   Step 4: Save config, open metrics   (Layer 6 - infra)
//   Step 5: Build model + optimiser     (Layer 5 - ml)
//   Step 6: Run all epochs + test       (Layer 5 - ml)
//   Step 7: Save the best model         (Layer 6 - infra)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::{fmt, str::FromStr};

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    module::Module,
    optim::{AdamConfig, SgdConfig},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::{batcher::batchify, corpus::Corpus};
use crate::domain::error::{ModelError, ModelResult};
use crate::domain::token_matrix::TokenMatrix;
use crate::domain::traits::ProgressReporter;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    reporter::ConsoleReporter,
};
use crate::ml::model::{SequenceLanguageModel, SequenceModelConfig};
use crate::ml::run::{run_training, RunOutcome, Splits};

// ─── Optimiser / Backend choices ─────────────────────────────────────────────
// Parsed from strings so the CLI layer can hand them straight to clap.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

impl FromStr for OptimizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sgd"  => Ok(Self::Sgd),
            "adam" => Ok(Self::Adam),
            other  => Err(format!("unknown optimizer '{other}' (expected sgd or adam)")),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sgd  => write!(f, "sgd"),
            Self::Adam => write!(f, "adam"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// CPU
    Ndarray,
    /// GPU through WebGPU
    Wgpu,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ndarray" | "cpu" => Ok(Self::Ndarray),
            "wgpu" | "gpu"    => Ok(Self::Wgpu),
            other             => Err(format!("unknown backend '{other}' (expected ndarray or wgpu)")),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ndarray => write!(f, "ndarray"),
            Self::Wgpu    => write!(f, "wgpu"),
        }
    }
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so the exact settings are saved next to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:            String,
    pub save_dir:            String,
    /// None → take the vocabulary size from the corpus
    pub vocab_size:          Option<usize>,
    pub embedding_dim:       usize,
    pub ff_hidden:           usize,
    pub num_layers:          usize,
    pub num_heads:           usize,
    pub dropout:             f64,
    pub max_len:             usize,
    pub train_batch_columns: usize,
    pub eval_batch_columns:  usize,
    pub window_size:         usize,
    pub epochs:              usize,
    pub lr:                  f64,
    pub lr_decay:            f64,
    pub clip_norm:           f64,
    pub log_interval:        usize,
    pub seed:                u64,
    pub optimizer:           OptimizerKind,
    pub backend:             BackendKind,
    pub dry_run:             bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:            "data/wikitext-2".to_string(),
            save_dir:            "checkpoints".to_string(),
            vocab_size:          None,
            embedding_dim:       200,
            ff_hidden:           200,
            num_layers:          2,
            num_heads:           2,
            dropout:             0.2,
            max_len:             5000,
            train_batch_columns: 20,
            eval_batch_columns:  10,
            window_size:         35,
            epochs:              40,
            lr:                  20.0,
            lr_decay:            0.25,
            clip_norm:           0.25,
            log_interval:        200,
            seed:                1111,
            optimizer:           OptimizerKind::Sgd,
            backend:             BackendKind::Ndarray,
            dry_run:             false,
        }
    }
}

impl TrainConfig {
    /// Reject settings that can never produce a valid run.
    pub fn validate(&self) -> ModelResult<()> {
        if self.train_batch_columns == 0 || self.eval_batch_columns == 0 {
            return Err(ModelError::config("batch columns must be > 0 for every split"));
        }
        if self.window_size == 0 {
            return Err(ModelError::config("window_size must be > 0"));
        }
        if self.window_size > self.max_len {
            return Err(ModelError::config(format!(
                "window_size {} exceeds the positional table length {}",
                self.window_size, self.max_len
            )));
        }
        if self.epochs == 0 {
            return Err(ModelError::config("epochs must be > 0"));
        }
        if !(self.lr > 0.0 && self.lr_decay > 0.0 && self.clip_norm > 0.0) {
            return Err(ModelError::config("lr, lr_decay and clip_norm must all be > 0"));
        }
        self.model_config(self.vocab_size.unwrap_or(1)).validate()
    }

    /// Vocabulary size to build the model with, given what the corpus saw.
    pub fn resolve_vocab(&self, corpus_vocab: usize) -> ModelResult<usize> {
        match self.vocab_size {
            None => Ok(corpus_vocab),
            Some(v) if v >= corpus_vocab => Ok(v),
            Some(v) => Err(ModelError::config(format!(
                "vocab_size {v} is smaller than the corpus vocabulary {corpus_vocab}"
            ))),
        }
    }

    pub fn model_config(&self, vocab_size: usize) -> SequenceModelConfig {
        SequenceModelConfig::new(
            vocab_size,
            self.embedding_dim,
            self.ff_hidden,
            self.num_layers,
            self.num_heads,
            self.dropout,
        )
        .with_max_len(self.max_len)
    }
}

/// Batchify one split and make sure it has something to predict.
pub fn prepare_split(name: &'static str, ids: &[u32], columns: usize) -> ModelResult<TokenMatrix> {
    let matrix = batchify(ids, columns)?;
    if matrix.timesteps() < 2 {
        return Err(ModelError::shape(
            name,
            format!("at least 2 rows of {columns} columns"),
            format!("{} tokens", ids.len()),
        ));
    }
    tracing::info!("{} split: {:?} (timesteps × columns)", name, matrix.shape());
    Ok(matrix)
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Load corpus ───────────────────────────────────────────────
        let corpus     = Corpus::load(&cfg.data_dir)?;
        let vocab_size = cfg.resolve_vocab(corpus.vocab_size())?;

        // ── Step 3: Batchify ──────────────────────────────────────────────────
        let train = prepare_split("train", &corpus.train, cfg.train_batch_columns)?;
        let valid = prepare_split("valid", &corpus.valid, cfg.eval_batch_columns)?;
        let test  = prepare_split("test", &corpus.test, cfg.eval_batch_columns)?;
        let splits = Splits { train: &train, valid: &valid, test: &test };

        // ── Step 4: Persist config, open reporters ────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.save_dir)?;
        ckpt_manager.save_config(cfg)?;
        let mut reporter = (ConsoleReporter::new(), MetricsLogger::new(&cfg.save_dir)?);
        tracing::info!("Epoch metrics → '{}'", reporter.1.csv_path().display());

        // ── Steps 5–7: Train on the chosen backend ────────────────────────────
        match cfg.backend {
            BackendKind::Ndarray => train_on::<Autodiff<NdArray>, _>(
                cfg, vocab_size, splits, NdArrayDevice::default(), &ckpt_manager, &mut reporter,
            ),
            BackendKind::Wgpu => train_on::<Autodiff<Wgpu>, _>(
                cfg, vocab_size, splits, WgpuDevice::default(), &ckpt_manager, &mut reporter,
            ),
        }
    }
}

fn train_on<B, R>(
    cfg:          &TrainConfig,
    vocab_size:   usize,
    splits:       Splits<'_>,
    device:       B::Device,
    ckpt_manager: &CheckpointManager,
    reporter:     &mut R,
) -> Result<()>
where
    B: AutodiffBackend,
    R: ProgressReporter,
{
    tracing::info!("Using {} device: {:?}", cfg.backend, device);
    B::seed(&device, cfg.seed);

    // ── Step 5: Build model ───────────────────────────────────────────────────
    let model = cfg.model_config(vocab_size).init::<B>(&device)?;
    tracing::info!(
        "Model ready: vocab={} d_model={} layers={} heads={} ({} parameters)",
        vocab_size,
        cfg.embedding_dim,
        cfg.num_layers,
        cfg.num_heads,
        model.num_params(),
    );

    // ── Step 6: Run ───────────────────────────────────────────────────────────
    let outcome: RunOutcome<SequenceLanguageModel<B>> = match cfg.optimizer {
        OptimizerKind::Sgd => {
            run_training::<B, _, _, _>(cfg, model, SgdConfig::new().init(), splits, &device, reporter)?
        }
        OptimizerKind::Adam => {
            run_training::<B, _, _, _>(cfg, model, AdamConfig::new().init(), splits, &device, reporter)?
        }
    };

    // ── Step 7: Save the best model ───────────────────────────────────────────
    ckpt_manager.save_model::<B, _>(&outcome.best.model, outcome.best.epoch)?;
    tracing::info!(
        "Best model from epoch {} (val_loss={:.4}, test_loss={:.4}, final lr={:.3e}) saved to '{}'",
        outcome.best.epoch,
        outcome.best.val_loss,
        outcome.test_loss,
        outcome.final_lr,
        ckpt_manager.dir().display(),
    );
    Ok(())
}
