// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `inspect`, and all
// their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for bad values
//   - type conversion (string → usize, f64, OptimizerKind, ...)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::{BackendKind, OptimizerKind, TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the language model on a word-level corpus
    Train(TrainArgs),

    /// Print vocabulary and batching statistics for a corpus
    Inspect(InspectArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing train.txt, valid.txt and test.txt
    #[arg(long, default_value = "data/wikitext-2")]
    pub data_dir: String,

    /// Directory for train_config.json, metrics.csv and the best model
    #[arg(long, default_value = "checkpoints")]
    pub save_dir: String,

    /// Override the vocabulary size (must cover the corpus vocabulary)
    #[arg(long)]
    pub vocab_size: Option<usize>,

    /// Size of word embeddings (d_model)
    #[arg(long, default_value_t = 200)]
    pub emsize: usize,

    /// Hidden size of each feed-forward sublayer
    #[arg(long, default_value_t = 200)]
    pub nhid: usize,

    /// Number of encoder layers
    #[arg(long, default_value_t = 2)]
    pub nlayers: usize,

    /// Number of attention heads; must divide emsize
    #[arg(long, default_value_t = 2)]
    pub nhead: usize,

    /// Dropout applied to positional encodings and encoder layers
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// Length of the positional table; bounds the window size
    #[arg(long, default_value_t = 5000)]
    pub max_len: usize,

    /// Number of independent columns the training stream is cut into
    #[arg(long, default_value_t = 20)]
    pub batch_size: usize,

    /// Columns for the validation and test streams
    #[arg(long, default_value_t = 10)]
    pub eval_batch_size: usize,

    /// Timesteps per training / evaluation window
    #[arg(long, default_value_t = 35)]
    pub bptt: usize,

    #[arg(long, default_value_t = 40)]
    pub epochs: usize,

    /// Initial learning rate
    #[arg(long, default_value_t = 20.0)]
    pub lr: f64,

    /// Factor the learning rate is multiplied by after every epoch
    #[arg(long, default_value_t = 0.25)]
    pub lr_decay: f64,

    /// Maximum global L2 norm of the gradients
    #[arg(long, default_value_t = 0.25)]
    pub clip: f64,

    /// Report every this many windows
    #[arg(long, default_value_t = 200)]
    pub log_interval: usize,

    #[arg(long, default_value_t = 1111)]
    pub seed: u64,

    /// sgd or adam
    #[arg(long, default_value_t = OptimizerKind::Sgd)]
    pub optimizer: OptimizerKind,

    /// ndarray (CPU) or wgpu (GPU)
    #[arg(long, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,

    /// Stop every epoch after a single window
    #[arg(long)]
    pub dry_run: bool,
}

/// Boundary between Layer 1 and Layer 2:
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:            a.data_dir,
            save_dir:            a.save_dir,
            vocab_size:          a.vocab_size,
            embedding_dim:       a.emsize,
            ff_hidden:           a.nhid,
            num_layers:          a.nlayers,
            num_heads:           a.nhead,
            dropout:             a.dropout,
            max_len:             a.max_len,
            train_batch_columns: a.batch_size,
            eval_batch_columns:  a.eval_batch_size,
            window_size:         a.bptt,
            epochs:              a.epochs,
            lr:                  a.lr,
            lr_decay:            a.lr_decay,
            clip_norm:           a.clip,
            log_interval:        a.log_interval,
            seed:                a.seed,
            optimizer:           a.optimizer,
            backend:             a.backend,
            dry_run:             a.dry_run,
        }
    }
}

/// All arguments for the `inspect` command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Directory containing train.txt, valid.txt and test.txt
    #[arg(long, default_value = "data/wikitext-2")]
    pub data_dir: String,

    #[arg(long, default_value_t = 20)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub eval_batch_size: usize,

    #[arg(long, default_value_t = 35)]
    pub bptt: usize,
}

impl From<InspectArgs> for TrainConfig {
    fn from(a: InspectArgs) -> Self {
        TrainConfig {
            data_dir:            a.data_dir,
            train_batch_columns: a.batch_size,
            eval_batch_columns:  a.eval_batch_size,
            window_size:         a.bptt,
            ..TrainConfig::default()
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["causal-lm-trainer", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        let def = TrainConfig::default();

        assert_eq!(cfg.embedding_dim, def.embedding_dim);
        assert_eq!(cfg.window_size, def.window_size);
        assert_eq!(cfg.train_batch_columns, def.train_batch_columns);
        assert_eq!(cfg.lr, def.lr);
        assert_eq!(cfg.lr_decay, def.lr_decay);
        assert_eq!(cfg.optimizer, def.optimizer);
        assert_eq!(cfg.backend, def.backend);
        assert_eq!(cfg.vocab_size, None);
        assert!(!cfg.dry_run);
    }

    #[test]
    fn test_train_flags_reach_the_config() {
        let cli = Cli::try_parse_from([
            "causal-lm-trainer", "train",
            "--bptt", "5", "--batch-size", "10", "--optimizer", "adam",
            "--backend", "wgpu", "--vocab-size", "500", "--dry-run",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();

        assert_eq!(cfg.window_size, 5);
        assert_eq!(cfg.train_batch_columns, 10);
        assert_eq!(cfg.optimizer, OptimizerKind::Adam);
        assert_eq!(cfg.backend, BackendKind::Wgpu);
        assert_eq!(cfg.vocab_size, Some(500));
        assert!(cfg.dry_run);
    }

    #[test]
    fn test_unknown_optimizer_is_rejected() {
        assert!(Cli::try_parse_from(["causal-lm-trainer", "train", "--optimizer", "lbfgs"]).is_err());
    }
}
