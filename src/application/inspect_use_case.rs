// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Loads the corpus and reports how it will be batched, without
// building a model. Useful for picking batch columns and window
// size before committing to a long run.

use anyhow::Result;

use crate::application::train_use_case::{prepare_split, TrainConfig};
use crate::data::corpus::Corpus;

/// Corpus and batching statistics for one split.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitStats {
    pub name:              &'static str,
    pub tokens:            usize,
    pub timesteps:         usize,
    pub columns:           usize,
    pub windows_per_epoch: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusStats {
    pub vocab_size: usize,
    pub splits:     Vec<SplitStats>,
}

pub struct InspectUseCase {
    config: TrainConfig,
}

impl InspectUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<CorpusStats> {
        let cfg = &self.config;
        cfg.validate()?;

        let corpus = Corpus::load(&cfg.data_dir)?;
        let parts = [
            ("train", &corpus.train, cfg.train_batch_columns),
            ("valid", &corpus.valid, cfg.eval_batch_columns),
            ("test", &corpus.test, cfg.eval_batch_columns),
        ];

        let mut splits = Vec::with_capacity(parts.len());
        for (name, ids, columns) in parts {
            let matrix = prepare_split(name, ids, columns)?;
            splits.push(SplitStats {
                name,
                tokens:            ids.len(),
                timesteps:         matrix.timesteps(),
                columns:           matrix.columns(),
                windows_per_epoch: matrix.num_windows(cfg.window_size),
            });
        }

        Ok(CorpusStats { vocab_size: corpus.vocab_size(), splits })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_reflect_batching() {
        let tmp = tempfile::tempdir().unwrap();
        // 9 words + <eos> per line → 10 tokens per line
        let line = "a b c d e f g h i";
        std::fs::write(tmp.path().join("train.txt"), vec![line; 100].join("\n")).unwrap();
        std::fs::write(tmp.path().join("valid.txt"), vec![line; 10].join("\n")).unwrap();
        std::fs::write(tmp.path().join("test.txt"), vec![line; 5].join("\n")).unwrap();

        let cfg = TrainConfig {
            data_dir:            tmp.path().to_string_lossy().to_string(),
            train_batch_columns: 10,
            eval_batch_columns:  4,
            window_size:         5,
            ..TrainConfig::default()
        };
        let stats = InspectUseCase::new(cfg).execute().unwrap();

        assert_eq!(stats.vocab_size, 10);
        let train = &stats.splits[0];
        assert_eq!((train.tokens, train.timesteps, train.columns), (1000, 100, 10));
        assert_eq!(train.windows_per_epoch, 20);
        let test = &stats.splits[2];
        assert_eq!((test.tokens, test.timesteps), (50, 12));
        assert_eq!(test.windows_per_epoch, 3);
    }

    #[test]
    fn test_missing_corpus_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            data_dir: tmp.path().to_string_lossy().to_string(),
            ..TrainConfig::default()
        };
        let err = InspectUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("train.txt"));
    }
}
