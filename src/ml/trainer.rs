// ============================================================
// Layer 5 — Trainer (one epoch)
// ============================================================
// Walks the training matrix window by window, strictly in order:
//
//   for start in 0, W, 2W, …:
//     forward → NLL over the flattened window → backward
//       → clip global grad norm → optimiser step
//
// Every window is an independent forward/backward pass; no hidden
// state is carried from one window to the next.
//
// Burn gradients are produced fresh by each loss.backward(), so
// nothing accumulates between windows and there is nothing to zero.
//
// Reporting: the running loss is flushed to the ProgressReporter
// whenever `window % log_interval == 0 && window > 0`. A
// log_interval of 0 is treated as 1 (report every window). The
// mean is taken over the windows since the previous report.
//
// Reference: Burn Book §5 (Custom Training Loop)

use std::time::Instant;

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::{self, WindowBatcher};
use crate::domain::error::ModelError;
use crate::domain::report::{perplexity, WindowReport};
use crate::domain::token_matrix::{TokenMatrix, Window};
use crate::domain::traits::ProgressReporter;
use crate::ml::clip::clip_grad_norm;
use crate::ml::loss::nll_loss;
use crate::ml::mask::CausalMaskCache;
use crate::ml::model::LanguageModel;

/// What one epoch of training saw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub windows:   usize,
    pub mean_loss: f64,
}

pub struct Trainer<B: AutodiffBackend> {
    batcher:      WindowBatcher<B>,
    masks:        CausalMaskCache<B>,
    window_size:  usize,
    clip_norm:    f64,
    log_interval: usize,
    dry_run:      bool,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(cfg: &TrainConfig, device: &B::Device) -> Self {
        Self {
            batcher:      WindowBatcher::new(device.clone()),
            masks:        CausalMaskCache::new(device),
            window_size:  cfg.window_size,
            clip_norm:    cfg.clip_norm,
            log_interval: cfg.log_interval.max(1),
            dry_run:      cfg.dry_run,
        }
    }

    #[cfg(test)]
    pub fn masks(&self) -> &CausalMaskCache<B> {
        &self.masks
    }

    /// Train `model` for one pass over `data` at learning rate `lr`.
    pub fn train_epoch<M, O, R>(
        &mut self,
        mut model: M,
        optim:     &mut O,
        data:      &TokenMatrix,
        epoch:     usize,
        lr:        f64,
        reporter:  &mut R,
    ) -> Result<(M, EpochStats)>
    where
        M: LanguageModel<B> + AutodiffModule<B>,
        O: Optimizer<M, B>,
        R: ProgressReporter + ?Sized,
    {
        let windows_per_epoch = data.num_windows(self.window_size);

        let mut epoch_loss     = 0.0f64;
        let mut epoch_windows  = 0usize;
        let mut running_loss   = 0.0f64;
        let mut running_count  = 0usize;
        let mut interval_start = Instant::now();

        for (index, window) in batcher::windows(data, self.window_size).enumerate() {
            let window = window?;

            let (next, loss) = self.train_window(model, optim, &window, lr)?;
            model = next;

            epoch_loss    += loss;
            epoch_windows += 1;
            running_loss  += loss;
            running_count += 1;

            if index % self.log_interval == 0 && index > 0 {
                let mean = running_loss / running_count as f64;
                let ms   = interval_start.elapsed().as_secs_f64() * 1000.0 / running_count as f64;
                reporter.window_report(&WindowReport {
                    epoch,
                    window: index,
                    windows_per_epoch,
                    lr,
                    ms_per_window: ms,
                    loss: mean,
                    ppl: perplexity(mean),
                })?;
                running_loss   = 0.0;
                running_count  = 0;
                interval_start = Instant::now();
            }

            if self.dry_run {
                tracing::info!("Dry run: stopping epoch {} after one window", epoch);
                break;
            }
        }

        tracing::debug!(
            "Epoch {} done: {} windows, {} causal mask builds so far",
            epoch,
            epoch_windows,
            self.masks.rebuilds(),
        );

        let mean_loss = if epoch_windows > 0 {
            epoch_loss / epoch_windows as f64
        } else {
            f64::NAN
        };
        Ok((model, EpochStats { windows: epoch_windows, mean_loss }))
    }

    /// One forward/backward/step on a single window. Returns the
    /// updated model and the window's mean loss.
    fn train_window<M, O>(
        &mut self,
        model: M,
        optim: &mut O,
        window: &Window,
        lr:    f64,
    ) -> Result<(M, f64)>
    where
        M: LanguageModel<B> + AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let batch     = self.batcher.batch(window)?;
        let log_probs = model.log_probs(batch.input, &mut self.masks)?;
        let [seq_len, columns, vocab] = log_probs.dims();

        let loss = nll_loss(log_probs.reshape([seq_len * columns, vocab]), batch.targets);
        let loss_value: f64 = loss.clone().into_scalar().elem();
        if !loss_value.is_finite() {
            return Err(ModelError::NumericInstability(format!(
                "training loss is {loss_value} at window starting row {}",
                window.start
            ))
            .into());
        }

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let (grads, norm) = clip_grad_norm::<B, M>(&model, grads, self.clip_norm)?;
        tracing::trace!("window {} loss={:.4} grad_norm={:.4}", window.start, loss_value, norm);

        Ok((optim.step(lr, model, grads), loss_value))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::SgdConfig;

    use crate::data::batcher::batchify;
    use crate::domain::traits::testing::RecordingReporter;
    use crate::ml::model::SequenceModelConfig;

    type TestBackend = Autodiff<NdArray>;

    fn tiny_cfg() -> TrainConfig {
        TrainConfig {
            embedding_dim:       8,
            ff_hidden:           16,
            num_layers:          1,
            num_heads:           2,
            dropout:             0.0,
            train_batch_columns: 10,
            window_size:         5,
            lr:                  0.5,
            clip_norm:           0.25,
            log_interval:        0,
            ..TrainConfig::default()
        }
    }

    fn corpus(len: usize, vocab: u32) -> Vec<u32> {
        (0..len as u32).map(|i| (i * 7 + i / 3) % vocab).collect()
    }

    #[test]
    fn test_every_window_reports_after_the_first() {
        let device = Default::default();
        let cfg    = tiny_cfg();
        let model  = SequenceModelConfig::new(20, 8, 16, 1, 2, 0.0)
            .init::<TestBackend>(&device)
            .unwrap();
        let mut optim    = SgdConfig::new().init();
        let mut trainer  = Trainer::<TestBackend>::new(&cfg, &device);
        let mut reporter = RecordingReporter::default();

        let data = batchify(&corpus(1000, 20), 10).unwrap();
        assert_eq!(data.shape(), (100, 10));

        let (_, stats) = trainer
            .train_epoch(model, &mut optim, &data, 1, cfg.lr, &mut reporter)
            .unwrap();

        assert_eq!(stats.windows, 20);
        assert!(stats.mean_loss.is_finite());
        assert_eq!(reporter.windows.len(), 19);
        assert_eq!(reporter.windows[0].window, 1);
        assert_eq!(reporter.windows[18].window, 19);
        assert!(reporter.windows.iter().all(|r| r.windows_per_epoch == 20 && r.lr == 0.5));
        // full windows use size 5, the last one size 4
        assert_eq!(trainer.masks().cached_size(), Some(4));
        assert_eq!(trainer.masks().rebuilds(), 2);
    }

    #[test]
    fn test_report_interval_and_mean() {
        let device = Default::default();
        let cfg    = TrainConfig { log_interval: 8, ..tiny_cfg() };
        let model  = SequenceModelConfig::new(20, 8, 16, 1, 2, 0.0)
            .init::<TestBackend>(&device)
            .unwrap();
        let mut optim    = SgdConfig::new().init();
        let mut trainer  = Trainer::<TestBackend>::new(&cfg, &device);
        let mut reporter = RecordingReporter::default();

        let data = batchify(&corpus(1000, 20), 10).unwrap();
        trainer.train_epoch(model, &mut optim, &data, 3, 0.1, &mut reporter).unwrap();

        let at: Vec<usize> = reporter.windows.iter().map(|r| r.window).collect();
        assert_eq!(at, vec![8, 16]);
        for r in &reporter.windows {
            assert_eq!(r.epoch, 3);
            assert!((r.ppl - r.loss.exp()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_dry_run_stops_after_one_window() {
        let device = Default::default();
        let cfg    = TrainConfig { dry_run: true, ..tiny_cfg() };
        let model  = SequenceModelConfig::new(20, 8, 16, 1, 2, 0.0)
            .init::<TestBackend>(&device)
            .unwrap();
        let mut optim   = SgdConfig::new().init();
        let mut trainer = Trainer::<TestBackend>::new(&cfg, &device);

        let data = batchify(&corpus(1000, 20), 10).unwrap();
        let (_, stats) = trainer
            .train_epoch(model, &mut optim, &data, 1, 0.5, &mut RecordingReporter::default())
            .unwrap();
        assert_eq!(stats.windows, 1);
    }

    #[test]
    fn test_repeated_epochs_lower_the_loss() {
        let device = Default::default();
        let cfg    = tiny_cfg();
        let mut model = SequenceModelConfig::new(20, 8, 16, 1, 2, 0.0)
            .init::<TestBackend>(&device)
            .unwrap();
        let mut optim   = SgdConfig::new().init();
        let mut trainer = Trainer::<TestBackend>::new(&cfg, &device);
        let mut sink    = RecordingReporter::default();

        // a corpus with a single repeating cycle is easy to fit
        let cycle: Vec<u32> = (0..1000u32).map(|i| i % 5).collect();
        let data = batchify(&cycle, 10).unwrap();

        let mut losses = Vec::new();
        for epoch in 1..=4 {
            let (next, stats) = trainer
                .train_epoch(model, &mut optim, &data, epoch, 1.0, &mut sink)
                .unwrap();
            model = next;
            losses.push(stats.mean_loss);
        }
        assert!(losses[3] < losses[0], "losses: {losses:?}");
    }

    #[test]
    fn test_non_finite_loss_aborts_the_epoch() {
        use burn::module::Param;

        let device    = Default::default();
        let cfg       = tiny_cfg();
        let mut model = SequenceModelConfig::new(20, 8, 16, 1, 2, 0.0)
            .init::<TestBackend>(&device)
            .unwrap();
        // a NaN bias poisons every logit
        model.projection.bias = Some(Param::from_tensor(Tensor::full([20], f32::NAN, &device)));

        let mut optim    = SgdConfig::new().init();
        let mut trainer  = Trainer::<TestBackend>::new(&cfg, &device);
        let mut reporter = RecordingReporter::default();

        let data = batchify(&corpus(200, 20), 10).unwrap();
        let err  = trainer
            .train_epoch(model, &mut optim, &data, 1, 0.5, &mut reporter)
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<ModelError>(),
            Some(ModelError::NumericInstability(_))
        ));
        assert!(reporter.windows.is_empty());
    }

    #[test]
    fn test_out_of_vocab_corpus_aborts_the_epoch() {
        let device = Default::default();
        let cfg    = tiny_cfg();
        let model  = SequenceModelConfig::new(10, 8, 16, 1, 2, 0.0)
            .init::<TestBackend>(&device)
            .unwrap();
        let mut optim   = SgdConfig::new().init();
        let mut trainer = Trainer::<TestBackend>::new(&cfg, &device);

        let data = batchify(&corpus(200, 20), 10).unwrap();
        let err  = trainer
            .train_epoch(model, &mut optim, &data, 1, 0.5, &mut RecordingReporter::default())
            .err()
            .unwrap();
        assert!(matches!(err.downcast_ref::<ModelError>(), Some(ModelError::TokenRange { .. })));
    }
}
