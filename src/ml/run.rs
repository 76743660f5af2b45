// ============================================================
// Layer 5 — Training Run (all epochs)
// ============================================================
// For epoch e = 1..=epochs:
//
//   1. train one epoch at the current learning rate
//   2. evaluate model.valid() on the validation split
//   3. if this is the first epoch, or val_loss is strictly lower
//      than the best so far, snapshot the model as the new best
//   4. lr ← lr × lr_decay          (always, improved or not)
//
// so the rate in effect during epoch e is lr0 · γ^(e−1).
//
// After the last epoch the best snapshot is scored on the test
// split. The run state lives in an explicit TrainingRun value
// threaded through the loop and handed back in the RunOutcome.
//
// Reference: Burn Book §5 (Training)

use std::time::Instant;

use anyhow::{anyhow, Result};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::report::{perplexity, EpochSummary, TestSummary};
use crate::domain::token_matrix::TokenMatrix;
use crate::domain::traits::ProgressReporter;
use crate::ml::evaluator::Evaluator;
use crate::ml::model::LanguageModel;
use crate::ml::trainer::Trainer;

/// The best model seen so far and the epoch that produced it.
#[derive(Debug, Clone)]
pub struct BestModel<M> {
    pub epoch:    usize,
    pub val_loss: f64,
    pub model:    M,
}

/// Epoch counter, current learning rate and best snapshot.
#[derive(Debug, Clone)]
pub struct TrainingRun<M> {
    epoch: usize,
    lr:    f64,
    best:  Option<BestModel<M>>,
}

impl<M: Clone> TrainingRun<M> {
    pub fn new(initial_lr: f64) -> Self {
        Self { epoch: 0, lr: initial_lr, best: None }
    }

    pub fn epoch(&self) -> usize { self.epoch }

    pub fn lr(&self) -> f64 { self.lr }

    pub fn best(&self) -> Option<&BestModel<M>> { self.best.as_ref() }

    /// Record the validation loss of `epoch`. Returns true when the
    /// model becomes the new best.
    pub fn record(&mut self, epoch: usize, val_loss: f64, model: &M) -> bool {
        self.epoch = epoch;
        let improved = match &self.best {
            None       => true,
            Some(best) => val_loss < best.val_loss,
        };
        if improved {
            self.best = Some(BestModel { epoch, val_loss, model: model.clone() });
        }
        improved
    }

    /// Multiply the learning rate by `factor`.
    pub fn decay(&mut self, factor: f64) {
        self.lr *= factor;
    }

    pub fn into_best(self) -> Option<BestModel<M>> {
        self.best
    }
}

/// The three batchified corpus splits.
#[derive(Debug, Clone, Copy)]
pub struct Splits<'a> {
    pub train: &'a TokenMatrix,
    pub valid: &'a TokenMatrix,
    pub test:  &'a TokenMatrix,
}

/// What a finished run hands back.
#[derive(Debug, Clone)]
pub struct RunOutcome<M> {
    pub best:      BestModel<M>,
    pub test_loss: f64,
    /// Learning rate after the final decay.
    pub final_lr:  f64,
}

/// Train for `cfg.epochs` epochs and score the best model on test.
pub fn run_training<B, M, O, R>(
    cfg:      &TrainConfig,
    model:    M,
    mut optim: O,
    splits:   Splits<'_>,
    device:   &B::Device,
    reporter: &mut R,
) -> Result<RunOutcome<M>>
where
    B: AutodiffBackend,
    M: LanguageModel<B> + AutodiffModule<B>,
    M::InnerModule: LanguageModel<B::InnerBackend>,
    O: Optimizer<M, B>,
    R: ProgressReporter + ?Sized,
{
    let mut trainer   = Trainer::<B>::new(cfg, device);
    let mut evaluator = Evaluator::<B::InnerBackend>::new(cfg.window_size, device);
    let mut run       = TrainingRun::new(cfg.lr);
    let mut model     = model;

    tracing::info!(
        "Training {} epochs: {} train windows/epoch, lr={} decay={}",
        cfg.epochs,
        splits.train.num_windows(cfg.window_size),
        cfg.lr,
        cfg.lr_decay,
    );

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let epoch_start = Instant::now();
        let lr          = run.lr();

        let (trained, stats) =
            trainer.train_epoch(model, &mut optim, splits.train, epoch, lr, reporter)?;
        model = trained;

        let val_loss = evaluator.evaluate(&model.valid(), splits.valid)?;
        let improved = run.record(epoch, val_loss, &model);

        if improved {
            tracing::info!("Epoch {} is the new best (val_loss={:.4})", epoch, val_loss);
        } else if let Some(best) = run.best() {
            tracing::warn!(
                "Epoch {} did not improve validation loss ({:.4} vs {:.4} at epoch {})",
                epoch,
                val_loss,
                best.val_loss,
                best.epoch,
            );
        }

        reporter.epoch_summary(&EpochSummary {
            epoch,
            lr,
            elapsed_secs: epoch_start.elapsed().as_secs_f64(),
            val_loss,
            val_ppl: perplexity(val_loss),
            improved,
        })?;
        tracing::debug!("Epoch {} mean train loss {:.4} over {} windows", epoch, stats.mean_loss, stats.windows);

        run.decay(cfg.lr_decay);
    }

    // ── Test the best snapshot ────────────────────────────────────────────────
    let final_lr = run.lr();
    tracing::info!("Finished {} epochs, learning rate now {:.3e}", run.epoch(), final_lr);
    let best = run
        .into_best()
        .ok_or_else(|| anyhow!("training ran zero epochs, no model to test"))?;

    let test_loss = evaluator.evaluate(&best.model.valid(), splits.test)?;
    reporter.test_summary(&TestSummary {
        best_epoch: best.epoch,
        test_loss,
        test_ppl: perplexity(test_loss),
    })?;

    Ok(RunOutcome { best, test_loss, final_lr })
}
