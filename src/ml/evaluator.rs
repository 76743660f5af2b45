// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Same windowing as training, no parameter updates.
//
// Callers pass `model.valid()`, which lives on the inner (non-
// autodiff) backend. That is what "no gradient tracking" means in
// Burn: there is no graph to record into, and Dropout is a no-op.
//
// The split loss is token-weighted:
//
//   loss = Σ_windows (seq_len × window_loss) / (timesteps − 1)
//
// Each window_loss is already a mean over seq_len × columns tokens,
// so weighting by seq_len and dividing by the number of predicted
// rows gives a mean per token. The short final window counts for
// exactly as many rows as it has.

use anyhow::Result;
use burn::prelude::*;

use crate::data::batcher::{self, WindowBatcher};
use crate::domain::error::ModelError;
use crate::domain::token_matrix::TokenMatrix;
use crate::ml::loss::nll_loss;
use crate::ml::mask::CausalMaskCache;
use crate::ml::model::LanguageModel;

pub struct Evaluator<B: Backend> {
    batcher:     WindowBatcher<B>,
    masks:       CausalMaskCache<B>,
    window_size: usize,
}

impl<B: Backend> Evaluator<B> {
    pub fn new(window_size: usize, device: &B::Device) -> Self {
        Self {
            batcher: WindowBatcher::new(device.clone()),
            masks:   CausalMaskCache::new(device),
            window_size,
        }
    }

    /// Mean per-token loss of `model` over the whole of `data`.
    pub fn evaluate<M: LanguageModel<B>>(&mut self, model: &M, data: &TokenMatrix) -> Result<f64> {
        let timesteps = data.timesteps();
        if timesteps < 2 {
            return Err(ModelError::shape(
                "evaluation split",
                "at least 2 timesteps",
                format!("{timesteps} timesteps"),
            )
            .into());
        }

        let mut weighted_sum = 0.0f64;
        for window in batcher::windows(data, self.window_size) {
            let window    = window?;
            let batch     = self.batcher.batch(&window)?;
            let log_probs = model.log_probs(batch.input, &mut self.masks)?;
            let [seq_len, columns, vocab] = log_probs.dims();

            let loss: f64 = nll_loss(log_probs.reshape([seq_len * columns, vocab]), batch.targets)
                .into_scalar()
                .elem();
            weighted_sum += batch.seq_len as f64 * loss;
        }

        let loss = weighted_sum / (timesteps - 1) as f64;
        if !loss.is_finite() {
            return Err(ModelError::NumericInstability(format!("evaluation loss is {loss}")).into());
        }
        Ok(loss)
    }
}

#[cfg(test)]
pub mod oracles {
    //! Models with a known output, for checking loss bookkeeping.

    use super::*;
    use crate::domain::error::ModelResult;

    /// Puts probability 1 on `(token + 1) % vocab` at every position.
    pub struct SuccessorOracle {
        pub vocab: usize,
    }

    impl<B: Backend> LanguageModel<B> for SuccessorOracle {
        fn log_probs(
            &self,
            input: Tensor<B, 2, Int>,
            _masks: &mut CausalMaskCache<B>,
        ) -> ModelResult<Tensor<B, 3>> {
            let [seq_len, batch] = input.dims();
            let device = input.device();
            let ids: Vec<i64> = input.into_data().iter::<i64>().collect();

            let mut values = vec![f32::NEG_INFINITY; seq_len * batch * self.vocab];
            for (pos, &id) in ids.iter().enumerate() {
                let next = (id as usize + 1) % self.vocab;
                values[pos * self.vocab + next] = 0.0;
            }
            Ok(Tensor::from_data(TensorData::new(values, [seq_len, batch, self.vocab]), &device))
        }
    }

    /// Spreads probability evenly over the vocabulary.
    pub struct UniformModel {
        pub vocab: usize,
    }

    impl<B: Backend> LanguageModel<B> for UniformModel {
        fn log_probs(
            &self,
            input: Tensor<B, 2, Int>,
            _masks: &mut CausalMaskCache<B>,
        ) -> ModelResult<Tensor<B, 3>> {
            let [seq_len, batch] = input.dims();
            Ok(Tensor::full(
                [seq_len, batch, self.vocab],
                -(self.vocab as f32).ln(),
                &input.device(),
            ))
        }
    }

    /// Emits NaN everywhere, as a diverged model would.
    pub struct NanModel {
        pub vocab: usize,
    }

    impl<B: Backend> LanguageModel<B> for NanModel {
        fn log_probs(
            &self,
            input: Tensor<B, 2, Int>,
            _masks: &mut CausalMaskCache<B>,
        ) -> ModelResult<Tensor<B, 3>> {
            let [seq_len, batch] = input.dims();
            Ok(Tensor::full([seq_len, batch, self.vocab], f32::NAN, &input.device()))
        }
    }
}
