use burn::{
    module::Param,
    nn::{
        transformer::{TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput},
        Embedding, EmbeddingConfig, Initializer, Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::domain::error::{ModelError, ModelResult};
use crate::ml::mask::CausalMaskCache;
use crate::ml::positional::{PositionalEncoder, PositionalEncoderConfig};

/// Range for the uniform init of embedding and projection weights.
const INIT_RANGE: f64 = 0.1;

/// Anything that maps a time-major window of token ids to
/// per-position log-probabilities over the vocabulary.
///
/// The Trainer and Evaluator only talk to this trait, so a model
/// with a known output (an oracle, a uniform guesser) can stand in
/// for the transformer when checking loss bookkeeping.
pub trait LanguageModel<B: Backend> {
    /// input: [seq_len, batch] → log-probs [seq_len, batch, vocab]
    fn log_probs(
        &self,
        input: Tensor<B, 2, Int>,
        masks: &mut CausalMaskCache<B>,
    ) -> ModelResult<Tensor<B, 3>>;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct SequenceModelConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    pub ff_hidden:     usize,
    pub num_layers:    usize,
    pub num_heads:     usize,
    pub dropout:       f64,
    #[config(default = 5000)]
    pub max_len:       usize,
}

impl SequenceModelConfig {
    pub fn validate(&self) -> ModelResult<()> {
        if self.vocab_size == 0 {
            return Err(ModelError::config("vocab_size must be > 0"));
        }
        if self.embedding_dim == 0 || self.embedding_dim % 2 != 0 {
            return Err(ModelError::config(format!(
                "embedding_dim must be even and > 0 (got {})",
                self.embedding_dim
            )));
        }
        if self.num_heads == 0 || self.embedding_dim % self.num_heads != 0 {
            return Err(ModelError::config(format!(
                "embedding_dim {} is not divisible by num_heads {}",
                self.embedding_dim, self.num_heads
            )));
        }
        if self.num_layers == 0 || self.ff_hidden == 0 {
            return Err(ModelError::config("num_layers and ff_hidden must be > 0"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::config(format!(
                "dropout must be in [0, 1) (got {})",
                self.dropout
            )));
        }
        Ok(())
    }

    /// Build the model with init_weights applied: embedding and
    /// projection weights uniform in [-0.1, 0.1], projection bias zero.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<SequenceLanguageModel<B>> {
        self.validate()?;
        let uniform = Initializer::Uniform { min: -INIT_RANGE, max: INIT_RANGE };

        let embedding = EmbeddingConfig::new(self.vocab_size, self.embedding_dim)
            .with_initializer(uniform.clone())
            .init(device);
        let positional = PositionalEncoderConfig::new(self.embedding_dim)
            .with_max_len(self.max_len)
            .with_dropout(self.dropout)
            .init(device)?;
        let encoder = TransformerEncoderConfig::new(
            self.embedding_dim,
            self.ff_hidden,
            self.num_heads,
            self.num_layers,
        )
        .with_dropout(self.dropout)
        .init(device);

        let mut projection = LinearConfig::new(self.embedding_dim, self.vocab_size)
            .with_initializer(uniform)
            .init(device);
        projection.bias = Some(Param::from_tensor(Tensor::zeros([self.vocab_size], device)));

        Ok(SequenceLanguageModel {
            embedding,
            positional,
            encoder,
            projection,
            vocab_size:    self.vocab_size,
            embedding_dim: self.embedding_dim,
        })
    }
}

#[derive(Module, Debug)]
pub struct SequenceLanguageModel<B: Backend> {
    pub embedding:     Embedding<B>,
    pub positional:    PositionalEncoder<B>,
    pub encoder:       TransformerEncoder<B>,
    pub projection:    Linear<B>,
    pub vocab_size:    usize,
    pub embedding_dim: usize,
}

impl<B: Backend> SequenceLanguageModel<B> {
    /// input: [seq_len, batch] token ids → [seq_len, batch, vocab] log-probs
    pub fn forward(
        &self,
        input: Tensor<B, 2, Int>,
        masks: &mut CausalMaskCache<B>,
    ) -> ModelResult<Tensor<B, 3>> {
        let [seq_len, batch] = input.dims();
        self.check_token_range(&input)?;

        // Burn layers are batch-first
        let ids = input.swap_dims(0, 1); // [batch, seq_len]

        let embedded = self
            .embedding
            .forward(ids)
            .mul_scalar((self.embedding_dim as f64).sqrt());
        let x = self.positional.forward(embedded)?;

        let mask    = masks.attention_mask(seq_len, batch);
        let encoded = self.encoder.forward(TransformerEncoderInput::new(x).mask_attn(mask));

        let logits = self.projection.forward(encoded); // [batch, seq_len, vocab]
        Ok(log_softmax(logits, 2).swap_dims(0, 1))
    }

    fn check_token_range(&self, input: &Tensor<B, 2, Int>) -> ModelResult<()> {
        let max: i64 = input.clone().max().into_scalar().elem();
        if max >= self.vocab_size as i64 {
            return Err(ModelError::TokenRange { token: max, vocab_size: self.vocab_size });
        }
        let min: i64 = input.clone().min().into_scalar().elem();
        if min < 0 {
            return Err(ModelError::TokenRange { token: min, vocab_size: self.vocab_size });
        }
        Ok(())
    }
}

impl<B: Backend> LanguageModel<B> for SequenceLanguageModel<B> {
    fn log_probs(
        &self,
        input: Tensor<B, 2, Int>,
        masks: &mut CausalMaskCache<B>,
    ) -> ModelResult<Tensor<B, 3>> {
        self.forward(input, masks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny_config(vocab: usize) -> SequenceModelConfig {
        SequenceModelConfig::new(vocab, 8, 16, 1, 2, 0.0).with_max_len(64)
    }

    fn ids(rows: &[&[i32]]) -> Tensor<TestBackend, 2, Int> {
        let device = Default::default();
        let seq    = rows.len();
        let batch  = rows[0].len();
        let flat: Vec<i32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::<TestBackend, 1, Int>::from_ints(flat.as_slice(), &device).reshape([seq, batch])
    }

    fn to_vec(t: Tensor<TestBackend, 3>) -> Vec<f32> {
        t.into_data().iter::<f32>().collect()
    }

    #[test]
    fn test_forward_shape_is_time_major() {
        let device    = Default::default();
        let model     = tiny_config(11).init::<TestBackend>(&device).unwrap();
        let mut masks = CausalMaskCache::new(&device);

        let out = model.forward(ids(&[&[1, 2, 3], &[4, 5, 6], &[7, 8, 9], &[10, 0, 1]]), &mut masks).unwrap();
        assert_eq!(out.dims(), [4, 3, 11]);
        assert_eq!(masks.cached_size(), Some(4));
    }

    #[test]
    fn test_rows_are_normalised_log_probabilities() {
        let device    = Default::default();
        let model     = tiny_config(7).init::<TestBackend>(&device).unwrap();
        let mut masks = CausalMaskCache::new(&device);

        let out   = model.forward(ids(&[&[1, 2], &[3, 4]]), &mut masks).unwrap();
        let probs = to_vec(out.exp());
        for row in probs.chunks(7) {
            let total: f32 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-4, "row sums to {total}");
        }
    }

    #[test]
    fn test_out_of_range_token_is_rejected() {
        let device    = Default::default();
        let model     = tiny_config(5).init::<TestBackend>(&device).unwrap();
        let mut masks = CausalMaskCache::new(&device);

        let err = model.forward(ids(&[&[1, 5]]), &mut masks).unwrap_err();
        assert_eq!(err, ModelError::TokenRange { token: 5, vocab_size: 5 });

        let err = model.forward(ids(&[&[-1, 2]]), &mut masks).unwrap_err();
        assert_eq!(err, ModelError::TokenRange { token: -1, vocab_size: 5 });
    }

    #[test]
    fn test_future_tokens_do_not_change_earlier_outputs() {
        let device    = Default::default();
        let model     = tiny_config(13).init::<TestBackend>(&device).unwrap();
        let mut masks = CausalMaskCache::new(&device);

        let a = to_vec(model.forward(ids(&[&[1], &[2], &[3], &[4]]), &mut masks).unwrap());
        let b = to_vec(model.forward(ids(&[&[1], &[2], &[3], &[9]]), &mut masks).unwrap());

        // positions 0..3 are identical, position 3 differs
        let vocab = 13;
        for (x, y) in a[..3 * vocab].iter().zip(&b[..3 * vocab]) {
            assert!((x - y).abs() < 1e-5);
        }
        let diff: f32 = a[3 * vocab..].iter().zip(&b[3 * vocab..]).map(|(x, y)| (x - y).abs()).sum();
        assert!(diff > 1e-6);
        assert_eq!(masks.rebuilds(), 1);
    }

    #[test]
    fn test_init_weights_ranges_and_zero_bias() {
        let device = Default::default();
        let model  = tiny_config(9).init::<TestBackend>(&device).unwrap();

        let emb: Vec<f32> = model.embedding.weight.val().into_data().iter::<f32>().collect();
        assert!(emb.iter().all(|w| (-0.1..=0.1).contains(w)));

        let proj: Vec<f32> = model.projection.weight.val().into_data().iter::<f32>().collect();
        assert!(proj.iter().all(|w| (-0.1..=0.1).contains(w)));

        let bias = model.projection.bias.as_ref().unwrap().val();
        let bias: Vec<f32> = bias.into_data().iter::<f32>().collect();
        assert_eq!(bias, vec![0.0; 9]);
    }

    #[test]
    fn test_config_validation() {
        assert!(tiny_config(10).validate().is_ok());
        assert!(SequenceModelConfig::new(10, 7, 16, 1, 1, 0.0).validate().is_err());
        assert!(SequenceModelConfig::new(10, 8, 16, 1, 3, 0.0).validate().is_err());
        assert!(SequenceModelConfig::new(0, 8, 16, 1, 2, 0.0).validate().is_err());
        assert!(SequenceModelConfig::new(10, 8, 16, 1, 2, 1.0).validate().is_err());
    }
}
