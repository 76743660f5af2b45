// ============================================================
// Layer 5 — Sinusoidal Positional Encoder
// ============================================================
// Self-attention is permutation-invariant, so position has to be
// injected explicitly. The table is built once at construction:
//
//   div(i)        = exp(−ln(10000) · 2i / d)
//   table[p, 2i]   = sin(p · div(i))
//   table[p, 2i+1] = cos(p · div(i))
//
// for p in [0, max_len) and i in [0, d/2). It is a plain tensor
// field, not a Param, so the optimiser never touches it.
//
// forward(x) adds table[0..seq_len] to every batch row, then
// applies dropout. Burn's Dropout draws a fresh mask per call
// and is a no-op on a non-autodiff backend (evaluation).
//
// Reference: Vaswani et al. (2017) §3.5

use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
};

use crate::domain::error::{ModelError, ModelResult};

#[derive(Config, Debug)]
pub struct PositionalEncoderConfig {
    pub embedding_dim: usize,
    #[config(default = 5000)]
    pub max_len:       usize,
    #[config(default = 0.1)]
    pub dropout:       f64,
}

impl PositionalEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<PositionalEncoder<B>> {
        if self.embedding_dim == 0 || self.embedding_dim % 2 != 0 {
            return Err(ModelError::config(format!(
                "positional encoding pairs sin/cos, embedding_dim must be even and > 0 (got {})",
                self.embedding_dim
            )));
        }
        let values = sinusoid_table(self.embedding_dim, self.max_len);
        let table  = Tensor::<B, 2>::from_data(
            TensorData::new(values, [self.max_len, self.embedding_dim]),
            device,
        );
        Ok(PositionalEncoder {
            table,
            dropout:       DropoutConfig::new(self.dropout).init(),
            max_len:       self.max_len,
            embedding_dim: self.embedding_dim,
        })
    }
}

/// Host-side table, row-major `[max_len, embedding_dim]`.
/// `embedding_dim` must be even.
pub fn sinusoid_table(embedding_dim: usize, max_len: usize) -> Vec<f32> {
    let mut table = vec![0.0f32; max_len * embedding_dim];
    let log_base  = 10000.0_f64.ln();
    for p in 0..max_len {
        for i in 0..embedding_dim / 2 {
            let div   = (-log_base * (2 * i) as f64 / embedding_dim as f64).exp();
            let angle = p as f64 * div;
            table[p * embedding_dim + 2 * i]     = angle.sin() as f32;
            table[p * embedding_dim + 2 * i + 1] = angle.cos() as f32;
        }
    }
    table
}

#[derive(Module, Debug)]
pub struct PositionalEncoder<B: Backend> {
    /// [max_len, embedding_dim], never updated
    table:         Tensor<B, 2>,
    dropout:       Dropout,
    max_len:       usize,
    embedding_dim: usize,
}

impl<B: Backend> PositionalEncoder<B> {
    /// x: [batch, seq_len, embedding_dim] → same shape
    pub fn forward(&self, x: Tensor<B, 3>) -> ModelResult<Tensor<B, 3>> {
        let [batch, seq_len, dim] = x.dims();
        if dim != self.embedding_dim {
            return Err(ModelError::shape("positional encoding width", self.embedding_dim, dim));
        }
        if seq_len > self.max_len {
            return Err(ModelError::shape(
                "positional encoding length",
                format!("seq_len <= {}", self.max_len),
                seq_len,
            ));
        }

        let pe = self
            .table
            .clone()
            .slice([0..seq_len, 0..dim])
            .unsqueeze::<3>()
            .expand([batch, seq_len, dim]);

        Ok(self.dropout.forward(x + pe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_sin_cos_pairs_lie_on_unit_circle() {
        let d     = 16;
        let table = sinusoid_table(d, 200);
        for p in 0..200 {
            for i in 0..d / 2 {
                let s = table[p * d + 2 * i];
                let c = table[p * d + 2 * i + 1];
                assert!((s * s + c * c - 1.0).abs() < 1e-5, "p={p} i={i}");
            }
        }
    }

    #[test]
    fn test_first_row_and_first_frequency() {
        let d     = 8;
        let table = sinusoid_table(d, 4);
        // position 0: sin(0) = 0, cos(0) = 1 for every frequency
        for i in 0..d / 2 {
            assert_eq!(table[2 * i], 0.0);
            assert_eq!(table[2 * i + 1], 1.0);
        }
        // frequency 0 has div = 1, so table[p, 0] = sin(p)
        assert!((table[3 * d] - 3.0f32.sin()).abs() < 1e-6);
        assert!((table[3 * d + 1] - 3.0f32.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_odd_embedding_dim_is_rejected() {
        let device = Default::default();
        let result = PositionalEncoderConfig::new(7).init::<TestBackend>(&device);
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_forward_adds_table_without_dropout() {
        let device  = Default::default();
        let encoder = PositionalEncoderConfig::new(4)
            .with_max_len(10)
            .with_dropout(0.0)
            .init::<TestBackend>(&device)
            .unwrap();

        let x   = Tensor::<TestBackend, 3>::zeros([2, 3, 4], &device);
        let out = encoder.forward(x).unwrap();
        assert_eq!(out.dims(), [2, 3, 4]);

        let got: Vec<f32>      = out.into_data().iter::<f32>().collect();
        let expected: Vec<f32> = sinusoid_table(4, 10)[..12].to_vec();
        // both batch rows receive the same encoding
        assert_eq!(&got[..12], expected.as_slice());
        assert_eq!(&got[12..], expected.as_slice());
    }

    #[test]
    fn test_sequence_longer_than_table_is_a_shape_error() {
        let device  = Default::default();
        let encoder = PositionalEncoderConfig::new(4)
            .with_max_len(3)
            .init::<TestBackend>(&device)
            .unwrap();
        let x = Tensor::<TestBackend, 3>::zeros([1, 4, 4], &device);
        assert!(matches!(encoder.forward(x), Err(ModelError::Shape { .. })));
    }
}
