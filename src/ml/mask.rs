// ============================================================
// Layer 5 — Causal Mask Cache
// ============================================================
// Additive attention bias that hides the future:
//
//            j=0   j=1   j=2
//   i=0  [    0,  -inf, -inf ]
//   i=1  [    0,     0, -inf ]
//   i=2  [    0,     0,    0 ]
//
// Added to raw attention scores before softmax, the -inf entries
// get exactly zero probability, so position i only ever sees
// positions ≤ i.
//
// The cache owns at most one mask. mask_for(n) rebuilds it only
// when n differs from the cached size; otherwise the cached tensor
// is handed back unchanged. Windows are almost always full length,
// so a whole epoch typically rebuilds twice: once for the first
// window and once for the short final one.
//
// Burn's multi-head attention takes a boolean mask (true = hidden)
// shaped [batch, n, n]. attention_mask() derives that view from the
// additive mask, so the additive form stays the single source.
//
// The cache is passed to forward() as &mut rather than living
// inside the model, so nothing mutates behind a shared reference.
// One cache per backend: the trainer keeps one on the autodiff
// backend and the evaluator keeps one on the inner backend.

use burn::prelude::*;

/// A built mask and the size it was built for.
#[derive(Debug, Clone)]
pub struct CausalMask<B: Backend> {
    pub size:     usize,
    /// [size, size], 0 where j ≤ i, -inf where j > i
    pub additive: Tensor<B, 2>,
}

/// Host-side mask values, row-major `[size, size]`.
pub fn causal_mask_values(size: usize) -> Vec<f32> {
    let mut values = vec![0.0f32; size * size];
    for i in 0..size {
        for j in (i + 1)..size {
            values[i * size + j] = f32::NEG_INFINITY;
        }
    }
    values
}

#[derive(Debug, Clone)]
pub struct CausalMaskCache<B: Backend> {
    device:   B::Device,
    cached:   Option<CausalMask<B>>,
    rebuilds: usize,
}

impl<B: Backend> CausalMaskCache<B> {
    pub fn new(device: &B::Device) -> Self {
        Self { device: device.clone(), cached: None, rebuilds: 0 }
    }

    /// Additive mask for `size`, rebuilt only when the size changes.
    pub fn mask_for(&mut self, size: usize) -> Tensor<B, 2> {
        match &self.cached {
            Some(mask) if mask.size == size => mask.additive.clone(),
            _ => {
                let additive = Tensor::<B, 2>::from_data(
                    TensorData::new(causal_mask_values(size), [size, size]),
                    &self.device,
                );
                self.rebuilds += 1;
                tracing::debug!("Causal mask rebuilt for size {} (rebuild #{})", size, self.rebuilds);
                self.cached = Some(CausalMask { size, additive: additive.clone() });
                additive
            }
        }
    }

    /// Boolean view for Burn attention: [batch, size, size], true = hidden.
    pub fn attention_mask(&mut self, size: usize, batch: usize) -> Tensor<B, 3, Bool> {
        self.mask_for(size)
            .lower_elem(0.0)
            .unsqueeze::<3>()
            .expand([batch, size, size])
    }

    /// Size of the mask currently held, if any.
    #[cfg(test)]
    pub fn cached_size(&self) -> Option<usize> {
        self.cached.as_ref().map(|m| m.size)
    }

    /// How many times a mask has been built.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }
}
