// ============================================================
// Layer 5 — Global Gradient-Norm Clipping
// ============================================================
// Burn's GradientClippingConfig::Norm clips each parameter on its
// own. Here the norm is taken over ALL gradients at once:
//
//   total = sqrt( Σ_params Σ_elements g² )
//
// and if total > max_norm every gradient is scaled by
//
//   max_norm / (total + 1e-6)
//
// which keeps the update direction and bounds its length.
//
// Two visitor passes walk the model's float parameters: the first
// sums squares out of GradientsParams, the second rescales them in
// place. Parameters without a gradient are skipped.

use std::marker::PhantomData;

use burn::{
    module::{AutodiffModule, ModuleVisitor, Param},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::domain::error::{ModelError, ModelResult};

const CLIP_EPS: f64 = 1e-6;

struct SquaredNorm<'a, B: AutodiffBackend> {
    grads:  &'a GradientsParams,
    sum_sq: f64,
    _b:     PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(param.id) {
            let sq: f64 = grad.powf_scalar(2.0).sum().into_scalar().elem();
            self.sum_sq += sq;
        }
    }
}

struct Rescale<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    scale: f64,
    _b:    PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_, B> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(param.id) {
            self.grads.register::<B::InnerBackend, D>(param.id, grad.mul_scalar(self.scale));
        }
    }
}

/// L2 norm over every gradient the model owns.
pub fn global_grad_norm<B, M>(model: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut visitor = SquaredNorm::<B> { grads, sum_sq: 0.0, _b: PhantomData };
    model.visit(&mut visitor);
    visitor.sum_sq.sqrt()
}

/// Clip `grads` to a global L2 norm of `max_norm`.
///
/// Returns the (possibly rescaled) gradients and the norm measured
/// before clipping. A non-finite norm is reported as
/// NumericInstability; clipping cannot rescue it.
pub fn clip_grad_norm<B, M>(
    model:    &M,
    mut grads: GradientsParams,
    max_norm: f64,
) -> ModelResult<(GradientsParams, f64)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let total = global_grad_norm::<B, M>(model, &grads);
    if !total.is_finite() {
        return Err(ModelError::NumericInstability(format!(
            "gradient norm is {total} before clipping"
        )));
    }

    if total > max_norm {
        let scale = max_norm / (total + CLIP_EPS);
        let mut visitor = Rescale::<B> { grads: &mut grads, scale, _b: PhantomData };
        model.visit(&mut visitor);
        tracing::debug!("Clipped gradient norm {:.4} → {:.4}", total, max_norm);
    }
    Ok((grads, total))
}
