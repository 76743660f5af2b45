// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn-specific model and training code lives here.
//
//   positional.rs — sinusoidal table + dropout, added to embeddings
//   mask.rs       — size-keyed cache of the additive causal mask
//   model.rs      — embedding → positional → TransformerEncoder
//                   → vocabulary projection → log-softmax
//   loss.rs       — token-averaged NLL over log-probabilities
//   clip.rs       — global L2 gradient-norm clipping
//   trainer.rs    — one epoch of windowed training
//   evaluator.rs  — token-weighted loss over a split, no updates
//   run.rs        — epochs, learning-rate decay, best model, test
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

pub mod positional;

pub mod mask;

pub mod model;

pub mod loss;

pub mod clip;

pub mod trainer;

pub mod evaluator;

pub mod run;
