use burn::prelude::*;

/// Token-averaged negative log-likelihood.
///
/// `log_probs` is `[N, vocab]` (already log-softmaxed) and `targets`
/// holds one id per row. Returns a single-element tensor:
///
///   loss = −(1/N) Σ_n log_probs[n, targets[n]]
///
/// On log-softmax output this is the cross-entropy of the window.
pub fn nll_loss<B: Backend>(log_probs: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let [n] = targets.dims();
    log_probs
        .gather(1, targets.reshape([n, 1]))
        .mean()
        .neg()
}
