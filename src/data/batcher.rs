// ============================================================
// Layer 4 — Batcher
// ============================================================
// Two host-side operations and one host → device step:
//
//   batchify(flat, B)
//     flat corpus ids → TokenMatrix of shape (⌊L/B⌋ × B)
//
//     The corpus is cut into B equal contiguous runs, and run b
//     becomes column b. Tokens left over after ⌊L/B⌋·B are dropped
//     from the end: no wraparound, no padding.
//
//     Example, L = 10, B = 3 (token 9 is dropped):
//       flat:   0 1 2 | 3 4 5 | 6 7 8 | 9
//       matrix: t=0 → [0, 3, 6]
//               t=1 → [1, 4, 7]
//               t=2 → [2, 5, 8]
//
//   get_window(source, start, W)
//     rows [start, start+seq_len) as input and the rows one step
//     later as target, where seq_len = min(W, T - 1 - start).
//     The final window of a split may therefore be shorter than W.
//
//   WindowBatcher::batch(window)
//     Window → Burn Int tensors on the target device:
//       input   [seq_len, columns]
//       targets [seq_len * columns]   (time-major, like the input)
//
// Reference: Burn Book §4 (Batcher)
//            Rust Book §8 (Vectors)

use burn::prelude::*;

use crate::domain::error::{ModelError, ModelResult};
use crate::domain::token_matrix::{TokenMatrix, Window};

/// Reshape a flat token sequence into `batch_columns` independent columns.
pub fn batchify(flat: &[u32], batch_columns: usize) -> ModelResult<TokenMatrix> {
    if batch_columns == 0 {
        return Err(ModelError::config("batch_columns must be > 0"));
    }
    let timesteps = flat.len() / batch_columns;

    let mut tokens = Vec::with_capacity(timesteps * batch_columns);
    for t in 0..timesteps {
        for b in 0..batch_columns {
            tokens.push(flat[b * timesteps + t]);
        }
    }

    let dropped = flat.len() - timesteps * batch_columns;
    if dropped > 0 {
        tracing::debug!("batchify: dropped {} trailing tokens", dropped);
    }
    TokenMatrix::from_time_major(tokens, timesteps, batch_columns)
}

/// Slice the window starting at row `start`, paired with its
/// one-step-ahead target.
pub fn get_window(source: &TokenMatrix, start: usize, window_size: usize) -> ModelResult<Window> {
    if window_size == 0 {
        return Err(ModelError::config("window_size must be > 0"));
    }
    let timesteps = source.timesteps();
    if start + 1 >= timesteps {
        return Err(ModelError::shape(
            "window start",
            format!("start < {}", timesteps.saturating_sub(1)),
            start,
        ));
    }

    let seq_len = window_size.min(timesteps - 1 - start);
    let data    = source.rows(start, start + seq_len).to_vec();
    let target  = source.rows(start + 1, start + 1 + seq_len).to_vec();

    Ok(Window {
        start,
        seq_len,
        columns: source.columns(),
        data,
        target,
    })
}

/// Iterate every window of a matrix in order: starts 0, W, 2W, …
pub fn windows(
    source:      &TokenMatrix,
    window_size: usize,
) -> impl Iterator<Item = ModelResult<Window>> + '_ {
    source
        .window_starts(window_size)
        .map(move |start| get_window(source, start, window_size))
}

// ─── WindowBatch ──────────────────────────────────────────────────────────────
/// A window on the device, ready for the forward pass.
#[derive(Debug, Clone)]
pub struct WindowBatch<B: Backend> {
    /// Token ids — shape: [seq_len, columns]
    pub input: Tensor<B, 2, Int>,

    /// Next-token ids — shape: [seq_len * columns], time-major
    pub targets: Tensor<B, 1, Int>,

    /// Rows in this window (may be < window_size for the last one)
    pub seq_len: usize,
}

// ─── WindowBatcher ────────────────────────────────────────────────────────────
/// Holds the target device so tensors land on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct WindowBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> WindowBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Move one window onto the device.
    pub fn batch(&self, window: &Window) -> ModelResult<WindowBatch<B>> {
        // Burn uses i32 for Int tensor construction
        let input_flat  = to_i32(&window.data)?;
        let target_flat = to_i32(&window.target)?;

        let input = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device
        ).reshape([window.seq_len, window.columns]);

        let targets = Tensor::<B, 1, Int>::from_ints(
            target_flat.as_slice(), &self.device
        );

        Ok(WindowBatch { input, targets, seq_len: window.seq_len })
    }
}

/// Ids past i32::MAX cannot be represented in an Int tensor.
fn to_i32(ids: &[u32]) -> ModelResult<Vec<i32>> {
    ids.iter()
        .map(|&id| {
            i32::try_from(id).map_err(|_| ModelError::TokenRange {
                token:      i64::from(id),
                vocab_size: i32::MAX as usize + 1,
            })
        })
        .collect()
}
