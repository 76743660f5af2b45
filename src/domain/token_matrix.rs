// ============================================================
// Layer 3 — TokenMatrix and Window
// ============================================================
// Plain host-side containers for token ids. No Burn types here;
// the data layer turns a Window into tensors right before the
// forward pass.
//
// TokenMatrix is time-major: row t holds the t-th token of every
// batch column, so
//
//   tokens[t * columns + b]  ==  matrix[t, b]
//
// Each column is an independent contiguous run of the corpus.
// Reading down a column walks the text forward; reading across
// a row jumps between unrelated stretches of the corpus.

use crate::domain::error::{ModelError, ModelResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatrix {
    tokens:    Vec<u32>,
    timesteps: usize,
    columns:   usize,
}

impl TokenMatrix {
    /// Wrap a time-major buffer. Fails if the buffer length is not
    /// exactly `timesteps * columns`.
    pub fn from_time_major(
        tokens:    Vec<u32>,
        timesteps: usize,
        columns:   usize,
    ) -> ModelResult<Self> {
        if columns == 0 {
            return Err(ModelError::config("a token matrix needs at least one column"));
        }
        if tokens.len() != timesteps * columns {
            return Err(ModelError::shape(
                "token matrix",
                format!("{timesteps} x {columns} = {} tokens", timesteps * columns),
                format!("{} tokens", tokens.len()),
            ));
        }
        Ok(Self { tokens, timesteps, columns })
    }

    pub fn timesteps(&self) -> usize { self.timesteps }

    pub fn columns(&self) -> usize { self.columns }

    /// (timesteps, columns)
    pub fn shape(&self) -> (usize, usize) { (self.timesteps, self.columns) }

    #[cfg(test)]
    pub fn get(&self, t: usize, b: usize) -> Option<u32> {
        if t < self.timesteps && b < self.columns {
            Some(self.tokens[t * self.columns + b])
        } else {
            None
        }
    }

    /// Rows `[from, to)` as one contiguous time-major slice.
    pub fn rows(&self, from: usize, to: usize) -> &[u32] {
        &self.tokens[from * self.columns..to * self.columns]
    }

    /// One column read top to bottom.
    #[cfg(test)]
    pub fn column(&self, b: usize) -> Vec<u32> {
        (0..self.timesteps)
            .map(|t| self.tokens[t * self.columns + b])
            .collect()
    }

    /// Number of windows a pass over this matrix produces:
    /// ceil((timesteps - 1) / window_size). The last row only ever
    /// serves as a target, never as input.
    pub fn num_windows(&self, window_size: usize) -> usize {
        if window_size == 0 {
            return 0;
        }
        self.timesteps.saturating_sub(1).div_ceil(window_size)
    }

    /// Window start offsets 0, W, 2W, … strictly below timesteps - 1.
    pub fn window_starts(&self, window_size: usize) -> impl Iterator<Item = usize> {
        let end = self.timesteps.saturating_sub(1);
        (0..end).step_by(window_size.max(1))
    }
}

/// One training/evaluation example sliced out of a TokenMatrix.
///
/// `data` is `seq_len x columns` time-major. `target` covers the same
/// region shifted forward one timestep and is flattened the same way,
/// so `target[t * columns + b] == source[start + 1 + t, b]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub start:   usize,
    pub seq_len: usize,
    pub columns: usize,
    pub data:    Vec<u32>,
    pub target:  Vec<u32>,
}

impl Window {
    #[cfg(test)]
    pub fn data_at(&self, t: usize, b: usize) -> u32 {
        self.data[t * self.columns + b]
    }

    #[cfg(test)]
    pub fn target_at(&self, t: usize, b: usize) -> u32 {
        self.target[t * self.columns + b]
    }

    /// Number of predicted tokens in this window.
    #[cfg(test)]
    pub fn num_targets(&self) -> usize {
        self.target.len()
    }
}
