// ============================================================
// Layer 3 — Domain Errors
// ============================================================
// The four failure kinds the training core can raise.
//
//   Configuration      — a knob that can never produce a valid run
//                        (zero columns, zero window, odd embedding_dim…)
//   Shape              — a matrix or window whose dimensions disagree
//                        with what the caller declared
//   TokenRange         — a token id outside [0, vocab_size) reached
//                        the embedding lookup
//   NumericInstability — loss or gradient norm became NaN / ±inf
//
// All four are fatal: nothing in the crate retries or coerces.
// The application layer wraps them in anyhow::Error, so callers
// that need the kind back can `downcast_ref::<ModelError>()`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    Shape {
        context:  &'static str,
        expected: String,
        actual:   String,
    },

    #[error("token id {token} is outside the vocabulary [0, {vocab_size})")]
    TokenRange { token: i64, vocab_size: usize },

    #[error("numeric instability: {0}")]
    NumericInstability(String),
}

impl ModelError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn shape(
        context:  &'static str,
        expected: impl ToString,
        actual:   impl ToString,
    ) -> Self {
        Self::Shape {
            context,
            expected: expected.to_string(),
            actual:   actual.to_string(),
        }
    }
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;
