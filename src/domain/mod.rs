// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe a training run: token grids,
// windows, progress events, and the error kinds the core raises.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Configuration / shape / token-range / numeric error kinds
pub mod error;

// Time-major token grid and the windows sliced from it
pub mod token_matrix;

// Window, epoch, and test progress events
pub mod report;

// ProgressReporter and its combinators
pub mod traits;
