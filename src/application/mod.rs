// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (training, or inspecting a corpus).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1 and the reporters)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Corpus / batching statistics
pub mod inspect_use_case;
