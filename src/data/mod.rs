// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw text files to device-ready windows.
//
//   train.txt / valid.txt / test.txt
//       │
//       ▼
//   Corpus            → word-level ids + shared dictionary
//       │
//       ▼
//   batchify          → TokenMatrix (timesteps × batch_columns)
//       │
//       ▼
//   get_window        → Window (data + one-step-ahead target)
//       │
//       ▼
//   WindowBatcher     → Burn Int tensors on the training device
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads the three corpus splits and assigns token ids
pub mod corpus;

/// batchify / get_window and the tensor batcher
pub mod batcher;
