// Batch-ordered piece state machine shared by every aggregate

pub mod batch;

pub use batch::{AggregateStatus, PieceCompletion};
