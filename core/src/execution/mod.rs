pub mod batch;

pub use batch::{BatchError, BatchLimits, BatchOutcome, apply_batch, batch_hash};
