//! Chunk model and validating builder.

mod builder;
mod model;

pub use builder::ChunkBuilder;
pub use model::{Chunk, ValidationError, compute_chunk_id, current_timestamp_rfc3339};
