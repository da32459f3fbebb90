//! Partitioning of a chunk list into sequenced envelopes.

use super::types::{BatchEnvelope, DeliveryError, EnvelopeIds};
use crate::chunk::Chunk;

/// Number of envelopes needed for `chunk_count` chunks: `ceil(N / B)`.
pub fn batch_count(chunk_count: usize, batch_size: usize) -> Result<usize, DeliveryError> {
    if batch_size == 0 {
        return Err(DeliveryError::InvalidBatchSize);
    }
    Ok(chunk_count.div_ceil(batch_size))
}

/// Split `chunks` into contiguous, ordered envelopes of at most `batch_size` chunks.
///
/// An empty list yields no envelopes. Only the final envelope has `last_batch` set.
pub fn plan_batches<'a>(
    ids: EnvelopeIds<'a>,
    chunks: &'a [Chunk],
    batch_size: usize,
) -> Result<Vec<BatchEnvelope<'a>>, DeliveryError> {
    let total_batches = batch_count(chunks.len(), batch_size)?;
    Ok(chunks
        .chunks(batch_size)
        .enumerate()
        .map(|(batch_index, chunk_data)| BatchEnvelope {
            strategies_batch_id: ids.strategies_batch_id,
            doc_id: ids.doc_id,
            trace_id: ids.trace_id,
            batch_index,
            total_batches,
            last_batch: batch_index + 1 == total_batches,
            chunk_data,
        })
        .collect())
}
