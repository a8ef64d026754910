/// Number of notes sent to the model in one request.
pub const DEFAULT_CHUNK_SIZE: usize = 300;

/// Split `notes` into contiguous, ordered slices of at most `size` notes.
///
/// Only the final chunk may be shorter. A `size` of zero is treated as one.
pub fn chunk<T>(notes: &mut [T], size: usize) -> std::slice::ChunksMut<'_, T> {
    notes.chunks_mut(size.max(1))
}

pub fn chunk_count(len: usize, size: usize) -> usize {
    len.div_ceil(size.max(1))
}
