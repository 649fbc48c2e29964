//! Re-chunking reader over an in-memory table.
//!
//! A "table" here is simply an ordered list of record batches sharing a
//! schema. The reader yields zero-copy slices of at most `batch_size` rows,
//! in order, never merging across the underlying batch boundaries — the
//! natural way to feed a push-based operator with caller-sized chunks.

use arrow::array::RecordBatch;

/// Pull-based reader that slices a table into batches.
///
/// The default batch size is unbounded, which yields each underlying batch
/// as-is; [`TableBatchReader::set_batch_size`] caps the emitted chunk
/// length.
pub struct TableBatchReader {
    batches: Vec<RecordBatch>,
    batch_size: usize,
    batch_idx: usize,
    offset: usize,
}

impl TableBatchReader {
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self {
            batches,
            batch_size: usize::MAX,
            batch_idx: 0,
            offset: 0,
        }
    }

    /// Caps the number of rows per emitted batch.
    pub fn set_batch_size(&mut self, batch_size: usize) {
        debug_assert!(batch_size > 0, "batch size must be positive");
        self.batch_size = batch_size;
    }

    /// Returns the next chunk, or `None` when the table is drained.
    pub fn next_batch(&mut self) -> Option<RecordBatch> {
        while self.batch_idx < self.batches.len() {
            let current = &self.batches[self.batch_idx];
            if self.offset >= current.num_rows() {
                self.batch_idx += 1;
                self.offset = 0;
                continue;
            }
            let remaining = current.num_rows() - self.offset;
            let length = remaining.min(self.batch_size);
            let slice = current.slice(self.offset, length);
            self.offset += length;
            return Some(slice);
        }
        None
    }
}

impl Iterator for TableBatchReader {
    type Item = RecordBatch;

    fn next(&mut self) -> Option<RecordBatch> {
        self.next_batch()
    }
}
