//! Record batches
//!
//! - Records join a batch in source order
//! - A batch never exceeds its configured size
//! - Taking a batch leaves an empty one with the same capacity behind

/// Records waiting for their commit.
#[derive(Debug)]
pub struct RecordBatch<R> {
    records: Vec<R>,
    max_records: usize,
    first_line: Option<u64>,
    last_line: Option<u64>,
}

impl<R> RecordBatch<R> {
    /// Create an empty batch holding at most `max_records`.
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Vec::with_capacity(max_records),
            max_records,
            first_line: None,
            last_line: None,
        }
    }

    /// Add a record decoded from source line `line`.
    pub fn push(&mut self, record: R, line: u64) {
        debug_assert!(!self.is_full());
        if self.first_line.is_none() {
            self.first_line = Some(line);
        }
        self.last_line = Some(line);
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.max_records
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Source line range covered by this batch
    pub fn line_range(&self) -> Option<(u64, u64)> {
        self.first_line.zip(self.last_line)
    }

    /// Empties the batch for reuse.
    pub fn clear(&mut self) {
        self.records.clear();
        self.first_line = None;
        self.last_line = None;
    }
}
