//! Dispatch status for the current logical unit of work.
//!
//! Tracks whether a batch or a boxcar session is executing, and the total
//! count and zero-based index within the active batch. The index is updated
//! before each batch sub-request runs, so mid-batch logic can rely on
//! "am I first/last" being accurate during execution.

/// Batch/boxcar flags and batch position for one request context.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchStatus {
    in_batch: bool,
    in_boxcar: bool,
    batch_count: usize,
    batch_index: usize,
}

impl DispatchStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag that a batch is executing. Sticky for the remainder of the
    /// logical unit, until a clear.
    pub fn mark_batch(&mut self) {
        self.in_batch = true;
    }

    /// Set or clear the boxcar-session flag.
    pub fn set_boxcarring(&mut self, boxcarring: bool) {
        self.in_boxcar = boxcarring;
    }

    pub fn in_batch(&self) -> bool {
        self.in_batch
    }

    pub fn in_boxcar(&self) -> bool {
        self.in_boxcar
    }

    pub fn set_batch_count(&mut self, count: usize) {
        self.batch_count = count;
    }

    pub fn set_batch_index(&mut self, index: usize) {
        self.batch_index = index;
    }

    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    pub fn batch_index(&self) -> usize {
        self.batch_index
    }

    pub fn is_first_batch_request(&self) -> bool {
        self.batch_index == 0
    }

    pub fn is_last_batch_request(&self) -> bool {
        self.batch_index + 1 >= self.batch_count
    }

    /// Reset all four fields to defaults.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Reset only the batch fields, leaving the boxcar flag untouched.
    /// Boxcar end-of-session cleanup happens at a different layer.
    pub fn clear_batch(&mut self) {
        self.in_batch = false;
        self.batch_count = 0;
        self.batch_index = 0;
    }
}
