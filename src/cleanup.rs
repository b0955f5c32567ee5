//! Batch resource cleanup hooks.
//!
//! Deep components that acquire a releasable resource mid-query (e.g. an
//! open result cursor) register a participant on the request context. The
//! dispatch engine drains the list in registration order exactly once per
//! completed batch, success or failure, so the batch-processing code never
//! needs to know about those resources statically.

/// A side-resource that must be released once a batch finishes.
pub trait BatchParticipant: Send {
    fn release_batch_resources(&mut self);
}

impl<F> BatchParticipant for F
where
    F: FnMut() + Send,
{
    fn release_batch_resources(&mut self) {
        self()
    }
}
