//! The request box: pending operations for an open boxcar session.
//!
//! An ordered queue of requests accumulated between boxcar begin and
//! end/abort. Execution order is strictly FIFO; the box is cleared after
//! execution or abort.

use crate::request::Request;

/// Ordered queue of requests staged during a boxcar session.
#[derive(Default)]
pub struct RequestBox {
    requests: Vec<Request>,
}

impl RequestBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request to the end of the box.
    pub fn add(&mut self, request: Request) {
        self.requests.push(request);
    }

    /// Take every staged request, leaving the box empty.
    pub fn take(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
