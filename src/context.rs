//! The per-request context object.
//!
//! The original design kept dispatch status, the connection store, the
//! request box, the participant list, and the acting identity in
//! thread-local storage. Here they live on an explicit `RequestContext`
//! passed `&mut` through the dispatch call chain, which preserves the
//! no-cross-request-leakage guarantee while keeping data flow explicit
//! and testable without thread manipulation.
//!
//! One context covers one logical unit of work. Across a boxcar session
//! (begin through end/abort) the caller keeps the same context alive; the
//! boxcar flag and the accumulated box survive between dispatches while
//! everything else is cleared per dispatch.

use crate::boxcar::RequestBox;
use crate::cleanup::BatchParticipant;
use crate::connections::ConnectionStore;
use crate::params::{ParamValue, Params};
use crate::status::DispatchStatus;

/// The authenticated principal for the current dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser {
    pub username: Option<String>,
    pub roles: Vec<String>,
}

/// Request-scoped state for one logical unit of work.
#[derive(Default)]
pub struct RequestContext {
    status: DispatchStatus,
    connections: ConnectionStore,
    boxcar: RequestBox,
    participants: Vec<Box<dyn BatchParticipant>>,
    current_user: Option<CurrentUser>,
    staged_params: Params,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &DispatchStatus {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut DispatchStatus {
        &mut self.status
    }

    pub fn connections(&self) -> &ConnectionStore {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut ConnectionStore {
        &mut self.connections
    }

    pub fn boxcar(&self) -> &RequestBox {
        &self.boxcar
    }

    pub fn boxcar_mut(&mut self) -> &mut RequestBox {
        &mut self.boxcar
    }

    /// Register a participant for release once the current batch finishes.
    pub fn add_participant<P: BatchParticipant + 'static>(&mut self, participant: P) {
        self.participants.push(Box::new(participant));
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Release every registered participant in registration order, then
    /// clear the list. Runs once per completed batch, success or failure.
    pub fn release_participants(&mut self) {
        for mut participant in self.participants.drain(..) {
            participant.release_batch_resources();
        }
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }

    pub fn set_current_user(&mut self, user: CurrentUser) {
        self.current_user = Some(user);
    }

    pub fn clear_current_user(&mut self) {
        self.current_user = None;
    }

    /// Stage the scalar parameters of a boxcar add so later requests in
    /// the session can read prior inputs.
    pub fn stage_params(&mut self, params: &Params) {
        for (name, value) in params {
            match value {
                ParamValue::Scalar(_) | ParamValue::Null => {
                    self.staged_params.insert(name.clone(), value.clone());
                }
                ParamValue::Array(_) => {}
            }
        }
    }

    pub fn staged_params(&self) -> &Params {
        &self.staged_params
    }

    pub fn clear_staged_params(&mut self) {
        self.staged_params.clear();
    }

    /// Reset the whole context to its initial state. Any connections left
    /// in the store are expected to have been finalized already.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
