//! databox: a data-service dispatch engine with transactional boxcarring.
//!
//! Named operations registered on a [`DataService`] are dispatched through
//! a [`Dispatcher`], which classifies each inbound operation-set as a
//! single, batch, boxcarring, or request-box request and executes it
//! against a per-request [`RequestContext`]. Batches, boxcar sessions, and
//! request boxes run as one transactional unit: every connection
//! registered in the context's [`ConnectionStore`] during the unit is
//! committed or rolled back and closed exactly once, and batch-scoped
//! resources registered as [`BatchParticipant`]s are released in
//! registration order whatever the outcome.
//!
//! The context object replaces the thread-local request state of classic
//! ESB data-service runtimes: two contexts never share state, so worker
//! threads can be pooled freely with no cross-request leakage.

mod auth;
mod boxcar;
mod cleanup;
mod connections;
mod context;
mod error;
mod params;
mod payload;
mod request;
mod status;
mod txn;

pub mod dispatch;

pub use auth::{AuthError, AuthProvider, StaticAuthProvider};
pub use boxcar::RequestBox;
pub use cleanup::BatchParticipant;
pub use connections::{ConnectionError, ConnectionStore, TransactionalConnection};
pub use context::{CurrentUser, RequestContext};
pub use dispatch::{DataService, DispatchResult, Dispatcher, LazyResult, Operation, PreprocessPass};
pub use error::DataServiceFault;
pub use params::{extract_batch_params, extract_params, ParamValue, Params};
pub use payload::Element;
pub use request::{
    BatchRequest, BoxcarRequest, Request, RequestBoxRequest, SingleRequest, BOXCAR_ABORT,
    BOXCAR_BEGIN, BOXCAR_END, REQUEST_BOX_SUFFIX,
};
pub use status::DispatchStatus;
pub use txn::{LocalTransactionManager, TransactionError, TransactionManager};

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
