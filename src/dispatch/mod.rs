//! Dispatch: the service registry and the request protocol.
//!
//! `DataService` holds named operations; `Dispatcher` classifies inbound
//! operation-sets against it and drives single, batch, boxcarring, and
//! request-box execution with exactly-once transaction finalization.
//!
//! ```ignore
//! use databox::{DataService, Dispatcher, Element, Operation, RequestContext};
//!
//! let service = DataService::new("orders")
//!     .operation("insert", Operation::new(|ctx, params| {
//!         // register connections on ctx.connections_mut(), run the query
//!         Ok(None)
//!     }).in_only());
//!
//! let dispatcher = Dispatcher::new(service);
//! let mut ctx = RequestContext::new();
//! let payload = Element::new("insert").child(Element::new("id").with_text("7"));
//! dispatcher.dispatch(&mut ctx, "insert", Some(&payload))?;
//! ```

mod engine;
mod service;

pub use engine::{DispatchResult, Dispatcher, LazyResult};
pub use service::{DataService, Operation, PreprocessPass};
