//! `DataService`: the named-operation registry.
//!
//! A service holds its operations in a map keyed by name. Registration is
//! builder-chained:
//!
//! ```ignore
//! use databox::{DataService, Operation, Element};
//!
//! let service = DataService::new("orders")
//!     .operation("insert", Operation::new(|ctx, params| {
//!         // open connections via ctx.connections_mut(), run the query
//!         Ok(None)
//!     }).in_only())
//!     .operation("lookup", Operation::new(|_ctx, params| {
//!         Ok(Some(Element::new("order")))
//!     }));
//! ```

use std::collections::HashMap;

use crate::context::RequestContext;
use crate::error::DataServiceFault;
use crate::params::Params;
use crate::payload::Element;

/// Which of the two preprocessing passes is running.
///
/// A result-producing operation's lazy result runs its preprocessing hook
/// twice over the underlying query before the handler and any transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessPass {
    First,
    Second,
}

type Handler =
    Box<dyn Fn(&mut RequestContext, &Params) -> Result<Option<Element>, DataServiceFault> + Send + Sync>;
type Preprocess = Box<
    dyn Fn(&mut RequestContext, &Params, PreprocessPass) -> Result<(), DataServiceFault>
        + Send
        + Sync,
>;
type Transform = Box<dyn Fn(Element) -> Result<Element, DataServiceFault> + Send + Sync>;
type EventTrigger = Box<dyn Fn(&Element) + Send + Sync>;

/// One registered operation: the handler plus its execution options.
pub struct Operation {
    pub(crate) handler: Handler,
    pub(crate) in_only: bool,
    pub(crate) streaming: bool,
    pub(crate) preprocess: Option<Preprocess>,
    pub(crate) transform: Option<Transform>,
    pub(crate) event_trigger: Option<EventTrigger>,
}

impl Operation {
    /// An in-out operation with default options (streaming enabled).
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut RequestContext, &Params) -> Result<Option<Element>, DataServiceFault>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler: Box::new(handler),
            in_only: false,
            streaming: true,
            preprocess: None,
            transform: None,
            event_trigger: None,
        }
    }

    /// Mark this operation fire-and-forget: it never produces a result.
    pub fn in_only(mut self) -> Self {
        self.in_only = true;
        self
    }

    /// Disable streaming: a lazy result is fully materialized inside
    /// dispatch instead of being returned as a producer.
    pub fn disable_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    /// Register the preprocessing hook, run twice before the handler.
    pub fn preprocess<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestContext, &Params, PreprocessPass) -> Result<(), DataServiceFault>
            + Send
            + Sync
            + 'static,
    {
        self.preprocess = Some(Box::new(hook));
        self
    }

    /// Register a result transform (XSLT-style hook), applied after the
    /// handler produces a result.
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Element) -> Result<Element, DataServiceFault> + Send + Sync + 'static,
    {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Register a post-result event trigger, fired after transform.
    pub fn event_trigger<F>(mut self, trigger: F) -> Self
    where
        F: Fn(&Element) + Send + Sync + 'static,
    {
        self.event_trigger = Some(Box::new(trigger));
        self
    }

    /// Fire events on a shared `EventEmitter` whenever this operation
    /// produces a result. The result is emitted as its JSON rendering,
    /// string-encoded the way the emitter expects payloads.
    #[cfg(feature = "emitter")]
    pub fn emit_on_result(
        self,
        emitter: std::sync::Arc<std::sync::Mutex<event_emitter_rs::EventEmitter>>,
        event: impl Into<String>,
    ) -> Self {
        let event = event.into();
        self.event_trigger(move |result| {
            if let Ok(mut emitter) = emitter.lock() {
                emitter.emit(&event, result.to_json().to_string());
            }
        })
    }

    pub fn is_in_only(&self) -> bool {
        self.in_only
    }

    pub fn streaming_enabled(&self) -> bool {
        self.streaming
    }
}

/// A data service: a name plus its registered operations.
pub struct DataService {
    name: String,
    operations: HashMap<String, Operation>,
}

impl DataService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: HashMap::new(),
        }
    }

    /// Register an operation. Builder pattern, returns `self` for chaining.
    pub fn operation(mut self, name: &str, operation: Operation) -> Self {
        self.operations.insert(name.to_string(), operation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// List registered operation names.
    pub fn operation_names(&self) -> Vec<&str> {
        self.operations.keys().map(|s| s.as_str()).collect()
    }
}
