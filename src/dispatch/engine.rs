//! The dispatch protocol.
//!
//! `Dispatcher` ties a `DataService` to its collaborators (authorization
//! provider, transaction manager) and drives the per-request state
//! machine: classify the inbound operation-set, resolve the acting
//! identity, process the variant, and finalize the enclosing transaction
//! exactly once per logical unit of work.
//!
//! Transaction finalization is a single shared routine parameterized by
//! whether an error occurred and whether this engine initiated the
//! distributed transaction. It is skipped for any batch or request box
//! nested inside an open boxcar session or box; the outer unit alone
//! finalizes, which is what prevents double-commit/double-rollback.

use tracing::{debug, warn};

use crate::auth::AuthProvider;
use crate::context::{CurrentUser, RequestContext};
use crate::error::DataServiceFault;
use crate::params::Params;
use crate::payload::Element;
use crate::request::{BatchRequest, BoxcarRequest, Request, RequestBoxRequest, SingleRequest};
use crate::txn::{LocalTransactionManager, TransactionManager};

use super::service::{DataService, PreprocessPass};

type Producer<'a> =
    Box<dyn FnOnce(&mut RequestContext) -> Result<Option<Element>, DataServiceFault> + 'a>;

/// A one-shot, still-streaming result. Materializing runs the operation's
/// two preprocessing passes, the handler, and any transform/trigger.
pub struct LazyResult<'a> {
    producer: Producer<'a>,
}

impl<'a> LazyResult<'a> {
    pub fn materialize(
        self,
        ctx: &mut RequestContext,
    ) -> Result<Option<Element>, DataServiceFault> {
        (self.producer)(ctx)
    }
}

impl std::fmt::Debug for LazyResult<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LazyResult")
    }
}

/// Outcome of a dispatch: nothing (in-only), a materialized element, or a
/// lazy producer for a streaming-enabled single operation.
#[derive(Debug)]
pub enum DispatchResult<'a> {
    None,
    Ready(Element),
    Lazy(LazyResult<'a>),
}

impl<'a> DispatchResult<'a> {
    fn from_option(result: Option<Element>) -> Self {
        match result {
            Some(element) => DispatchResult::Ready(element),
            None => DispatchResult::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DispatchResult::None)
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, DispatchResult::Lazy(_))
    }

    /// Resolve to a concrete result, evaluating a lazy producer.
    pub fn materialize(
        self,
        ctx: &mut RequestContext,
    ) -> Result<Option<Element>, DataServiceFault> {
        match self {
            DispatchResult::None => Ok(None),
            DispatchResult::Ready(element) => Ok(Some(element)),
            DispatchResult::Lazy(lazy) => lazy.materialize(ctx),
        }
    }
}

/// Dispatches classified requests against a data service.
pub struct Dispatcher<A = (), T = LocalTransactionManager> {
    service: DataService,
    auth: A,
    txn: T,
}

impl Dispatcher<(), LocalTransactionManager> {
    /// A dispatcher with anonymous auth and a local transaction manager.
    pub fn new(service: DataService) -> Self {
        Self {
            service,
            auth: (),
            txn: LocalTransactionManager::new(),
        }
    }
}

impl<A: AuthProvider, T: TransactionManager> Dispatcher<A, T> {
    pub fn with_collaborators(service: DataService, auth: A, txn: T) -> Self {
        Self { service, auth, txn }
    }

    pub fn service(&self) -> &DataService {
        &self.service
    }

    pub fn transaction_manager(&self) -> &T {
        &self.txn
    }

    /// Dispatch one inbound operation-set.
    ///
    /// Classifies, resolves identity, processes the variant, and restores
    /// the context: the current user is cleared, and unless a boxcar
    /// session remains open, the dispatch status is reset. A streaming
    /// single result comes back lazy unless the operation disables
    /// streaming, in which case it is materialized here.
    pub fn dispatch(
        &self,
        ctx: &mut RequestContext,
        operation: &str,
        payload: Option<&Element>,
    ) -> Result<DispatchResult<'_>, DataServiceFault> {
        let request = Request::classify(
            &self.service,
            operation,
            payload,
            ctx.status().in_boxcar(),
        )?;
        debug!(service = self.service.name(), operation, "dispatching");

        self.populate_identity(ctx)?;
        let outcome = self.process(ctx, request);

        ctx.clear_current_user();
        if !ctx.status().in_boxcar() {
            ctx.status_mut().clear();
            ctx.release_participants();
        }
        outcome
    }

    fn populate_identity(&self, ctx: &mut RequestContext) -> Result<(), DataServiceFault> {
        let username = self.auth.username().map_err(|e| DataServiceFault::Auth {
            service: self.service.name().to_string(),
            message: e.to_string(),
        })?;
        let roles = self.auth.user_roles().map_err(|e| DataServiceFault::Auth {
            service: self.service.name().to_string(),
            message: e.to_string(),
        })?;
        ctx.set_current_user(CurrentUser { username, roles });
        Ok(())
    }

    fn process(
        &self,
        ctx: &mut RequestContext,
        request: Request,
    ) -> Result<DispatchResult<'_>, DataServiceFault> {
        match request {
            Request::Single(single) => self.process_single(ctx, single),
            Request::Batch(batch) => {
                let suppress = ctx.status().in_boxcar();
                self.process_batch(ctx, &batch, suppress)
                    .map(DispatchResult::from_option)
            }
            Request::RequestBox(boxed) => {
                let suppress = ctx.status().in_boxcar();
                self.process_request_box(ctx, boxed, suppress)
                    .map(DispatchResult::from_option)
            }
            Request::Boxcarring(control) => self.process_boxcar(ctx, control),
        }
    }

    /// Execute one single request. In-out operations come back lazy;
    /// streaming-disabled ones are materialized before returning.
    fn process_single(
        &self,
        ctx: &mut RequestContext,
        request: SingleRequest,
    ) -> Result<DispatchResult<'_>, DataServiceFault> {
        let op = self.operation(&request.operation)?;
        if op.in_only {
            self.execute_operation(ctx, &request.operation, &request.params)?;
            return Ok(DispatchResult::None);
        }

        let streaming = op.streaming;
        let lazy = LazyResult {
            producer: Box::new(move |ctx| {
                self.execute_operation(ctx, &request.operation, &request.params)
            }),
        };
        if streaming {
            Ok(DispatchResult::Lazy(lazy))
        } else {
            // Streaming explicitly disabled: the result must never leave
            // dispatch as a lazily-evaluated producer.
            lazy.materialize(ctx).map(DispatchResult::from_option)
        }
    }

    /// Run one operation invocation: preprocessing passes (for in-out
    /// operations), the handler, the optional transform, the optional
    /// post-result event trigger.
    fn execute_operation(
        &self,
        ctx: &mut RequestContext,
        operation: &str,
        params: &Params,
    ) -> Result<Option<Element>, DataServiceFault> {
        let op = self.operation(operation)?;
        if op.in_only {
            (op.handler)(ctx, params)?;
            return Ok(None);
        }

        if let Some(preprocess) = &op.preprocess {
            preprocess(ctx, params, PreprocessPass::First)?;
            preprocess(ctx, params, PreprocessPass::Second)?;
        }

        let mut result = (op.handler)(ctx, params)?;
        if let Some(transform) = &op.transform {
            if let Some(element) = result.take() {
                result = Some(transform(element)?);
            }
        }

        if let Some(element) = &result {
            if let Some(trigger) = &op.event_trigger {
                trigger(element);
            }
        }
        Ok(result)
    }

    /// Execute a batch: index updated before each sub-request, last
    /// non-empty result kept, finalize-once plus participant drain plus
    /// batch-status clear in all outcomes.
    fn process_batch(
        &self,
        ctx: &mut RequestContext,
        request: &BatchRequest,
        suppress_finalize: bool,
    ) -> Result<Option<Element>, DataServiceFault> {
        ctx.status_mut().mark_batch();
        ctx.status_mut().set_batch_count(request.param_sets.len());

        let mut last: Option<Element> = None;
        let mut failure: Option<DataServiceFault> = None;
        for (index, params) in request.param_sets.iter().enumerate() {
            ctx.status_mut().set_batch_index(index);
            match self.execute_operation(ctx, &request.operation, params) {
                Ok(Some(element)) => last = Some(element),
                Ok(None) => {}
                Err(fault) => {
                    failure = Some(fault);
                    break;
                }
            }
        }

        if !suppress_finalize {
            self.finalize_transaction(ctx, failure.is_some());
        }
        ctx.release_participants();
        ctx.status_mut().clear_batch();

        match failure {
            Some(fault) => Err(fault),
            None => Ok(last),
        }
    }

    /// Execute a request box: sub-requests in submission order as one
    /// unit. The box's result is the final sub-request's result, empty
    /// when that sub-request produced nothing.
    fn process_request_box(
        &self,
        ctx: &mut RequestContext,
        request: RequestBoxRequest,
        suppress_finalize: bool,
    ) -> Result<Option<Element>, DataServiceFault> {
        let mut last: Option<Element> = None;
        let mut failure: Option<DataServiceFault> = None;
        for sub in request.requests {
            match self.process_nested(ctx, sub) {
                Ok(result) => last = result,
                Err(fault) => {
                    failure = Some(fault);
                    break;
                }
            }
        }

        if !suppress_finalize {
            self.finalize_transaction(ctx, failure.is_some());
        }

        match failure {
            Some(fault) => Err(fault),
            None => Ok(last),
        }
    }

    /// Execute a request nested inside a boxcar end or a request box.
    /// Transaction finalization is always the outer unit's job here.
    fn process_nested(
        &self,
        ctx: &mut RequestContext,
        request: Request,
    ) -> Result<Option<Element>, DataServiceFault> {
        match request {
            Request::Single(single) => {
                self.execute_operation(ctx, &single.operation, &single.params)
            }
            Request::Batch(batch) => self.process_batch(ctx, &batch, true),
            Request::RequestBox(boxed) => self.process_request_box(ctx, boxed, true),
            Request::Boxcarring(BoxcarRequest::Add(inner)) => self.process_nested(ctx, *inner),
            Request::Boxcarring(control) => Err(DataServiceFault::execution(
                control_name(&control),
                "boxcar control staged inside a request box",
            )),
        }
    }

    fn process_boxcar(
        &self,
        ctx: &mut RequestContext,
        control: BoxcarRequest,
    ) -> Result<DispatchResult<'_>, DataServiceFault> {
        match control {
            BoxcarRequest::Begin => {
                // Discard any stale box from an earlier session.
                ctx.boxcar_mut().clear();
                ctx.clear_staged_params();
                ctx.status_mut().set_boxcarring(true);
                Ok(DispatchResult::None)
            }
            BoxcarRequest::Add(inner) => {
                let placeholder = self.boxcar_add_placeholder(inner.as_ref())?;
                if let Request::Single(single) = inner.as_ref() {
                    ctx.stage_params(&single.params);
                }
                ctx.boxcar_mut().add(*inner);
                Ok(placeholder)
            }
            BoxcarRequest::End => self.process_boxcar_end(ctx),
            BoxcarRequest::Abort => {
                ctx.boxcar_mut().clear();
                ctx.status_mut().set_boxcarring(false);
                ctx.clear_staged_params();
                self.finalize_transaction(ctx, true);
                Ok(DispatchResult::None)
            }
        }
    }

    /// Placeholder response for an add: in/out operation callers still get
    /// a structurally valid (empty) result element even though the real
    /// result only appears at boxcar end.
    fn boxcar_add_placeholder(
        &self,
        request: &Request,
    ) -> Result<DispatchResult<'_>, DataServiceFault> {
        let in_only = match request {
            Request::Single(single) => self.operation(&single.operation)?.in_only,
            _ => false,
        };
        if in_only {
            Ok(DispatchResult::None)
        } else {
            Ok(DispatchResult::Ready(Element::new("result")))
        }
    }

    fn process_boxcar_end(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<DispatchResult<'_>, DataServiceFault> {
        if !self.txn.is_dtx_initiated_by_us() {
            if let Err(e) = self.txn.begin() {
                ctx.boxcar_mut().clear();
                ctx.status_mut().set_boxcarring(false);
                ctx.clear_staged_params();
                return Err(e.into());
            }
        }

        let requests = ctx.boxcar_mut().take();
        let mut last: Option<Element> = None;
        let mut failure: Option<DataServiceFault> = None;
        for request in requests {
            match self.process_nested(ctx, request) {
                Ok(Some(element)) => last = Some(element),
                Ok(None) => {}
                Err(fault) => {
                    failure = Some(fault);
                    break;
                }
            }
        }

        self.finalize_transaction(ctx, failure.is_some());
        ctx.boxcar_mut().clear();
        ctx.status_mut().set_boxcarring(false);
        ctx.clear_staged_params();

        match failure {
            Some(fault) => Err(fault),
            None => Ok(DispatchResult::from_option(last)),
        }
    }

    /// The one shared finalize for batch, boxcar end/abort, and request
    /// box. Rolls back or commits the XA-aware connection subset, closes
    /// everything, and settles the distributed transaction only if this
    /// engine initiated it. Failures here are logged, not thrown; this
    /// runs from finally-position code.
    fn finalize_transaction(&self, ctx: &mut RequestContext, error_occurred: bool) {
        let dtx = self.txn.is_dtx_initiated_by_us();
        let connections = ctx.connections_mut();
        match (error_occurred, dtx) {
            (true, true) => connections.rollback_non_xa(),
            (true, false) => connections.rollback_all(),
            (false, true) => connections.commit_non_xa(),
            (false, false) => connections.commit_all(),
        }
        connections.close_all();

        if dtx {
            let settled = if error_occurred {
                self.txn.rollback()
            } else {
                self.txn.commit()
            };
            if let Err(e) = settled {
                warn!(error = %e, "distributed transaction finalize failed");
            }
        }
    }

    fn operation(&self, name: &str) -> Result<&super::service::Operation, DataServiceFault> {
        self.service
            .get(name)
            .ok_or_else(|| DataServiceFault::OperationNotFound {
                operation: name.to_string(),
                service: self.service.name().to_string(),
            })
    }
}

fn control_name(control: &BoxcarRequest) -> &'static str {
    match control {
        BoxcarRequest::Begin => crate::request::BOXCAR_BEGIN,
        BoxcarRequest::End => crate::request::BOXCAR_END,
        BoxcarRequest::Abort => crate::request::BOXCAR_ABORT,
        BoxcarRequest::Add(_) => "add",
    }
}
