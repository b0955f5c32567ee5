//! Single-request integration tests: streaming, identity, parameter
//! shapes, faults.

use databox::{
    DataService, Dispatcher, Element, LocalTransactionManager, Operation, ParamValue,
    RequestContext, StaticAuthProvider,
};

use crate::support::*;

#[test]
fn streaming_result_is_lazy_until_materialized() {
    let log = new_log();
    let exec_log = log.clone();
    let service = DataService::new("orders").operation(
        "fetch",
        Operation::new(move |_ctx, _params| {
            record(&exec_log, "exec fetch");
            Ok(Some(Element::new("row").with_text("7")))
        }),
    );
    let dispatcher = Dispatcher::new(service);
    let mut ctx = RequestContext::new();

    let result = dispatcher.dispatch(&mut ctx, "fetch", None).unwrap();
    assert!(result.is_lazy());
    assert!(entries(&log).is_empty(), "handler must not run until materialize");

    let element = result.materialize(&mut ctx).unwrap().unwrap();
    assert_eq!(element.text(), "7");
    assert_eq!(entries(&log), vec!["exec fetch"]);
    assert_context_clean(&ctx);
}

#[test]
fn identity_flows_through_the_context() {
    let log = new_log();
    let who_log = log.clone();
    let service = DataService::new("orders").operation(
        "whoami",
        Operation::new(move |ctx, _params| {
            let user = ctx.current_user().cloned().unwrap_or_default();
            record(
                &who_log,
                format!(
                    "user={} roles={}",
                    user.username.unwrap_or_default(),
                    user.roles.join(",")
                ),
            );
            Ok(None)
        })
        .in_only(),
    );
    let dispatcher = Dispatcher::with_collaborators(
        service,
        StaticAuthProvider::new("admin", vec!["ops".to_string(), "dba".to_string()]),
        LocalTransactionManager::new(),
    );
    let mut ctx = RequestContext::new();

    dispatcher.dispatch(&mut ctx, "whoami", None).unwrap();
    assert_eq!(entries(&log), vec!["user=admin roles=ops,dba"]);
    assert!(ctx.current_user().is_none(), "identity cleared after dispatch");
    assert_context_clean(&ctx);
}

#[test]
fn nil_and_repeated_params_reach_the_handler_typed() {
    let service = DataService::new("orders").operation(
        "describe",
        Operation::new(|_ctx, params| {
            let items = params
                .get("item")
                .and_then(|v| v.as_array())
                .map(|a| a.len())
                .unwrap_or(0);
            let note_null = params.get("note").map(ParamValue::is_null).unwrap_or(false);
            let blank = params
                .get("blank")
                .and_then(|v| v.as_scalar())
                .map(str::is_empty)
                .unwrap_or(false);
            Ok(Some(
                Element::new("shape")
                    .child(Element::new("items").with_text(items.to_string()))
                    .child(Element::new("note_null").with_text(note_null.to_string()))
                    .child(Element::new("blank").with_text(blank.to_string())),
            ))
        }),
    );
    let dispatcher = Dispatcher::new(service);
    let mut ctx = RequestContext::new();

    let payload = Element::new("describe")
        .child(Element::new("item").with_text("x"))
        .child(Element::new("item").with_text("y"))
        .child(Element::new("note").with_nil())
        .child(Element::new("blank"));
    let element = dispatcher
        .dispatch(&mut ctx, "describe", Some(&payload))
        .unwrap()
        .materialize(&mut ctx)
        .unwrap()
        .unwrap();

    assert_eq!(element.child_by_name("items").unwrap().text(), "2");
    assert_eq!(element.child_by_name("note_null").unwrap().text(), "true");
    assert_eq!(element.child_by_name("blank").unwrap().text(), "true");
}

#[test]
fn unknown_operation_names_the_operation_and_service() {
    let service = DataService::new("orders");
    let dispatcher = Dispatcher::new(service);
    let mut ctx = RequestContext::new();

    let fault = dispatcher.dispatch(&mut ctx, "missing", None).unwrap_err();
    let text = fault.to_string();
    assert!(text.contains("missing"));
    assert!(text.contains("orders"));
    assert_eq!(fault.status_code(), 404);
    assert_context_clean(&ctx);
}
