//! Request-box integration tests: ordering, single-unit finalize,
//! last-result semantics, malformed payloads.

use databox::{DataService, DataServiceFault, Dispatcher, Element, Operation, RequestContext};

use crate::support::*;

/// Three in-out operations that record execution and return their own
/// name + id; `b` faults on id `boom`.
fn box_service(log: &Log) -> DataService {
    let mut service = DataService::new("orders");
    for name in ["a", "b", "c"] {
        let op_log = log.clone();
        service = service.operation(
            name,
            Operation::new(move |ctx, params| {
                let id = params
                    .get("id")
                    .and_then(|v| v.as_scalar())
                    .unwrap_or_default();
                ensure_connection(ctx, &op_log, "db");
                record(&op_log, format!("exec {} {}", name, id));
                if name == "b" && id == "boom" {
                    return Err(DataServiceFault::execution("b", "bad row"));
                }
                Ok(Some(Element::new("row").with_text(format!("{}{}", name, id))))
            }),
        );
    }
    service
}

fn mixed_box() -> Element {
    Element::new("box")
        .child(batch_payload("a", &["0", "1"]))
        .child(single_payload("b", "0"))
        .child(batch_payload("c", &["0", "1", "2"]))
}

#[test]
fn sub_requests_execute_in_submission_order() {
    let log = new_log();
    let dispatcher = Dispatcher::new(box_service(&log));
    let mut ctx = RequestContext::new();

    let element = dispatcher
        .dispatch(&mut ctx, "orders_request_box", Some(&mixed_box()))
        .unwrap()
        .materialize(&mut ctx)
        .unwrap()
        .unwrap();
    assert_eq!(element.text(), "c2", "only the last sub-result is returned");

    let log = entries(&log);
    let execs: Vec<&str> = log
        .iter()
        .filter(|e| e.starts_with("exec"))
        .map(|s| s.as_str())
        .collect();
    assert_eq!(
        execs,
        vec!["exec a 0", "exec a 1", "exec b 0", "exec c 0", "exec c 1", "exec c 2"]
    );
    assert_context_clean(&ctx);
}

#[test]
fn the_whole_box_finalizes_as_one_unit() {
    let log = new_log();
    let dispatcher = Dispatcher::new(box_service(&log));
    let mut ctx = RequestContext::new();

    dispatcher
        .dispatch(&mut ctx, "orders_request_box", Some(&mixed_box()))
        .unwrap();

    let log = entries(&log);
    assert_eq!(log.iter().filter(|e| *e == "conn db commit").count(), 1);
    assert_eq!(log.iter().filter(|e| *e == "conn db close").count(), 1);
    let last_exec = log.iter().rposition(|e| e.starts_with("exec")).unwrap();
    let commit = log.iter().position(|e| e == "conn db commit").unwrap();
    assert!(commit > last_exec, "commit happens after every sub-request");
}

#[test]
fn failure_mid_box_rolls_back_and_rethrows() {
    let log = new_log();
    let dispatcher = Dispatcher::new(box_service(&log));
    let mut ctx = RequestContext::new();

    let payload = Element::new("box")
        .child(batch_payload("a", &["0", "1"]))
        .child(single_payload("b", "boom"))
        .child(batch_payload("c", &["0"]));
    let result = dispatcher.dispatch(&mut ctx, "orders_request_box", Some(&payload));
    assert!(matches!(result, Err(DataServiceFault::Execution { .. })));

    let log = entries(&log);
    assert!(log.iter().all(|e| !e.starts_with("exec c")), "c never runs");
    assert_eq!(log.iter().filter(|e| *e == "conn db rollback").count(), 1);
    let rollback = log.iter().position(|e| e == "conn db rollback").unwrap();
    let close = log.iter().position(|e| e == "conn db close").unwrap();
    assert!(rollback < close);
    assert_context_clean(&ctx);
}

#[test]
fn empty_final_sub_result_yields_an_empty_box_result() {
    let log = new_log();
    let fetch_log = log.clone();
    let note_log = log.clone();
    let service = DataService::new("orders")
        .operation(
            "fetch",
            Operation::new(move |_ctx, _params| {
                record(&fetch_log, "exec fetch");
                Ok(Some(Element::new("row").with_text("B")))
            }),
        )
        .operation(
            "note",
            Operation::new(move |_ctx, _params| {
                record(&note_log, "exec note");
                Ok(None)
            })
            .in_only(),
        );
    let dispatcher = Dispatcher::new(service);
    let mut ctx = RequestContext::new();

    let payload = Element::new("box")
        .child(single_payload("fetch", "1"))
        .child(single_payload("note", "1"));
    let result = dispatcher
        .dispatch(&mut ctx, "orders_request_box", Some(&payload))
        .unwrap();
    assert!(
        result.is_none(),
        "a final sub-request with no result means the box returns nothing"
    );
    assert_eq!(entries(&log), vec!["exec fetch", "exec note"]);
    assert_context_clean(&ctx);
}

#[test]
fn request_box_without_payload_faults_immediately() {
    let log = new_log();
    let dispatcher = Dispatcher::new(box_service(&log));
    let mut ctx = RequestContext::new();

    let result = dispatcher.dispatch(&mut ctx, "orders_request_box", None);
    match result {
        Err(DataServiceFault::MalformedRequestBox { operation, service }) => {
            assert_eq!(operation, "orders_request_box");
            assert_eq!(service, "orders");
        }
        other => panic!("expected malformed-request-box fault, got {:?}", other),
    }
    assert!(entries(&log).is_empty(), "no side effects before the fault");
    assert_context_clean(&ctx);
}
