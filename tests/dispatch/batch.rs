//! Batch request integration tests: index sequencing, finalize-once,
//! participant drain, last-result semantics.

use databox::{
    DataService, DataServiceFault, Dispatcher, Element, Operation, RequestContext,
};

use crate::support::*;

/// An in-only `insert` that registers a connection, records its batch
/// position, registers a cleanup participant, and faults on id `boom`.
fn orders_service(log: &Log) -> DataService {
    let insert_log = log.clone();
    DataService::new("orders").operation(
        "insert",
        Operation::new(move |ctx, params| {
            let id = params
                .get("id")
                .and_then(|v| v.as_scalar())
                .unwrap_or_default()
                .to_string();
            ensure_connection(ctx, &insert_log, "db");
            record(
                &insert_log,
                format!(
                    "exec insert {} index={} first={} last={}",
                    id,
                    ctx.status().batch_index(),
                    ctx.status().is_first_batch_request(),
                    ctx.status().is_last_batch_request()
                ),
            );
            let release_log = insert_log.clone();
            let release_id = id.clone();
            ctx.add_participant(move || {
                record(&release_log, format!("release cursor {}", release_id));
            });
            if id == "boom" {
                return Err(DataServiceFault::execution("insert", "bad row"));
            }
            Ok(None)
        })
        .in_only(),
    )
}

#[test]
fn batch_index_sequence_is_visible_during_execution() {
    let log = new_log();
    let dispatcher = Dispatcher::new(orders_service(&log));
    let mut ctx = RequestContext::new();

    let payload = batch_payload("insert", &["1", "2", "3"]);
    let result = dispatcher.dispatch(&mut ctx, "insert", Some(&payload)).unwrap();
    assert!(result.is_none());

    let log = entries(&log);
    assert_eq!(log[0], "exec insert 1 index=0 first=true last=false");
    assert_eq!(log[1], "exec insert 2 index=1 first=false last=false");
    assert_eq!(log[2], "exec insert 3 index=2 first=false last=true");
    assert_context_clean(&ctx);
}

#[test]
fn batch_commits_then_closes_then_releases_participants() {
    let log = new_log();
    let dispatcher = Dispatcher::new(orders_service(&log));
    let mut ctx = RequestContext::new();

    let payload = batch_payload("insert", &["1", "2"]);
    dispatcher.dispatch(&mut ctx, "insert", Some(&payload)).unwrap();

    let log = entries(&log);
    let tail: Vec<&str> = log.iter().skip(2).map(|s| s.as_str()).collect();
    assert_eq!(
        tail,
        vec![
            "conn db commit",
            "conn db close",
            "release cursor 1",
            "release cursor 2",
        ]
    );
    assert_context_clean(&ctx);
}

#[test]
fn mid_batch_failure_rolls_back_closes_and_rethrows() {
    let log = new_log();
    let dispatcher = Dispatcher::new(orders_service(&log));
    let mut ctx = RequestContext::new();

    let payload = batch_payload("insert", &["1", "boom", "3"]);
    let result = dispatcher.dispatch(&mut ctx, "insert", Some(&payload));
    assert!(matches!(result, Err(DataServiceFault::Execution { .. })));

    let log = entries(&log);
    // The third sub-request never ran.
    assert!(log.iter().all(|e| !e.contains("insert 3")));
    let rollback = log.iter().position(|e| e == "conn db rollback").unwrap();
    let close = log.iter().position(|e| e == "conn db close").unwrap();
    assert!(rollback < close, "close must follow rollback");
    assert_eq!(log.iter().filter(|e| e.contains("rollback")).count(), 1);
    // Participants drain on failure too, in registration order.
    assert!(log.iter().any(|e| e == "release cursor 1"));
    assert!(log.iter().any(|e| e == "release cursor boom"));
    assert_context_clean(&ctx);
}

#[test]
fn batch_returns_the_last_non_empty_result() {
    let service = DataService::new("orders").operation(
        "fetch",
        Operation::new(|_ctx, params| {
            let id = params
                .get("id")
                .and_then(|v| v.as_scalar())
                .unwrap_or_default();
            if id == "skip" {
                return Ok(None);
            }
            Ok(Some(Element::new("row").with_text(id)))
        }),
    );
    let dispatcher = Dispatcher::new(service);
    let mut ctx = RequestContext::new();

    let payload = batch_payload("fetch", &["1", "2", "skip"]);
    let element = dispatcher
        .dispatch(&mut ctx, "fetch", Some(&payload))
        .unwrap()
        .materialize(&mut ctx)
        .unwrap()
        .unwrap();
    assert_eq!(element.text(), "2");
    assert_context_clean(&ctx);
}
