/// Tests of push requests resolving exactly once, across threads and
/// through a host's routing

use std::thread;

use serde_json::json;
use weft_server::{Host, HostConfig};
use weft_shared::{
    Body, DeclineReason, DeliveryOutcome, Envelope, EnvelopeTag, PushRequest, Uri,
};
use weft_test::{counter_node, init_logger, HOST_URI};

fn request(host_uri: &str, envelope: Envelope) -> (PushRequest, weft_shared::PushReceipt) {
    PushRequest::new(Uri::empty(), Uri::from(host_uri), envelope, 0.0, None)
}

fn command(value: i64) -> Envelope {
    Envelope::command("/unit/1", "count", Body::from(json!(value)))
}

fn host() -> Host {
    init_logger();
    let host = Host::new(HostConfig::default(), HOST_URI, vec![counter_node()]).unwrap();
    host.connect("warp://peer").unwrap();
    host
}

#[test]
fn outcome_crosses_threads() {
    let receipts: Vec<_> = (0..32)
        .map(|n| {
            let (request, receipt) = request("warp://peer", command(n));
            thread::spawn(move || {
                if n % 2 == 0 {
                    request.deliver();
                } else {
                    request.decline(DeclineReason::Closed);
                }
            });
            (n, receipt)
        })
        .collect();

    for (n, receipt) in receipts {
        let expected = if n % 2 == 0 {
            DeliveryOutcome::Delivered
        } else {
            DeliveryOutcome::Declined(DeclineReason::Closed)
        };
        assert_eq!(receipt.wait(), expected);
    }
}

#[test]
fn dropped_request_is_declined() {
    let (request, receipt) = request("warp://peer", command(1));
    thread::spawn(move || drop(request)).join().unwrap();
    assert_eq!(
        receipt.wait(),
        DeliveryOutcome::Declined(DeclineReason::Dropped)
    );
}

#[test]
fn local_commands_are_applied() {
    let host = host();
    let (push, receipt) = request(HOST_URI, command(9));
    host.push(push);

    assert!(receipt.wait().is_delivered());
    let lane = host.lane("/unit/1", "count").unwrap();
    assert_eq!(lane.snapshot()[0].value, json!(9));
    assert_eq!(host.stats().pushes_delivered(), 1);
}

#[test]
fn local_pushes_other_than_commands_are_declined() {
    let host = host();
    let (push, receipt) = request(
        "",
        Envelope::event("/unit/1", "count", Body::from(json!(1))),
    );
    host.push(push);

    assert!(matches!(
        receipt.wait(),
        DeliveryOutcome::Declined(DeclineReason::Policy(_))
    ));
    assert_eq!(host.stats().pushes_declined(), 1);
}

#[test]
fn remote_pushes_queue_on_the_connection() {
    let host = host();
    let (push, receipt) = request("warp://peer", command(3));
    host.push(push);
    let (lost, lost_receipt) = request("warp://nobody", command(4));
    host.push(lost);

    assert!(receipt.wait().is_delivered());
    assert_eq!(
        lost_receipt.wait(),
        DeliveryOutcome::Declined(DeclineReason::UnknownDestination)
    );
    let outgoing = host.take_outgoing("warp://peer");
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].tag(), EnvelopeTag::Command);
}

#[test]
fn pushes_to_a_dropped_connection_are_declined() {
    let host = host();
    host.disconnect("warp://peer").unwrap();
    let (push, receipt) = request("warp://peer", command(3));
    host.push(push);

    assert_eq!(
        receipt.wait(),
        DeliveryOutcome::Declined(DeclineReason::UnknownDestination)
    );
}
