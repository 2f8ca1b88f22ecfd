/// End-to-end tests of linking, syncing & command fan-out between a host
/// and its clients

use std::thread;

use serde_json::json;
use weft_client::{DownlinkEvent, LinkOptions};
use weft_server::{MapLane, NodeCell};
use weft_shared::{Body, Envelope, EnvelopeTag, LinkState, PushRequest, Uri};
use weft_test::{counter_node, exchange_packets, TestHost, HOST_URI};

#[test]
fn sync_replays_value_then_stays_linked() {
    let mut host = TestHost::new(vec![counter_node()]);
    let mut client = host.connect();

    let link = client.link("/unit/1", "count", LinkOptions::sync());
    exchange_packets(&host, &mut [&mut client]);

    assert_eq!(
        link.take_events(),
        vec![
            DownlinkEvent::Linked,
            DownlinkEvent::Event(Body::from(json!(5))),
            DownlinkEvent::Synced,
        ]
    );
    assert_eq!(link.state(), LinkState::Synced);
    assert!(link.is_linked());
    assert_eq!(host.host().lane("/unit/1", "count").unwrap().uplink_count(), 1);
    assert_eq!(host.host().stats().links_opened(), 1);
    assert_eq!(host.host().stats().events(), 0);
}

#[test]
fn sync_replays_map_entries_in_key_order() {
    let mut host = TestHost::new(vec![counter_node()]);
    let mut client = host.connect();

    let link = client.link("/unit/1", "tags", LinkOptions::sync());
    exchange_packets(&host, &mut [&mut client]);

    assert_eq!(
        link.take_events(),
        vec![
            DownlinkEvent::Linked,
            DownlinkEvent::Event(Body::from(json!({"update": {"key": "a", "value": 1}}))),
            DownlinkEvent::Event(Body::from(json!({"update": {"key": "b", "value": 2}}))),
            DownlinkEvent::Synced,
        ]
    );
}

#[test]
fn plain_link_observes_changes_only() {
    let mut host = TestHost::new(vec![counter_node()]);
    let mut client = host.connect();

    let link = client.link("/unit/1", "count", LinkOptions::link());
    exchange_packets(&host, &mut [&mut client]);
    assert_eq!(link.take_events(), vec![DownlinkEvent::Linked]);
    assert_eq!(link.state(), LinkState::Linked);

    host.host()
        .lane("/unit/1", "count")
        .unwrap()
        .apply(&Body::from(json!(6)))
        .unwrap();
    exchange_packets(&host, &mut [&mut client]);
    assert_eq!(
        link.take_events(),
        vec![DownlinkEvent::Event(Body::from(json!(6)))]
    );
}

#[test]
fn commands_fan_out_to_every_subscriber() {
    let mut host = TestHost::new(vec![counter_node()]);
    let mut writer = host.connect();
    let mut reader = host.connect();

    let writer_link = writer.link("/unit/1", "count", LinkOptions::link());
    let reader_link = reader.link("/unit/1", "count", LinkOptions::sync());
    exchange_packets(&host, &mut [&mut writer, &mut reader]);
    writer_link.take_events();
    reader_link.take_events();

    let receipt = writer_link.command(Body::from(json!(7))).unwrap();
    assert!(receipt.wait().is_delivered());
    exchange_packets(&host, &mut [&mut writer, &mut reader]);

    let changed = vec![DownlinkEvent::Event(Body::from(json!(7)))];
    assert_eq!(writer_link.take_events(), changed);
    assert_eq!(reader_link.take_events(), changed);
    assert_eq!(host.host().stats().commands(), 0);

    let lane = host.host().lane("/unit/1", "count").unwrap();
    assert_eq!(lane.snapshot()[0].value, json!(7));
}

#[test]
fn map_commands_update_subscribers() {
    let mut host = TestHost::new(vec![counter_node()]);
    let mut client = host.connect();

    let link = client.link("/unit/1", "tags", LinkOptions::link());
    exchange_packets(&host, &mut [&mut client]);
    link.take_events();

    link.command(Body::from(json!({"update": {"key": "c", "value": 3}})))
        .unwrap();
    link.command(Body::from(json!({"remove": {"key": "a"}})))
        .unwrap();
    // removing a missing key changes nothing
    link.command(Body::from(json!({"remove": {"key": "z"}})))
        .unwrap();
    exchange_packets(&host, &mut [&mut client]);

    assert_eq!(
        link.take_events(),
        vec![
            DownlinkEvent::Event(Body::from(json!({"update": {"key": "c", "value": 3}}))),
            DownlinkEvent::Event(Body::from(json!({"remove": {"key": "a"}}))),
        ]
    );
    assert_eq!(host.host().lane("/unit/1", "tags").unwrap().snapshot().len(), 2);
}

#[test]
fn links_to_unknown_lanes_fail_with_a_reason() {
    let mut host = TestHost::new(vec![counter_node()]);
    let mut client = host.connect();

    let missing_lane = client.link("/unit/1", "missing", LinkOptions::link());
    let missing_node = client.link("/unit/2", "count", LinkOptions::sync());
    exchange_packets(&host, &mut [&mut client]);

    let reasons: Vec<String> = [missing_lane, missing_node]
        .iter()
        .map(|link| match link.take_events().as_slice() {
            [DownlinkEvent::Failed(weft_shared::LinkError::Declined(declined))] => {
                declined.reason.clone()
            }
            other => panic!("unexpected events {:?}", other),
        })
        .collect();
    assert_eq!(reasons, vec!["lane not found", "node not found"]);
    assert_eq!(host.host().stats().links_declined(), 2);
    assert_eq!(host.host().stats().links_opened(), 0);
    assert_eq!(client.client().link_count(), 0);
}

/// Reads a map lane `update` event as its key & value
fn update_of(envelope: &Envelope) -> (String, u64) {
    assert_eq!(envelope.tag(), EnvelopeTag::Event);
    let update = &envelope.body().value().expect("event has a body")["update"];
    let key = update["key"].as_str().expect("update has a key").to_string();
    let value = update["value"].as_u64().expect("update has a value");
    (key, value)
}

#[test]
fn sync_replays_one_snapshot_while_commands_land() {
    const KEYS: u64 = 8;
    const WRITES: u64 = 2000;
    const READERS: usize = 8;

    let host = TestHost::new(vec![NodeCell::new("/unit/1").with_lane("tags", MapLane::new())]);
    let host = host.host();
    let reader_uri = |reader: usize| format!("warp://reader-{}", reader);
    for reader in 0..READERS {
        host.connect(reader_uri(reader)).unwrap();
    }

    thread::scope(|scope| {
        scope.spawn(|| {
            for write in 0..WRITES {
                let update = json!({"update": {"key": format!("k{}", write % KEYS), "value": write}});
                let (request, receipt) = PushRequest::new(
                    Uri::empty(),
                    Uri::from(HOST_URI),
                    Envelope::command("/unit/1", "tags", Body::from(update)),
                    0.0,
                    None,
                );
                host.push(request);
                assert!(receipt.wait().is_delivered());
            }
        });
        for reader in 0..READERS {
            scope.spawn(move || {
                for _ in 0..reader * 200 {
                    thread::yield_now();
                }
                let sync = Envelope::sync("/unit/1", "tags", 0.0, 0.0, Body::Absent);
                host.receive_envelope(reader_uri(reader), sync).unwrap();
            });
        }
    });

    for reader in 0..READERS {
        let outgoing = host.take_outgoing(reader_uri(reader));
        assert_eq!(outgoing[0].tag(), EnvelopeTag::Linked);
        let synced: Vec<usize> = outgoing
            .iter()
            .enumerate()
            .filter(|(_, envelope)| envelope.tag() == EnvelopeTag::Synced)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(synced.len(), 1, "reader {} got {} synced", reader, synced.len());

        // the replay is the state after some number of writes: every key
        // holds the last value written to it up to the newest value seen
        let snapshot: Vec<(String, u64)> = outgoing[1..synced[0]].iter().map(update_of).collect();
        assert!(snapshot.windows(2).all(|pair| pair[0].0 < pair[1].0));
        let next = match snapshot.iter().map(|(_, value)| *value).max() {
            Some(newest) => {
                assert_eq!(snapshot.len() as u64, (newest + 1).min(KEYS));
                for (key, value) in &snapshot {
                    assert_eq!(key, &format!("k{}", value % KEYS));
                    assert!(newest - value < KEYS, "reader {} saw stale {}", reader, key);
                }
                newest + 1
            }
            None => 0,
        };

        // then every later write, in order
        let live: Vec<u64> = outgoing[synced[0] + 1..]
            .iter()
            .map(|envelope| update_of(envelope).1)
            .collect();
        assert_eq!(live, (next..WRITES).collect::<Vec<_>>(), "reader {}", reader);
    }
}
