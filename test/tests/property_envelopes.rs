/// PROPERTY-BASED TESTS: envelope codec & outbox ordering
///
/// Key invariants:
/// 1. Decoding what was encoded yields the same envelope
/// 2. Decoding arbitrary payloads never panics
/// 3. A push is only overtaken by pushes whose priority lead outweighs
///    their submission lag

use proptest::prelude::*;
use serde_json::{json, Value};
use weft_shared::{
    Body, Envelope, EnvelopeCodec, EnvelopeTag, JsonCodec, PushConfig, PushQueue, PushRequest, Uri,
};

const TAGS: [EnvelopeTag; 12] = [
    EnvelopeTag::Event,
    EnvelopeTag::Command,
    EnvelopeTag::Link,
    EnvelopeTag::Linked,
    EnvelopeTag::Sync,
    EnvelopeTag::Synced,
    EnvelopeTag::Unlink,
    EnvelopeTag::Unlinked,
    EnvelopeTag::Auth,
    EnvelopeTag::Authed,
    EnvelopeTag::Deauth,
    EnvelopeTag::Deauthed,
];

fn body_strategy() -> impl Strategy<Value = Body> {
    prop_oneof![
        Just(Body::Absent),
        Just(Body::empty()),
        any::<i64>().prop_map(|n| Body::from(json!(n))),
        "[a-z]{0,8}".prop_map(|s| Body::from(json!(s))),
        ("[a-z]{1,4}", any::<bool>()).prop_map(|(key, value)| {
            let mut map = serde_json::Map::new();
            map.insert(key, Value::from(value));
            Body::from(Value::Object(map))
        }),
    ]
}

// any finite f32 survives the f32 -> f64 -> JSON -> f64 -> f32 trip
fn hint_strategy() -> impl Strategy<Value = f32> {
    prop_oneof![
        Just(0.0f32),
        Just(f32::MAX),
        Just(f32::MIN),
        Just(f32::MIN_POSITIVE),
        any::<f32>().prop_filter("hints are finite", |hint| hint.is_finite()),
    ]
}

fn envelope_strategy() -> impl Strategy<Value = Envelope> {
    (
        0..TAGS.len(),
        "(/[a-z0-9]{1,6}){0,3}",
        "[a-z]{0,8}",
        hint_strategy(),
        hint_strategy(),
        body_strategy(),
    )
        .prop_map(|(tag, node, lane, prio, rate, body)| {
            Envelope::from_parts(TAGS[tag], Uri::from(node), Uri::from(lane), prio, rate, body)
        })
}

proptest! {
    #[test]
    fn prop_codec_preserves_envelopes(envelope in envelope_strategy()) {
        let codec = JsonCodec;
        let decoded = codec.decode(&codec.encode(&envelope));
        prop_assert_eq!(decoded, Ok(envelope));
    }

    #[test]
    fn prop_decode_never_panics(payload in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = JsonCodec.decode(&payload);
    }

    #[test]
    fn prop_decode_tolerates_mistyped_fields(
        tag in 0..TAGS.len(),
        node in prop_oneof![Just(json!(null)), Just(json!(3)), Just(json!("/a"))],
        prio in prop_oneof![Just(json!("high")), Just(json!(-1.5)), Just(json!([]))],
    ) {
        let value = json!({"tag": TAGS[tag].as_str(), "node": node, "prio": prio});
        let envelope = Envelope::from_wire_value(&value);
        prop_assert!(envelope.is_ok());
        prop_assert_eq!(envelope.unwrap().tag(), TAGS[tag]);
    }

    #[test]
    fn prop_overtaking_is_bounded(prios in prop::collection::vec(0u8..8, 1..200)) {
        let config = PushConfig::default();
        let aging = f64::from(config.aging_per_push);
        let mut queue = PushQueue::new(&config);
        let prios: Vec<f32> = prios.into_iter().map(|p| f32::from(p) / 2.0).collect();
        for (id, prio) in prios.iter().enumerate() {
            let (request, _receipt) = PushRequest::new(
                Uri::empty(),
                Uri::from("warp://peer"),
                Envelope::command("/unit/1", "count", Body::from(json!(id))),
                *prio,
                None,
            );
            queue.offer(request).unwrap();
        }

        let order: Vec<usize> = queue
            .drain()
            .iter()
            .map(|envelope| envelope.body().value().and_then(Value::as_u64).unwrap() as usize)
            .collect();
        prop_assert_eq!(order.len(), prios.len());
        for (popped, later) in order.iter().enumerate() {
            for earlier in &order[popped + 1..] {
                // `later` popped before `earlier`
                if later > earlier {
                    let lag = (later - earlier) as f64;
                    let lead = f64::from(prios[*later] - prios[*earlier]) / aging;
                    prop_assert!(lag <= lead + 1e-6, "{} overtook {}", later, earlier);
                }
            }
        }
    }
}
