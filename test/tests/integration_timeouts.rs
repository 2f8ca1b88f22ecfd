/// End-to-end tests of handshake timeouts and lost connections

use std::time::{Duration, Instant};

use weft_client::{ClientConfig, DownlinkEvent, LinkOptions};
use weft_server::HostConfig;
use weft_shared::{CloseCause, LinkConfig, LinkError, LinkState};
use weft_test::{counter_node, exchange_packets, TestHost};

fn short_timeouts() -> LinkConfig {
    LinkConfig {
        linking_timeout: Duration::from_millis(50),
        unlinking_timeout: Duration::from_millis(50),
    }
}

#[test]
fn unanswered_link_fails_with_timeout() {
    let mut host = TestHost::new(vec![counter_node()]);
    let client = host.connect_with(ClientConfig {
        link: short_timeouts(),
        ..ClientConfig::default()
    });

    let link = client.link("/unit/1", "count", LinkOptions::sync());
    client.client().update(Instant::now());
    assert!(link.take_events().is_empty());

    client.client().update(Instant::now() + Duration::from_secs(1));
    assert_eq!(
        link.take_events(),
        vec![DownlinkEvent::Failed(LinkError::Timeout {
            state: LinkState::Linking
        })]
    );
    assert!(link.is_closed());
    assert_eq!(client.client().link_count(), 0);
}

#[test]
fn unanswered_client_unlink_times_out() {
    let mut host = TestHost::new(vec![counter_node()]);
    let mut client = host.connect_with(ClientConfig {
        link: short_timeouts(),
        ..ClientConfig::default()
    });

    let link = client.link("/unit/1", "count", LinkOptions::link());
    exchange_packets(&host, &mut [&mut client]);
    link.take_events();

    client.client().close_link(&link);
    client.client().update(Instant::now() + Duration::from_secs(1));
    assert_eq!(
        link.take_events(),
        vec![DownlinkEvent::Failed(LinkError::Timeout {
            state: LinkState::Unlinking
        })]
    );
}

#[test]
fn unanswered_host_unlink_times_out() {
    let config = HostConfig {
        link: short_timeouts(),
        ..HostConfig::default()
    };
    let mut host = TestHost::with_config(config, vec![counter_node()]);
    let mut client = host.connect();

    client.link("/unit/1", "count", LinkOptions::link());
    exchange_packets(&host, &mut [&mut client]);
    assert_eq!(host.host().unlink("/unit/1", "count"), Ok(1));

    // the subscriber never answers
    host.host().update(Instant::now() + Duration::from_secs(1));

    assert_eq!(host.host().stats().timeouts(), 1);
    assert_eq!(host.host().stats().links_closed(), 1);
    assert_eq!(host.host().lane("/unit/1", "count").unwrap().uplink_count(), 0);
}

#[test]
fn disconnect_closes_links_on_both_ends() {
    let mut host = TestHost::new(vec![counter_node()]);
    let mut client = host.connect();
    let mut other = host.connect();

    let count = client.link("/unit/1", "count", LinkOptions::sync());
    let tags = client.link("/unit/1", "tags", LinkOptions::link());
    let survivor = other.link("/unit/1", "count", LinkOptions::link());
    exchange_packets(&host, &mut [&mut client, &mut other]);
    count.take_events();
    tags.take_events();
    survivor.take_events();

    host.disconnect(&client);

    let disconnected = vec![DownlinkEvent::Unlinked {
        cause: CloseCause::Disconnected,
        reason: None,
    }];
    assert_eq!(count.take_events(), disconnected);
    assert_eq!(tags.take_events(), disconnected);
    assert!(!host.host().is_connected(client.remote_uri()));
    assert_eq!(host.host().connection_count(), 1);
    assert_eq!(host.host().stats().links_closed(), 2);
    assert_eq!(host.host().lane("/unit/1", "count").unwrap().uplink_count(), 1);
    assert!(survivor.is_linked());
}

#[test]
fn reconnecting_starts_over() {
    let mut host = TestHost::new(vec![counter_node()]);
    let mut client = host.connect();

    client.link("/unit/1", "count", LinkOptions::link());
    exchange_packets(&host, &mut [&mut client]);
    host.disconnect(&client);

    host.host().connect(client.remote_uri()).unwrap();
    let link = client.link("/unit/1", "count", LinkOptions::sync());
    exchange_packets(&host, &mut [&mut client]);

    assert!(link.is_synced());
    assert_eq!(host.host().stats().links_opened(), 2);
    assert_eq!(host.host().lane("/unit/1", "count").unwrap().uplink_count(), 1);
}
