/// End-to-end tests of authentication and link policies

use serde_json::json;
use weft_client::{DownlinkEvent, LinkOptions};
use weft_server::{HostConfig, LinkPolicy};
use weft_shared::{Body, Credentials, Identity, LinkAddress, LinkDeclined, LinkError};
use weft_test::{counter_node, exchange_packets, TestHost};

/// Only `admin` may link to `/unit/1#tags`
struct AdminTags;

impl LinkPolicy for AdminTags {
    fn authorize(&self, address: &LinkAddress, identity: &Identity) -> Result<(), String> {
        if address.lane_uri.as_str() == "tags" && identity.subject() != Some("admin") {
            return Err("forbidden".to_string());
        }
        Ok(())
    }
}

fn identity(subject: &str) -> Identity {
    Identity::Authenticated(Credentials::new(
        subject,
        Body::from(json!({ "subject": subject })),
    ))
}

fn declined(link: &weft_client::LinkHandle, reason: &str) -> Vec<DownlinkEvent> {
    vec![DownlinkEvent::Failed(LinkError::Declined(LinkDeclined {
        address: link.address().to_string(),
        reason: reason.to_string(),
    }))]
}

#[test]
fn policy_declines_unauthorized_links() {
    let mut host = TestHost::new(vec![counter_node()]).with_policy(AdminTags);
    let mut client = host.connect();

    let anonymous = client.link("/unit/1", "tags", LinkOptions::sync());
    let count = client.link("/unit/1", "count", LinkOptions::link());
    exchange_packets(&host, &mut [&mut client]);

    assert_eq!(anonymous.take_events(), declined(&anonymous, "forbidden"));
    assert_eq!(count.take_events(), vec![DownlinkEvent::Linked]);
    assert_eq!(host.host().stats().links_declined(), 1);
    assert_eq!(host.host().stats().links_opened(), 1);

    let admin = client.link_as("/unit/1", "tags", LinkOptions::link(), identity("admin"));
    exchange_packets(&host, &mut [&mut client]);

    assert_eq!(admin.take_events(), vec![DownlinkEvent::Linked]);
    assert_eq!(
        host.host().identity(client.remote_uri()).unwrap().subject(),
        Some("admin")
    );
}

#[test]
fn required_auth_declines_anonymous_links() {
    let config = HostConfig {
        require_auth: true,
        ..HostConfig::default()
    };
    let mut host = TestHost::with_config(config, vec![counter_node()]);
    let mut client = host.connect();

    let anonymous = client.link("/unit/1", "count", LinkOptions::link());
    exchange_packets(&host, &mut [&mut client]);
    assert_eq!(
        anonymous.take_events(),
        declined(&anonymous, "authentication required")
    );

    let authenticated = client.link_as("/unit/1", "count", LinkOptions::sync(), identity("ada"));
    exchange_packets(&host, &mut [&mut client]);
    assert_eq!(
        authenticated.take_events(),
        vec![
            DownlinkEvent::Linked,
            DownlinkEvent::Event(Body::from(json!(5))),
            DownlinkEvent::Synced,
        ]
    );
    assert_eq!(authenticated.identity().subject(), Some("ada"));
}

#[test]
fn rejected_credentials_reset_the_identity() {
    let mut host = TestHost::new(vec![counter_node()]);
    let mut client = host.connect();

    let ghost = Identity::Authenticated(Credentials::new("ghost", Body::from(json!(42))));
    let link = client.link_as("/unit/1", "count", LinkOptions::link(), ghost);
    exchange_packets(&host, &mut [&mut client]);

    // the host falls back to anonymous, which its policy still links
    assert_eq!(link.take_events(), vec![DownlinkEvent::Linked]);
    assert_eq!(*client.client().identity(), Identity::Anonymous);
    assert_eq!(
        *host.host().identity(client.remote_uri()).unwrap(),
        Identity::Anonymous
    );
}

#[test]
fn deauth_is_sent_when_switching_back_to_anonymous() {
    let mut host = TestHost::new(vec![counter_node()]);
    let mut client = host.connect();

    client.link_as("/unit/1", "count", LinkOptions::link(), identity("ada"));
    exchange_packets(&host, &mut [&mut client]);
    assert_eq!(
        host.host().identity(client.remote_uri()).unwrap().subject(),
        Some("ada")
    );

    client.link("/unit/1", "tags", LinkOptions::link());
    exchange_packets(&host, &mut [&mut client]);
    assert!(host.host().identity(client.remote_uri()).unwrap().is_anonymous());
}
