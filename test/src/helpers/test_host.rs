use weft_server::{Host, HostConfig, LinkPolicy, MapLane, NodeCell, ValueLane};
use weft_client::ClientConfig;
use weft_shared::Uri;

use super::{init_logger, TestClient};

pub const HOST_URI: &str = "warp://host";

/// A node with a value lane `count` holding 5, and a map lane `tags`
/// holding `a: 1` & `b: 2`
pub fn counter_node() -> NodeCell {
    NodeCell::new("/unit/1")
        .with_lane("count", ValueLane::with_value(5))
        .with_lane("tags", MapLane::new().with_entry("a", 1).with_entry("b", 2))
}

/// Test harness for Host
pub struct TestHost {
    host: Host,
    next_client: usize,
}

impl TestHost {
    pub fn new(nodes: Vec<NodeCell>) -> Self {
        Self::with_config(HostConfig::default(), nodes)
    }

    pub fn with_config(config: HostConfig, nodes: Vec<NodeCell>) -> Self {
        init_logger();
        let host = Host::new(config, HOST_URI, nodes).expect("host config is valid");
        Self {
            host,
            next_client: 0,
        }
    }

    pub fn with_policy<P: LinkPolicy + 'static>(mut self, policy: P) -> Self {
        self.host = self.host.with_policy(policy);
        self
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Connects a new client with default config
    pub fn connect(&mut self) -> TestClient {
        self.connect_with(ClientConfig::default())
    }

    pub fn connect_with(&mut self, config: ClientConfig) -> TestClient {
        self.next_client += 1;
        let remote_uri = Uri::new(format!("warp://client-{}", self.next_client));
        self.host
            .connect(&remote_uri)
            .expect("client uris are unique");
        TestClient::new(config, remote_uri)
    }

    /// Drops the connection on both ends, without exchanging anything
    pub fn disconnect(&self, client: &TestClient) {
        self.host
            .disconnect(client.remote_uri())
            .expect("client is connected");
        client.client().disconnect();
    }
}
