use log::warn;

use weft_client::{Client, ClientConfig, LinkHandle, LinkOptions};
use weft_shared::{
    transport::{LocalPacketReceiver, LocalPacketSender, LocalTransport},
    Identity, LinkAddress, Uri,
};

use super::{TestHost, HOST_URI};

/// Test harness for Client, holding both ends of its connection to a
/// [`TestHost`]
pub struct TestClient {
    client: Client,
    remote_uri: Uri,
    to_host: LocalPacketSender,
    from_host: LocalPacketReceiver,
    host_sender: LocalPacketSender,
    host_receiver: LocalPacketReceiver,
}

impl TestClient {
    pub(crate) fn new(config: ClientConfig, remote_uri: Uri) -> Self {
        let ((to_host, from_host), (host_sender, host_receiver)) = LocalTransport::pair();
        Self {
            client: Client::new(config, HOST_URI).expect("client config is valid"),
            remote_uri,
            to_host,
            from_host,
            host_sender,
            host_receiver,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The URI the host knows this client by
    pub fn remote_uri(&self) -> &Uri {
        &self.remote_uri
    }

    /// Opens an anonymous link to a lane of the host
    pub fn link(&self, node_uri: &str, lane_uri: &str, options: LinkOptions) -> LinkHandle {
        self.link_as(node_uri, lane_uri, options, Identity::Anonymous)
    }

    pub fn link_as(
        &self,
        node_uri: &str,
        lane_uri: &str,
        options: LinkOptions,
        identity: Identity,
    ) -> LinkHandle {
        self.client
            .open_link(LinkAddress::new("", node_uri, lane_uri), options, identity)
            .expect("link opens")
    }

    /// Moves everything the client has queued to the host. Returns how many
    /// payloads the host received.
    pub fn send_to_host(&mut self, host: &TestHost) -> usize {
        self.client
            .send_packets(&self.to_host)
            .expect("local transport is open");
        let mut received = 0;
        loop {
            match host.host().receive_packets(&self.remote_uri, &mut self.host_receiver) {
                Ok(count) => return received + count,
                Err(err) => {
                    // the failing payload was consumed, keep draining
                    warn!("{} payload refused: {}", self.remote_uri, err);
                    received += 1;
                }
            }
        }
    }

    /// Moves everything the host has queued for this client. Returns how
    /// many payloads the client received.
    pub fn receive_from_host(&mut self, host: &TestHost) -> usize {
        host.host()
            .send_packets(&self.remote_uri, &self.host_sender)
            .expect("local transport is open");
        self.client.receive_packets(&mut self.from_host)
    }
}
