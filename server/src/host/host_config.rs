use std::default::Default;

use weft_shared::{LinkConfig, PushConfig, Uri};

/// Contains Config properties which will be used by the Host
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Timeouts of the links opened to this host's lanes
    pub link: LinkConfig,
    /// Bounds & fairness of each connection's outbox
    pub push: PushConfig,
    /// Determines whether a connection must authenticate before it may link
    pub require_auth: bool,
    /// Routing domain stamped on every push the host originates
    pub mesh_uri: Uri,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            push: PushConfig::default(),
            require_auth: false,
            mesh_uri: Uri::empty(),
        }
    }
}
