use std::{borrow::Borrow, fmt};

/// An address of a mesh, host, node or lane.
///
/// URIs are opaque to the link core; the only distinguished value is the
/// empty URI, which host-addressed envelopes report for their node & lane.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri(String);

pub(crate) static EMPTY_URI: Uri = Uri(String::new());

impl Uri {
    pub fn new<S: Into<String>>(uri: S) -> Self {
        Self(uri.into())
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(uri: &str) -> Self {
        Self(uri.to_string())
    }
}

impl From<String> for Uri {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}

impl From<&Uri> for Uri {
    fn from(uri: &Uri) -> Self {
        uri.clone()
    }
}

impl Borrow<str> for Uri {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The host / node / lane triple a link is attached to
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct LinkAddress {
    pub host_uri: Uri,
    pub node_uri: Uri,
    pub lane_uri: Uri,
}

impl LinkAddress {
    pub fn new<H: Into<Uri>, N: Into<Uri>, L: Into<Uri>>(host_uri: H, node_uri: N, lane_uri: L) -> Self {
        Self {
            host_uri: host_uri.into(),
            node_uri: node_uri.into(),
            lane_uri: lane_uri.into(),
        }
    }

    /// Returns the same node & lane addressed through another host
    pub fn with_host_uri<H: Into<Uri>>(&self, host_uri: H) -> Self {
        Self {
            host_uri: host_uri.into(),
            node_uri: self.node_uri.clone(),
            lane_uri: self.lane_uri.clone(),
        }
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}#{}", self.host_uri, self.node_uri, self.lane_uri)
    }
}
