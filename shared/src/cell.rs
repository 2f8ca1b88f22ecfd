use std::fmt;

use crate::{LinkAddress, LinkKey, PushRequest, Uri};

/// The addressable entity a [`Scope`](crate::Scope) belongs to
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CellAddress {
    Host(Uri),
    Node(Uri),
    Lane { node_uri: Uri, lane_uri: Uri },
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellAddress::Host(host_uri) => write!(f, "host {}", host_uri),
            CellAddress::Node(node_uri) => write!(f, "node {}", node_uri),
            CellAddress::Lane { node_uri, lane_uri } => write!(f, "lane {}#{}", node_uri, lane_uri),
        }
    }
}

/// Traffic counters of one link, reported down the cell hierarchy when the
/// link closes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkReport {
    pub key: LinkKey,
    pub address: LinkAddress,
    pub events: u64,
    pub commands: u64,
    pub violations: u64,
}

/// The parent of a cell. Lanes hand pushes & reports to their node, nodes
/// to their host, so no level needs to know its siblings.
pub trait CellContext: Send + Sync {
    /// Routes a push toward its destination, resolving it exactly once
    fn push_down(&self, request: PushRequest);

    fn report_down(&self, report: LinkReport);
}
