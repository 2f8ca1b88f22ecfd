use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Weak},
};

use arc_swap::{ArcSwap, Guard};
use log::{debug, trace, warn};

use weft_shared::{CellContext, DeclineReason, EnvelopeTag, LinkReport, PushRequest, Uri};

use crate::{
    connection::Connection,
    lane::LaneCell,
    node::{Node, NodeCell},
    stats::HostStats,
    HostError,
};

/// The root cell of a host. Pushes addressed to a remote host go to that
/// connection's outbox, pushes addressed to this host go to its lanes.
pub(crate) struct Router {
    host_uri: Uri,
    nodes: HashMap<Uri, Node>,
    connections: ArcSwap<HashMap<Uri, Arc<Connection>>>,
    stats: Arc<HostStats>,
}

impl Router {
    pub(crate) fn new(
        host_uri: Uri,
        nodes: Vec<NodeCell>,
        stats: Arc<HostStats>,
    ) -> Result<Arc<Self>, HostError> {
        let mut seen = HashSet::new();
        for node in &nodes {
            if !seen.insert(node.node_uri().clone()) {
                return Err(HostError::DuplicateNode {
                    node: node.node_uri().to_string(),
                });
            }
        }

        Ok(Arc::new_cyclic(|router: &Weak<Router>| {
            let nodes = nodes
                .into_iter()
                .map(|node| {
                    let node = node.mount(router.clone());
                    (node.node_uri().clone(), node)
                })
                .collect();
            Router {
                host_uri,
                nodes,
                connections: ArcSwap::from_pointee(HashMap::new()),
                stats,
            }
        }))
    }

    pub(crate) fn host_uri(&self) -> &Uri {
        &self.host_uri
    }

    pub(crate) fn lane(&self, node_uri: &Uri, lane_uri: &Uri) -> Option<&Arc<LaneCell>> {
        self.nodes.get(node_uri)?.lane(lane_uri)
    }

    pub(crate) fn has_node(&self, node_uri: &Uri) -> bool {
        self.nodes.contains_key(node_uri)
    }

    pub(crate) fn lanes(&self) -> impl Iterator<Item = &Arc<LaneCell>> {
        self.nodes.values().flat_map(Node::lanes)
    }

    // Connections

    pub(crate) fn connection(&self, remote_uri: &Uri) -> Option<Arc<Connection>> {
        self.connections.load().get(remote_uri).cloned()
    }

    pub(crate) fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections.load().values().cloned().collect()
    }

    /// Publishes a connection, unless one from the same remote exists
    pub(crate) fn add_connection(&self, connection: Arc<Connection>) -> Result<(), HostError> {
        let remote_uri = connection.remote_uri().clone();
        let mut current = self.connections.load_full();
        loop {
            if current.contains_key(&remote_uri) {
                return Err(HostError::AlreadyConnected {
                    remote: remote_uri.to_string(),
                });
            }
            let mut next = HashMap::clone(&current);
            next.insert(remote_uri.clone(), Arc::clone(&connection));
            let previous = self.connections.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&current, &previous) {
                return Ok(());
            }
            current = Guard::into_inner(previous);
        }
    }

    pub(crate) fn remove_connection(&self, remote_uri: &Uri) -> Option<Arc<Connection>> {
        let mut current = self.connections.load_full();
        loop {
            let connection = Arc::clone(current.get(remote_uri)?);
            let mut next = HashMap::clone(&current);
            next.remove(remote_uri);
            let previous = self.connections.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&current, &previous) {
                return Some(connection);
            }
            current = Guard::into_inner(previous);
        }
    }

    /// Delivers a push into a lane of this host. Only commands can be
    /// delivered to a lane; the lane applies them once accepted.
    fn push_local(&self, request: PushRequest) {
        let Some(lane) = self.lane(request.node_uri(), request.lane_uri()).cloned() else {
            debug!(
                "no lane {}#{} on {}",
                request.node_uri(),
                request.lane_uri(),
                self.host_uri
            );
            self.stats.push_declined();
            request.decline(DeclineReason::UnknownDestination);
            return;
        };
        if request.envelope().tag() != EnvelopeTag::Command {
            self.stats.push_declined();
            let reason = format!("lanes only accept commands, got `{}`", request.envelope().tag());
            request.decline(DeclineReason::Policy(reason));
            return;
        }
        if lane.is_closed() {
            self.stats.push_declined();
            request.decline(DeclineReason::Closed);
            return;
        }

        self.stats.push_delivered();
        let envelope = request.deliver();
        if let Err(err) = lane.apply(envelope.body()) {
            warn!(
                "command rejected by {}#{}: {}",
                lane.node_uri(),
                lane.lane_uri(),
                err
            );
        }
    }
}

impl CellContext for Router {
    fn push_down(&self, request: PushRequest) {
        let host_uri = request.host_uri();
        if host_uri.is_empty() || host_uri == &self.host_uri {
            self.push_local(request);
            return;
        }

        let Some(connection) = self.connection(host_uri) else {
            trace!("no connection to {}", host_uri);
            self.stats.push_declined();
            request.decline(DeclineReason::UnknownDestination);
            return;
        };
        match connection.offer(request) {
            Ok(()) => self.stats.push_delivered(),
            Err(_) => self.stats.push_declined(),
        }
    }

    fn report_down(&self, report: LinkReport) {
        debug!(
            "{} {} closed: {} events, {} commands, {} violations",
            report.key, report.address, report.events, report.commands, report.violations
        );
        self.stats.record(&report);
    }
}
