use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use log::trace;

use weft_shared::{CellContext, DeclineReason, LinkReport, PushRequest, Uri};

use crate::{
    lane::{LaneCell, LaneModel},
    router::Router,
};

/// Describes a node and the lanes it hosts, before it is mounted on a
/// [`Host`](crate::Host)
pub struct NodeCell {
    node_uri: Uri,
    lanes: Vec<(Uri, Box<dyn LaneModel>)>,
}

impl NodeCell {
    pub fn new<U: Into<Uri>>(node_uri: U) -> Self {
        Self {
            node_uri: node_uri.into(),
            lanes: Vec::new(),
        }
    }

    /// Adds a lane; a later lane with the same URI replaces an earlier one
    pub fn with_lane<U: Into<Uri>, M: LaneModel>(mut self, lane_uri: U, model: M) -> Self {
        let lane_uri = lane_uri.into();
        self.lanes.retain(|(uri, _)| uri != &lane_uri);
        self.lanes.push((lane_uri, Box::new(model)));
        self
    }

    pub fn node_uri(&self) -> &Uri {
        &self.node_uri
    }

    pub(crate) fn mount(self, router: Weak<Router>) -> Node {
        let context: Arc<dyn CellContext> = Arc::new(NodeContext {
            node_uri: self.node_uri.clone(),
            router,
        });
        let lanes = self
            .lanes
            .into_iter()
            .map(|(lane_uri, model)| {
                let lane = LaneCell::new(
                    self.node_uri.clone(),
                    lane_uri.clone(),
                    model,
                    Arc::clone(&context),
                );
                (lane_uri, Arc::new(lane))
            })
            .collect();
        Node {
            node_uri: self.node_uri,
            lanes,
        }
    }
}

/// A mounted node
pub(crate) struct Node {
    node_uri: Uri,
    lanes: HashMap<Uri, Arc<LaneCell>>,
}

impl Node {
    pub(crate) fn node_uri(&self) -> &Uri {
        &self.node_uri
    }

    pub(crate) fn lane(&self, lane_uri: &Uri) -> Option<&Arc<LaneCell>> {
        self.lanes.get(lane_uri)
    }

    pub(crate) fn lanes(&self) -> impl Iterator<Item = &Arc<LaneCell>> {
        self.lanes.values()
    }
}

/// The parent context of a node's lanes; hands everything on to the host
struct NodeContext {
    node_uri: Uri,
    router: Weak<Router>,
}

impl CellContext for NodeContext {
    fn push_down(&self, request: PushRequest) {
        match self.router.upgrade() {
            Some(router) => router.push_down(request),
            None => request.decline(DeclineReason::Closed),
        }
    }

    fn report_down(&self, report: LinkReport) {
        if let Some(router) = self.router.upgrade() {
            trace!("{}: {} closed", self.node_uri, report.key);
            router.report_down(report);
        }
    }
}
