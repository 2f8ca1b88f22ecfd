use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use log::{debug, trace};

use weft_shared::{Body, CellAddress, CellContext, Scope, ScopeError, Uri};

use crate::{
    lane::model::{LaneEntry, LaneError, LaneModel},
    uplink::Uplink,
};

/// A lane mounted on a host: its authoritative model and the uplinks that
/// observe it.
///
/// The model lock serialises mutations, fan-out and sync bursts, so a
/// syncing link sees its snapshot and `synced` with no event in between.
/// Membership of the uplink scope is never changed while waiting on it.
pub struct LaneCell {
    node_uri: Uri,
    lane_uri: Uri,
    model: Mutex<Box<dyn LaneModel>>,
    scope: Scope<Uplink>,
}

impl LaneCell {
    pub(crate) fn new(
        node_uri: Uri,
        lane_uri: Uri,
        model: Box<dyn LaneModel>,
        context: Arc<dyn CellContext>,
    ) -> Self {
        let address = CellAddress::Lane {
            node_uri: node_uri.clone(),
            lane_uri: lane_uri.clone(),
        };
        Self {
            node_uri,
            lane_uri,
            model: Mutex::new(model),
            scope: Scope::new(address, Some(context)),
        }
    }

    pub fn node_uri(&self) -> &Uri {
        &self.node_uri
    }

    pub fn lane_uri(&self) -> &Uri {
        &self.lane_uri
    }

    /// The current lane state
    pub fn snapshot(&self) -> Vec<LaneEntry> {
        self.model().snapshot()
    }

    /// Applies a command to the lane and fans the resulting events out to
    /// every linked uplink. Returns how many events the command caused.
    pub fn apply(&self, command: &Body) -> Result<usize, LaneError> {
        let now = Instant::now();
        let mut model = self.model();
        let events = model.apply(command)?;
        let uplinks = self.scope.snapshot();
        trace!(
            "{}#{}: {} events to {} uplinks",
            self.node_uri,
            self.lane_uri,
            events.len(),
            uplinks.len()
        );
        for uplink in uplinks.iter().filter(|uplink| uplink.is_linked()) {
            for event in &events {
                if !uplink.emit_event(event.clone(), now) {
                    break;
                }
            }
        }
        Ok(events.len())
    }

    /// Number of uplinks currently registered
    pub fn uplink_count(&self) -> usize {
        self.scope.len()
    }

    pub fn is_closed(&self) -> bool {
        self.scope.is_closed()
    }

    pub(crate) fn scope(&self) -> &Scope<Uplink> {
        &self.scope
    }

    /// Registers an uplink and acknowledges it. A sync request is answered
    /// with the snapshot and `synced` before the model lock is released.
    pub(crate) fn open_uplink(&self, uplink: &Arc<Uplink>, now: Instant) -> Result<(), ScopeError> {
        let model = self.model();
        self.scope.bind_downlink(Arc::clone(uplink))?;
        if uplink.is_closed() {
            // closed while being registered, before this scope held it
            self.scope.close_downlink(&uplink.key());
            return Ok(());
        }
        if !uplink.accept(now) {
            return Ok(());
        }
        if uplink.sync_requested() {
            let entries = model.snapshot();
            debug!(
                "{}: syncing {} entries of {}#{}",
                uplink.key(),
                entries.len(),
                self.node_uri,
                self.lane_uri
            );
            for entry in &entries {
                if !uplink.emit_event(entry.to_body(), now) {
                    return Ok(());
                }
            }
            uplink.complete_sync(now);
        }
        Ok(())
    }

    /// Starts the unlink handshake on every uplink. Returns how many were
    /// asked to unlink.
    pub(crate) fn unlink_all(&self, now: Instant) -> usize {
        let uplinks = self.scope.snapshot();
        for uplink in uplinks.iter() {
            uplink.unlink(now);
        }
        uplinks.len()
    }

    pub(crate) fn close(&self) -> usize {
        self.scope.close()
    }

    fn model(&self) -> MutexGuard<'_, Box<dyn LaneModel>> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
