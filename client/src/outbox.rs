use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, trace};

use weft_shared::{CellContext, Envelope, LinkReport, PushConfig, PushQueue, PushRequest};

/// The root context of a client's links: everything they push lands in
/// the one queue toward the host
pub(crate) struct Outbox {
    queue: Mutex<PushQueue>,
}

impl Outbox {
    pub(crate) fn new(config: &PushConfig) -> Self {
        Self {
            queue: Mutex::new(PushQueue::new(config)),
        }
    }

    pub(crate) fn take_outgoing(&self) -> Vec<Envelope> {
        self.queue().drain()
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue().len()
    }

    pub(crate) fn close(&self) -> usize {
        self.queue().close()
    }

    fn queue(&self) -> MutexGuard<'_, PushQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CellContext for Outbox {
    fn push_down(&self, request: PushRequest) {
        let tag = request.envelope().tag();
        if let Err(reason) = self.queue().offer(request) {
            debug!("outbox declined `{}`: {:?}", tag, reason);
        }
    }

    fn report_down(&self, report: LinkReport) {
        trace!(
            "{} {} closed: {} events, {} commands, {} violations",
            report.key, report.address, report.events, report.commands, report.violations
        );
    }
}
