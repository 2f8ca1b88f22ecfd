use std::sync::atomic::{AtomicU64, Ordering};

use weft_shared::LinkReport;

/// Counters of a [`Host`](crate::Host), updated from every connection and
/// lane without locking
#[derive(Debug, Default)]
pub struct HostStats {
    links_opened: AtomicU64,
    links_closed: AtomicU64,
    links_declined: AtomicU64,
    links_failed: AtomicU64,
    protocol_violations: AtomicU64,
    decode_errors: AtomicU64,
    pushes_delivered: AtomicU64,
    pushes_declined: AtomicU64,
    timeouts: AtomicU64,
    events: AtomicU64,
    commands: AtomicU64,
}

macro_rules! counters {
    ($($name:ident => $record:ident),* $(,)?) => {
        impl HostStats {
            $(
                pub fn $name(&self) -> u64 {
                    self.$name.load(Ordering::Relaxed)
                }

                pub(crate) fn $record(&self) {
                    self.$name.fetch_add(1, Ordering::Relaxed);
                }
            )*
        }
    };
}

counters! {
    links_opened => link_opened,
    links_closed => link_closed,
    links_declined => link_declined,
    links_failed => link_failed,
    protocol_violations => protocol_violation,
    decode_errors => decode_error,
    pushes_delivered => push_delivered,
    pushes_declined => push_declined,
    timeouts => timeout,
}

impl HostStats {
    /// Events sent over links that have closed
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    /// Commands received over links that have closed
    pub fn commands(&self) -> u64 {
        self.commands.load(Ordering::Relaxed)
    }

    /// Folds the final counters of a closed link into the totals
    pub(crate) fn record(&self, report: &LinkReport) {
        self.link_closed();
        self.events.fetch_add(report.events, Ordering::Relaxed);
        self.commands.fetch_add(report.commands, Ordering::Relaxed);
    }
}
