use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Instant,
};

use arc_swap::ArcSwap;
use log::warn;

use crate::{
    link::{
        error::LinkError,
        machine::{LinkMachine, LinkTransition},
        state::{Direction, LinkRole, LinkState},
    },
    EnvelopeTag, Identity, LinkAddress, LinkConfig, LinkReport,
};

/// Identifies one link for its whole lifetime. Keys are never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey(u64);

impl LinkKey {
    pub fn to_u64(&self) -> u64 {
        self.0
    }

    pub fn from_u64(value: u64) -> Self {
        LinkKey(value)
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// Hands out [`LinkKey`]s; owned by each host & client
#[derive(Debug, Default)]
pub struct LinkKeyGenerator {
    next: AtomicU64,
}

impl LinkKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self) -> LinkKey {
        LinkKey(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Represents one attachment between a cell and one subscriber: the state
/// both link roles share
pub struct LinkBinding {
    key: LinkKey,
    address: LinkAddress,
    prio: f32,
    rate: f32,
    machine: Mutex<LinkMachine>,
    identity: ArcSwap<Identity>,
    events: AtomicU64,
    commands: AtomicU64,
}

impl LinkBinding {
    pub fn new(
        key: LinkKey,
        address: LinkAddress,
        role: LinkRole,
        prio: f32,
        rate: f32,
        identity: Identity,
        config: &LinkConfig,
    ) -> Self {
        Self {
            key,
            address,
            prio,
            rate,
            machine: Mutex::new(LinkMachine::new(role, config)),
            identity: ArcSwap::from_pointee(identity),
            events: AtomicU64::new(0),
            commands: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> LinkKey {
        self.key
    }

    pub fn address(&self) -> &LinkAddress {
        &self.address
    }

    pub fn prio(&self) -> f32 {
        self.prio
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn role(&self) -> LinkRole {
        self.machine().role()
    }

    pub fn state(&self) -> LinkState {
        self.machine().state()
    }

    pub fn is_linked(&self) -> bool {
        self.state().is_linked()
    }

    pub fn is_synced(&self) -> bool {
        self.state() == LinkState::Synced
    }

    pub fn is_closed(&self) -> bool {
        self.state() == LinkState::Closed
    }

    pub fn sync_requested(&self) -> bool {
        self.machine().sync_requested()
    }

    pub fn identity(&self) -> Arc<Identity> {
        self.identity.load_full()
    }

    /// Replaces the identity; auth does not touch the link state
    pub fn set_identity(&self, identity: Identity) {
        self.identity.store(Arc::new(identity));
    }

    pub fn violations(&self) -> u64 {
        self.machine().violations()
    }

    /// Validates an outbound envelope against the link state
    pub fn send(&self, tag: EnvelopeTag, now: Instant) -> Result<LinkTransition, LinkError> {
        let result = self.machine().send(tag, now);
        if result.is_ok() {
            self.count(tag);
        }
        result
    }

    /// Validates an inbound envelope against the link state. Violations are
    /// logged here and returned so callers can count & discard.
    pub fn receive(&self, tag: EnvelopeTag, now: Instant) -> Result<LinkTransition, LinkError> {
        let result = self.machine().receive(tag, now);
        match &result {
            Ok(LinkTransition::Pass) => self.count(tag),
            Ok(_) => {}
            Err(err) => warn!("{} {}: discarding envelope: {}", self.key, self.address, err),
        }
        result
    }

    /// Counts an inbound envelope the caller drops as stale, without
    /// logging it
    pub fn discard(&self, tag: EnvelopeTag) -> LinkError {
        self.machine().discard(Direction::Inbound, tag)
    }

    pub fn disconnect(&self) -> LinkTransition {
        self.machine().disconnect()
    }

    pub fn force_close(&self) -> LinkTransition {
        self.machine().force_close()
    }

    pub fn poll_timeout(&self, now: Instant) -> Option<LinkError> {
        self.machine().poll_timeout(now)
    }

    pub fn report(&self) -> LinkReport {
        LinkReport {
            key: self.key,
            address: self.address.clone(),
            events: self.events.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            violations: self.violations(),
        }
    }

    fn count(&self, tag: EnvelopeTag) {
        match tag {
            EnvelopeTag::Event => {
                self.events.fetch_add(1, Ordering::Relaxed);
            }
            EnvelopeTag::Command => {
                self.commands.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn machine(&self) -> MutexGuard<'_, LinkMachine> {
        // a panic while holding the lock cannot leave the machine half-updated
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for LinkBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkBinding")
            .field("key", &self.key)
            .field("address", &self.address)
            .field("state", &self.state())
            .finish()
    }
}
