//! # Scopes – lock-free link registries
//!
//! A [`Scope`] holds the links attached to one cell (host, node, lane, or a
//! connection / client acting as one). Its membership is a single
//! [`LinkSet`] snapshot published through an `ArcSwap` slot:
//!
//! * Readers load the current snapshot and iterate it freely; they never see
//!   a half-applied update.
//! * Writers derive a new snapshot from the one they loaded and publish it
//!   with compare-and-swap. A failed CAS means another writer won; the loser
//!   retries from the newer snapshot, so no concurrent insert or removal is
//!   lost.
//! * [`Scope::close`] raises the closed flag *before* swapping in the empty
//!   set. Inserts check the flag after loading the snapshot they will CAS
//!   against, so an insert either lands in the snapshot `close` captures (and
//!   is closed with it) or observes the flag and closes its own link.
//!
//! Registry updates never wait on payload delivery: pushes travel through
//! the scope's [`CellContext`] and resolve independently.

mod error;
mod link_set;

pub use error::ScopeError;
pub use link_set::LinkSet;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use arc_swap::{ArcSwap, Guard};
use log::{debug, trace};

use crate::{CellAddress, CellContext, DeclineReason, LinkKey, LinkReport, PushRequest};

/// A link that can be registered in a [`Scope`]
pub trait Link: Send + Sync + 'static {
    fn key(&self) -> LinkKey;

    /// Invoked by [`Scope::open_downlink`] once the link is published
    fn open(&self) {}

    /// Drives the link to `Closed` without waiting for its peer
    fn force_close(&self);
}

pub struct Scope<L: Link> {
    address: CellAddress,
    links: ArcSwap<LinkSet<L>>,
    closed: AtomicBool,
    context: Option<Arc<dyn CellContext>>,
}

impl<L: Link> Scope<L> {
    /// Creates the scope of a cell, whose pushes & reports go to `context`
    pub fn new(address: CellAddress, context: Option<Arc<dyn CellContext>>) -> Self {
        Self {
            address,
            links: ArcSwap::from_pointee(LinkSet::empty()),
            closed: AtomicBool::new(false),
            context,
        }
    }

    pub fn address(&self) -> &CellAddress {
        &self.address
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The current membership snapshot
    pub fn snapshot(&self) -> Arc<LinkSet<L>> {
        self.links.load_full()
    }

    pub fn get(&self, key: &LinkKey) -> Option<Arc<L>> {
        self.links.load().get(key).cloned()
    }

    /// Returns the first link of the current snapshot matching `predicate`
    pub fn find<P: Fn(&L) -> bool>(&self, predicate: P) -> Option<Arc<L>> {
        self.links
            .load()
            .iter()
            .find(|link| predicate(link.as_ref()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.links.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.load().is_empty()
    }

    /// Publishes `link` and invokes its [`Link::open`] hook. If the scope is
    /// already closed the link is force-closed instead.
    pub fn open_downlink(&self, link: Arc<L>) -> Result<(), ScopeError> {
        self.open_downlink_unless(link, |_| false)
    }

    /// Like [`Scope::open_downlink`], but fails with
    /// [`ScopeError::Conflict`] if a registered link matches `conflicts`.
    /// The check runs against the very snapshot the insert is published
    /// over, so two racing inserts cannot both pass it.
    pub fn open_downlink_unless<C: Fn(&L) -> bool>(
        &self,
        link: Arc<L>,
        conflicts: C,
    ) -> Result<(), ScopeError> {
        match self.bind_downlink_unless(Arc::clone(&link), conflicts) {
            Ok(()) => {
                link.open();
                Ok(())
            }
            Err(err @ ScopeError::Closed { .. }) => {
                link.force_close();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Publishes `link` without opening it
    pub fn bind_downlink(&self, link: Arc<L>) -> Result<(), ScopeError> {
        self.bind_downlink_unless(link, |_| false)
    }

    /// Publishes `link` without opening it, unless a registered link
    /// matches `conflicts`
    pub fn bind_downlink_unless<C: Fn(&L) -> bool>(
        &self,
        link: Arc<L>,
        conflicts: C,
    ) -> Result<(), ScopeError> {
        let key = link.key();
        let mut current = self.links.load_full();
        loop {
            if self.is_closed() {
                return Err(ScopeError::Closed {
                    cell: self.address.to_string(),
                });
            }
            if current.contains(&key) {
                return Err(ScopeError::Duplicate { key });
            }
            if let Some(existing) = current.iter().find(|other| conflicts(other.as_ref())) {
                return Err(ScopeError::Conflict {
                    key,
                    existing: existing.key(),
                });
            }
            let next = Arc::new(current.with(key, Arc::clone(&link)));
            let previous = self.links.compare_and_swap(&current, next);
            if Arc::ptr_eq(&current, &previous) {
                trace!("{}: bound {}", self.address, key);
                return Ok(());
            }
            current = Guard::into_inner(previous);
        }
    }

    /// Removes the link with `key`, returning it if it was registered
    pub fn close_downlink(&self, key: &LinkKey) -> Option<Arc<L>> {
        let mut current = self.links.load_full();
        loop {
            let link = Arc::clone(current.get(key)?);
            let next = Arc::new(current.without(key));
            let previous = self.links.compare_and_swap(&current, next);
            if Arc::ptr_eq(&current, &previous) {
                trace!("{}: unbound {}", self.address, key);
                return Some(link);
            }
            current = Guard::into_inner(previous);
        }
    }

    /// Closes the scope: clears the registry and force-closes every link of
    /// the cleared snapshot. Returns how many links were closed; closing
    /// again is a no-op.
    pub fn close(&self) -> usize {
        if self.closed.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let snapshot = self.links.swap(Arc::new(LinkSet::empty()));
        debug!("{}: closing {} links", self.address, snapshot.len());
        for link in snapshot.iter() {
            link.force_close();
        }
        snapshot.len()
    }

    /// Hands a push to the parent cell; a root scope has nowhere to send it
    pub fn push_down(&self, request: PushRequest) {
        match &self.context {
            Some(context) => context.push_down(request),
            None => request.decline(DeclineReason::UnknownDestination),
        }
    }

    pub fn report_down(&self, report: LinkReport) {
        if let Some(context) = &self.context {
            context.report_down(report);
        }
    }
}
