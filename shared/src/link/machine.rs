//! ## `LinkMachine` – the per-link protocol state machine
//!
//! One machine runs at each end of a link. Both ends share the same states;
//! what differs is who may originate which envelope:
//!
//! ```text
//!   subscriber (downlink) originates:  link, sync, command, unlink, unlinked
//!   lane       (uplink)   originates:  linked, synced, event, unlink, unlinked
//!
//!            link / sync                linked
//!   Closed ---------------> Linking ---------------> Linked ---synced---> Synced
//!     ^                       |                        |                    |
//!     |        unlinked       |                        |      unlink        |
//!     +-----------------------+                        +--------+-----------+
//!     |                                                         v
//!     +------------------------ unlinked ---------------- Unlinking
//! ```
//!
//! The machine validates envelopes in either direction through
//! [`LinkMachine::send`] and [`LinkMachine::receive`]. It performs no I/O;
//! callers emit the answers a transition calls for (e.g. `unlinked` after an
//! inbound `unlink`).
//!
//! Once a machine has been opened and closed again it is spent: a new link
//! requires a new machine.

use std::time::Instant;

use log::trace;

use crate::{
    link::{
        error::{LinkError, ProtocolViolation},
        state::{CloseCause, Direction, LinkRole, LinkState},
    },
    EnvelopeTag, LinkConfig,
};

/// The outcome of feeding one envelope through a [`LinkMachine`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LinkTransition {
    /// The state moved, and the link stays open
    Changed { from: LinkState, to: LinkState },
    /// The link reached `Closed`
    Closed { from: LinkState, cause: CloseCause },
    /// The envelope flows without a state change
    Pass,
    /// The envelope is stale or redundant and must be dropped silently
    Ignored,
}

pub struct LinkMachine {
    role: LinkRole,
    state: LinkState,
    sync_requested: bool,
    spent: bool,
    deadline: Option<Instant>,
    config: LinkConfig,
    violations: u64,
}

impl LinkMachine {
    pub fn new(role: LinkRole, config: &LinkConfig) -> Self {
        Self {
            role,
            state: LinkState::Closed,
            sync_requested: false,
            spent: false,
            deadline: None,
            config: config.clone(),
            violations: 0,
        }
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn sync_requested(&self) -> bool {
        self.sync_requested
    }

    pub fn violations(&self) -> u64 {
        self.violations
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Validates an envelope this end is about to send
    pub fn send(&mut self, tag: EnvelopeTag, now: Instant) -> Result<LinkTransition, LinkError> {
        self.apply(Direction::Outbound, tag, now)
    }

    /// Validates an envelope this end has received
    pub fn receive(&mut self, tag: EnvelopeTag, now: Instant) -> Result<LinkTransition, LinkError> {
        self.apply(Direction::Inbound, tag, now)
    }

    /// The connection carrying the link went away
    pub fn disconnect(&mut self) -> LinkTransition {
        self.close_with(CloseCause::Disconnected)
    }

    /// Closes without waiting for the peer
    pub fn force_close(&mut self) -> LinkTransition {
        self.close_with(CloseCause::Forced)
    }

    /// Counts an envelope the caller drops without feeding it through the
    /// machine, e.g. a lane event that crossed our `unlink`
    pub fn discard(&mut self, direction: Direction, tag: EnvelopeTag) -> LinkError {
        self.violation(direction, tag)
    }

    /// Forces `Closed` if a pending acknowledgement is overdue
    pub fn poll_timeout(&mut self, now: Instant) -> Option<LinkError> {
        let deadline = self.deadline?;
        if !self.state.is_pending() || now < deadline {
            return None;
        }
        let state = self.state;
        self.close_with(CloseCause::TimedOut);
        Some(LinkError::Timeout { state })
    }

    fn apply(
        &mut self,
        direction: Direction,
        tag: EnvelopeTag,
        now: Instant,
    ) -> Result<LinkTransition, LinkError> {
        // auth envelopes are orthogonal to the link lifecycle
        if tag.is_host_addressed() {
            return Ok(LinkTransition::Pass);
        }

        let origin = match direction {
            Direction::Outbound => self.role,
            Direction::Inbound => self.role.invert(),
        };
        if !originates(origin, tag) {
            return Err(self.violation(direction, tag));
        }

        let state = self.state;
        let transition = match (tag, state) {
            (EnvelopeTag::Link | EnvelopeTag::Sync, LinkState::Closed) if !self.spent => {
                self.sync_requested = tag == EnvelopeTag::Sync;
                self.deadline = Some(now + self.config.linking_timeout);
                self.move_to(LinkState::Linking)
            }

            (EnvelopeTag::Linked, LinkState::Linking) => {
                self.deadline = None;
                self.move_to(LinkState::Linked)
            }
            // unlink raced the link request; the link never becomes visible
            (EnvelopeTag::Linked | EnvelopeTag::Synced, LinkState::Unlinking) => LinkTransition::Ignored,

            (EnvelopeTag::Synced, LinkState::Linked) if self.sync_requested => {
                self.move_to(LinkState::Synced)
            }

            (EnvelopeTag::Event | EnvelopeTag::Command, LinkState::Linked | LinkState::Synced) => {
                LinkTransition::Pass
            }

            (EnvelopeTag::Unlink, LinkState::Linking | LinkState::Linked | LinkState::Synced) => {
                match direction {
                    Direction::Outbound => {
                        self.deadline = Some(now + self.config.unlinking_timeout);
                        self.move_to(LinkState::Unlinking)
                    }
                    Direction::Inbound => self.close_with(CloseCause::RemoteUnlinked),
                }
            }
            (EnvelopeTag::Unlink, LinkState::Unlinking) => match direction {
                Direction::Outbound => LinkTransition::Ignored,
                // both ends unlinked at once
                Direction::Inbound => self.close_with(CloseCause::Unlinked),
            },
            (EnvelopeTag::Unlink, LinkState::Closed) => LinkTransition::Ignored,

            (EnvelopeTag::Unlinked, LinkState::Linking) => self.close_with(CloseCause::Declined),
            (EnvelopeTag::Unlinked, LinkState::Unlinking) => match direction {
                Direction::Inbound => self.close_with(CloseCause::Unlinked),
                Direction::Outbound => self.close_with(CloseCause::Forced),
            },
            (EnvelopeTag::Unlinked, LinkState::Linked | LinkState::Synced) => match direction {
                Direction::Inbound => self.close_with(CloseCause::RemoteUnlinked),
                Direction::Outbound => self.close_with(CloseCause::Forced),
            },
            (EnvelopeTag::Unlinked, LinkState::Closed) => LinkTransition::Ignored,

            _ => return Err(self.violation(direction, tag)),
        };

        trace!(
            "{:?} {:?} `{}` in {}: {:?}",
            self.role,
            direction,
            tag,
            state,
            transition
        );
        Ok(transition)
    }

    fn move_to(&mut self, to: LinkState) -> LinkTransition {
        let from = self.state;
        self.state = to;
        LinkTransition::Changed { from, to }
    }

    fn close_with(&mut self, cause: CloseCause) -> LinkTransition {
        let from = self.state;
        if from == LinkState::Closed {
            return LinkTransition::Ignored;
        }
        self.state = LinkState::Closed;
        self.deadline = None;
        self.spent = true;
        LinkTransition::Closed { from, cause }
    }

    fn violation(&mut self, direction: Direction, tag: EnvelopeTag) -> LinkError {
        self.violations += 1;
        LinkError::ProtocolViolation(ProtocolViolation {
            role: self.role,
            state: self.state,
            direction,
            tag,
        })
    }
}

fn originates(origin: LinkRole, tag: EnvelopeTag) -> bool {
    match tag {
        EnvelopeTag::Link | EnvelopeTag::Sync | EnvelopeTag::Command => origin == LinkRole::Downlink,
        EnvelopeTag::Linked | EnvelopeTag::Synced | EnvelopeTag::Event => origin == LinkRole::Uplink,
        EnvelopeTag::Unlink | EnvelopeTag::Unlinked => true,
        EnvelopeTag::Auth | EnvelopeTag::Authed | EnvelopeTag::Deauth | EnvelopeTag::Deauthed => true,
    }
}
