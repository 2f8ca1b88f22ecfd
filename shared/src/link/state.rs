use std::fmt;

/// Protocol state of one end of a link
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Initial & terminal state
    Closed,
    /// `link` or `sync` sent, waiting for `linked`
    Linking,
    /// Events & commands flow in both directions
    Linked,
    /// Linked, and the lane has replayed a full snapshot followed by `synced`
    Synced,
    /// `unlink` sent, waiting for `unlinked`
    Unlinking,
}

impl LinkState {
    /// Whether events & commands may flow
    pub fn is_linked(&self) -> bool {
        matches!(self, LinkState::Linked | LinkState::Synced)
    }

    /// Whether the state waits on an acknowledgement from the peer
    pub fn is_pending(&self) -> bool {
        matches!(self, LinkState::Linking | LinkState::Unlinking)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Closed => "closed",
            LinkState::Linking => "linking",
            LinkState::Linked => "linked",
            LinkState::Synced => "synced",
            LinkState::Unlinking => "unlinking",
        };
        f.write_str(name)
    }
}

/// Which end of a link a state machine runs on
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LinkRole {
    /// Lane side: feeds one subscriber
    Uplink,
    /// Subscriber side: consumes from one lane
    Downlink,
}

impl LinkRole {
    pub fn invert(self) -> Self {
        match self {
            LinkRole::Uplink => LinkRole::Downlink,
            LinkRole::Downlink => LinkRole::Uplink,
        }
    }
}

/// Whether an envelope leaves or arrives at this end of the link
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Why a link reached `Closed`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CloseCause {
    /// The lane refused the `link`/`sync` request
    Declined,
    /// Our `unlink` was acknowledged
    Unlinked,
    /// The peer unlinked us
    RemoteUnlinked,
    /// The connection went away; no acknowledgement was awaited
    Disconnected,
    /// A `Linking`/`Unlinking` acknowledgement never arrived
    TimedOut,
    /// Closed locally without waiting for the peer, e.g. when the owning
    /// scope closes
    Forced,
}
