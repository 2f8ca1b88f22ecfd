use std::{fmt, str::FromStr};

use crate::DecodeError;

/// The protocol verb of an [`Envelope`](crate::Envelope)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EnvelopeTag {
    Event,
    Command,
    Link,
    Linked,
    Sync,
    Synced,
    Unlink,
    Unlinked,
    Auth,
    Authed,
    Deauth,
    Deauthed,
}

impl EnvelopeTag {
    pub const ALL: [EnvelopeTag; 12] = [
        EnvelopeTag::Event,
        EnvelopeTag::Command,
        EnvelopeTag::Link,
        EnvelopeTag::Linked,
        EnvelopeTag::Sync,
        EnvelopeTag::Synced,
        EnvelopeTag::Unlink,
        EnvelopeTag::Unlinked,
        EnvelopeTag::Auth,
        EnvelopeTag::Authed,
        EnvelopeTag::Deauth,
        EnvelopeTag::Deauthed,
    ];

    /// The wire name of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeTag::Event => "event",
            EnvelopeTag::Command => "command",
            EnvelopeTag::Link => "link",
            EnvelopeTag::Linked => "linked",
            EnvelopeTag::Sync => "sync",
            EnvelopeTag::Synced => "synced",
            EnvelopeTag::Unlink => "unlink",
            EnvelopeTag::Unlinked => "unlinked",
            EnvelopeTag::Auth => "auth",
            EnvelopeTag::Authed => "authed",
            EnvelopeTag::Deauth => "deauth",
            EnvelopeTag::Deauthed => "deauthed",
        }
    }

    /// Auth envelopes address the host, not a node or lane
    pub fn is_host_addressed(&self) -> bool {
        matches!(
            self,
            EnvelopeTag::Auth | EnvelopeTag::Authed | EnvelopeTag::Deauth | EnvelopeTag::Deauthed
        )
    }

    /// Link, sync & linked carry `prio` and `rate`
    pub fn carries_hints(&self) -> bool {
        matches!(self, EnvelopeTag::Link | EnvelopeTag::Linked | EnvelopeTag::Sync)
    }
}

impl fmt::Display for EnvelopeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvelopeTag {
    type Err = DecodeError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        EnvelopeTag::ALL
            .iter()
            .find(|known| known.as_str() == tag)
            .copied()
            .ok_or_else(|| DecodeError::UnknownTag {
                tag: tag.to_string(),
            })
    }
}
