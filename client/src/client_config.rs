use std::default::Default;

use weft_shared::{LinkConfig, PushConfig};

/// Contains Config properties which will be used by a Client
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    /// Timeouts of the links this client opens
    pub link: LinkConfig,
    /// Bounds & fairness of the outbox toward the host
    pub push: PushConfig,
}

/// How a link is opened
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LinkOptions {
    /// Whether the lane replays its state before streaming changes
    pub sync: bool,
    pub prio: f32,
    pub rate: f32,
}

impl LinkOptions {
    pub fn link() -> Self {
        Self::default()
    }

    pub fn sync() -> Self {
        Self {
            sync: true,
            ..Self::default()
        }
    }

    pub fn with_prio(mut self, prio: f32) -> Self {
        self.prio = prio;
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }
}
