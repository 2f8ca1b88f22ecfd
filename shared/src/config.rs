use std::{default::Default, time::Duration};

use thiserror::Error;

/// Errors raised when validating configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// An outbox must be able to hold at least one envelope
    #[error("Outbox capacity must be greater than zero")]
    ZeroOutboxCapacity,

    /// Aging must be positive so that low priority pushes cannot starve
    #[error("Priority aging per push must be a positive finite number, got {aging}")]
    InvalidAging { aging: f32 },
}

/// Contains Config properties governing the link state machine
#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// How long a link may wait for `linked` (or a decline) after sending
    /// `link` or `sync`
    pub linking_timeout: Duration,
    /// How long a link may wait for `unlinked` after sending `unlink`
    pub unlinking_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            linking_timeout: Duration::from_secs(5),
            unlinking_timeout: Duration::from_secs(5),
        }
    }
}

/// Contains Config properties governing prioritized delivery
#[derive(Clone, Debug)]
pub struct PushConfig {
    /// Envelopes an outbox holds before it declines further pushes
    pub outbox_capacity: usize,
    /// Priority a pending push gains for every push submitted after it.
    /// A push of priority `p` can only be overtaken by a push of priority
    /// `q > p` submitted fewer than `(q - p) / aging_per_push` pushes later.
    pub aging_per_push: f32,
}

impl PushConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbox_capacity == 0 {
            return Err(ConfigError::ZeroOutboxCapacity);
        }
        if !self.aging_per_push.is_finite() || self.aging_per_push <= 0.0 {
            return Err(ConfigError::InvalidAging {
                aging: self.aging_per_push,
            });
        }
        Ok(())
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: 4096,
            aging_per_push: 0.1,
        }
    }
}
