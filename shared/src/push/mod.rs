mod error;
mod queue;
mod request;

pub use error::{DeclineReason, DeliveryDeclined};
pub use queue::PushQueue;
pub use request::{DeliveryOutcome, PushReceipt, PushRequest};
