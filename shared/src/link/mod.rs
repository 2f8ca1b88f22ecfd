mod binding;
mod error;
mod machine;
mod state;

pub use binding::{LinkBinding, LinkKey, LinkKeyGenerator};
pub use error::{LinkDeclined, LinkError, ProtocolViolation};
pub use machine::{LinkMachine, LinkTransition};
pub use state::{CloseCause, Direction, LinkRole, LinkState};
