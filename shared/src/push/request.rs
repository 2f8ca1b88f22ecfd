use smol::channel::{self, Receiver, Sender};

use crate::{
    push::error::{DeclineReason, DeliveryDeclined},
    Envelope, Identity, Uri,
};

/// How a [`PushRequest`] was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The envelope reached its destination queue
    Delivered,
    /// The destination rejected or could not accept the envelope
    Declined(DeclineReason),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }

    pub fn into_result(self) -> Result<(), DeliveryDeclined> {
        match self {
            DeliveryOutcome::Delivered => Ok(()),
            DeliveryOutcome::Declined(reason) => Err(DeliveryDeclined { reason }),
        }
    }
}

/// Sends the outcome exactly once. Dropping an unresolved completion
/// declines the request.
struct Completion {
    sender: Option<Sender<DeliveryOutcome>>,
}

impl Completion {
    fn resolve(&mut self, outcome: DeliveryOutcome) {
        if let Some(sender) = self.sender.take() {
            // the receipt may have been dropped, nobody is listening then
            let _ = sender.try_send(outcome);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.resolve(DeliveryOutcome::Declined(DeclineReason::Dropped));
    }
}

/// A single envelope in flight toward one destination.
///
/// A request is consumed by exactly one of [`PushRequest::deliver`] or
/// [`PushRequest::decline`]; its [`PushReceipt`] observes that outcome.
pub struct PushRequest {
    mesh_uri: Uri,
    host_uri: Uri,
    envelope: Envelope,
    prio: f32,
    identity: Option<Identity>,
    completion: Completion,
}

impl PushRequest {
    pub fn new(
        mesh_uri: Uri,
        host_uri: Uri,
        envelope: Envelope,
        prio: f32,
        identity: Option<Identity>,
    ) -> (Self, PushReceipt) {
        let (sender, receiver) = channel::bounded(1);
        let request = Self {
            mesh_uri,
            host_uri,
            envelope,
            prio: if prio.is_finite() { prio } else { 0.0 },
            identity,
            completion: Completion {
                sender: Some(sender),
            },
        };
        (request, PushReceipt::new(receiver))
    }

    pub fn mesh_uri(&self) -> &Uri {
        &self.mesh_uri
    }

    pub fn host_uri(&self) -> &Uri {
        &self.host_uri
    }

    pub fn node_uri(&self) -> &Uri {
        self.envelope.node_uri()
    }

    pub fn lane_uri(&self) -> &Uri {
        self.envelope.lane_uri()
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn prio(&self) -> f32 {
        self.prio
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Marks the envelope as delivered and hands it to the destination
    pub fn deliver(mut self) -> Envelope {
        self.completion.resolve(DeliveryOutcome::Delivered);
        self.envelope
    }

    /// Marks the envelope as declined; it is dropped
    pub fn decline(mut self, reason: DeclineReason) {
        self.completion.resolve(DeliveryOutcome::Declined(reason));
    }
}

/// Observes the outcome of a [`PushRequest`], possibly from another thread
pub struct PushReceipt {
    receiver: Receiver<DeliveryOutcome>,
    outcome: Option<DeliveryOutcome>,
}

impl PushReceipt {
    fn new(receiver: Receiver<DeliveryOutcome>) -> Self {
        Self {
            receiver,
            outcome: None,
        }
    }

    /// Returns the outcome if the request has been resolved
    pub fn try_outcome(&mut self) -> Option<DeliveryOutcome> {
        if self.outcome.is_none() {
            self.outcome = self.receiver.try_recv().ok();
        }
        self.outcome.clone()
    }

    /// Blocks the current thread until the request is resolved
    pub fn wait(mut self) -> DeliveryOutcome {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        self.receiver
            .recv_blocking()
            .unwrap_or(DeliveryOutcome::Declined(DeclineReason::Dropped))
    }

    /// Waits asynchronously until the request is resolved
    pub async fn outcome(mut self) -> DeliveryOutcome {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        self.receiver
            .recv()
            .await
            .unwrap_or(DeliveryOutcome::Declined(DeclineReason::Dropped))
    }
}
