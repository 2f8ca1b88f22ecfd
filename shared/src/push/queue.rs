//! A bounded outbox ordered by priority with aging.
//!
//! Each accepted push gets a virtual deadline `seq - prio / aging_per_push`,
//! where `seq` counts submissions. The outbox pops the smallest deadline
//! first and breaks ties by submission order. In effect every pending push
//! gains `aging_per_push` priority for each push submitted after it, so a
//! push of priority `p` waits behind at most the pushes submitted before it
//! plus those of priority `q` submitted fewer than `(q - p) / aging_per_push`
//! submissions later. Equal priorities are served FIFO.

use std::{cmp::Ordering, collections::BinaryHeap};

use log::debug;

use crate::{push::error::DeclineReason, Envelope, PushConfig, PushRequest};

struct Queued {
    deadline: f64,
    seq: u64,
    envelope: Envelope,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // BinaryHeap is a max-heap; the earliest deadline must compare greatest
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .total_cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct PushQueue {
    heap: BinaryHeap<Queued>,
    next_seq: u64,
    capacity: usize,
    aging_per_push: f64,
    closed: bool,
}

impl PushQueue {
    pub fn new(config: &PushConfig) -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            capacity: config.outbox_capacity.max(1),
            aging_per_push: f64::from(config.aging_per_push).max(f64::MIN_POSITIVE),
            closed: false,
        }
    }

    /// Enqueues the request's envelope and delivers the request, or declines
    /// it if the outbox is closed or full. Never retries.
    pub fn offer(&mut self, request: PushRequest) -> Result<(), DeclineReason> {
        if !self.closed && self.heap.len() >= self.capacity {
            let reason = DeclineReason::Backpressure {
                capacity: self.capacity,
            };
            debug!(
                "outbox full, declining `{}` to {}",
                request.envelope().tag(),
                request.node_uri()
            );
            request.decline(reason.clone());
            return Err(reason);
        }
        self.enqueue(request)
    }

    /// Enqueues the final `unlinked` of a link even when the outbox is full.
    /// A link sends at most one, so the overflow is bounded by the number
    /// of links sharing the outbox. Declines only once the outbox is closed.
    pub fn offer_terminal(&mut self, request: PushRequest) -> Result<(), DeclineReason> {
        if self.heap.len() >= self.capacity {
            debug!(
                "outbox full, admitting final `{}` to {}",
                request.envelope().tag(),
                request.node_uri()
            );
        }
        self.enqueue(request)
    }

    fn enqueue(&mut self, request: PushRequest) -> Result<(), DeclineReason> {
        if self.closed {
            request.decline(DeclineReason::Closed);
            return Err(DeclineReason::Closed);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let deadline = seq as f64 - f64::from(request.prio()) / self.aging_per_push;
        let envelope = request.deliver();
        self.heap.push(Queued {
            deadline,
            seq,
            envelope,
        });
        Ok(())
    }

    /// Takes the next envelope to transmit
    pub fn pop(&mut self) -> Option<Envelope> {
        self.heap.pop().map(|queued| queued.envelope)
    }

    /// Takes every pending envelope in transmission order
    pub fn drain(&mut self) -> Vec<Envelope> {
        let mut envelopes = Vec::with_capacity(self.heap.len());
        while let Some(envelope) = self.pop() {
            envelopes.push(envelope);
        }
        envelopes
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Declines every later offer and discards pending envelopes, returning
    /// how many were discarded
    pub fn close(&mut self) -> usize {
        self.closed = true;
        let discarded = self.heap.len();
        self.heap.clear();
        discarded
    }
}
