use smol::channel::{self, Receiver, Sender, TryRecvError};

use super::{PacketReceiver, PacketSender, RecvError, SendError};

/// An in-memory, unbounded, ordered connection between two endpoints
pub struct LocalTransport;

impl LocalTransport {
    /// Returns both ends of a connection: what `a` sends, `b` receives and
    /// the other way around
    pub fn pair() -> (
        (LocalPacketSender, LocalPacketReceiver),
        (LocalPacketSender, LocalPacketReceiver),
    ) {
        let (a_sender, b_receiver) = channel::unbounded();
        let (b_sender, a_receiver) = channel::unbounded();
        (
            (LocalPacketSender::new(a_sender), LocalPacketReceiver::new(a_receiver)),
            (LocalPacketSender::new(b_sender), LocalPacketReceiver::new(b_receiver)),
        )
    }
}

#[derive(Clone)]
pub struct LocalPacketSender {
    sender: Sender<Box<[u8]>>,
}

impl LocalPacketSender {
    fn new(sender: Sender<Box<[u8]>>) -> Self {
        Self { sender }
    }

    /// Stops the connection; the other end observes `RecvError` once drained
    pub fn close(&self) {
        self.sender.close();
    }
}

impl PacketSender for LocalPacketSender {
    fn send(&self, payload: &[u8]) -> Result<(), SendError> {
        self.sender.try_send(payload.into()).map_err(|_| SendError)
    }
}

pub struct LocalPacketReceiver {
    receiver: Receiver<Box<[u8]>>,
    current_payload: Option<Box<[u8]>>,
}

impl LocalPacketReceiver {
    fn new(receiver: Receiver<Box<[u8]>>) -> Self {
        Self {
            receiver,
            current_payload: None,
        }
    }
}

impl PacketReceiver for LocalPacketReceiver {
    fn receive(&mut self) -> Result<Option<&[u8]>, RecvError> {
        match self.receiver.try_recv() {
            Ok(payload) => {
                self.current_payload = Some(payload);
                Ok(self.current_payload.as_deref())
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(RecvError),
        }
    }
}
