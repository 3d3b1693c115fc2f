//! Hand-off between the device I/O loop and the manager.

use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use crate::message::SensorMessage;

#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub device_name: String,
    pub message: SensorMessage,
}

#[derive(Debug, Error)]
#[error("message queue closed")]
pub struct QueueClosed;

/// Outcome of a bounded wait on the inbox.
#[derive(Debug)]
pub enum Received {
    Item(QueueItem),
    Empty,
    Closed,
}

/// Creates an unbounded FIFO queue.
pub fn message_queue() -> (MessagePoster, MessageInbox) {
    let (tx, rx) = flume::unbounded();
    (MessagePoster { tx }, MessageInbox { rx })
}

#[derive(Debug, Clone)]
pub struct MessagePoster {
    tx: Sender<QueueItem>,
}

impl MessagePoster {
    /// Hands `message` over to the consumer. Never blocks.
    pub fn post(&self, device_name: &str, message: SensorMessage) -> Result<(), QueueClosed> {
        self.tx
            .send(QueueItem {
                device_name: device_name.to_owned(),
                message,
            })
            .map_err(|_| QueueClosed)
    }
}

#[derive(Debug)]
pub struct MessageInbox {
    rx: Receiver<QueueItem>,
}

impl MessageInbox {
    pub fn poll(&self, timeout: Duration) -> Received {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Received::Item(item),
            Err(RecvTimeoutError::Timeout) => Received::Empty,
            Err(RecvTimeoutError::Disconnected) => Received::Closed,
        }
    }
}
