use crate::error::Error;
use crate::message::Message;
use log::*;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Default number of pending messages the relay holds before producers wait.
pub const DEFAULT_CAPACITY: usize = 10;

/// Outcome of offering a message to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    TimedOut,
}

/// Bounded FIFO hand-off buffer shared by all producers and consumers.
///
/// Built on a bounded tokio channel. The single receiver sits behind an async
/// mutex so any number of consumers can compete for messages: whichever
/// consumer holds the lock when a message arrives gets it, and nobody else
/// ever sees it.
pub struct RelayQueue {
    sender: mpsc::Sender<Message>,
    receiver: Mutex<mpsc::Receiver<Message>>,
    capacity: usize,
}

impl RelayQueue {
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::invalid_capacity());
        }

        Ok(Self::with_capacity(capacity))
    }

    /// `capacity` must be non-zero; the channel constructor panics otherwise.
    fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);

        Self {
            sender,
            receiver: Mutex::new(receiver),
            capacity,
        }
    }

    /// Appends `message` to the tail of the queue, waiting up to `timeout`
    /// for room. A message that times out is dropped and leaves no trace in
    /// the queue.
    pub async fn offer(&self, message: Message, timeout: Duration) -> Offer {
        match tokio::time::timeout(timeout, self.sender.send(message)).await {
            Ok(Ok(())) => Offer::Accepted,
            Ok(Err(e)) => {
                // The queue owns its receiver, so this only happens mid-teardown.
                error!("Relay queue closed while offering message: {e}");
                Offer::TimedOut
            }
            Err(_) => Offer::TimedOut,
        }
    }

    /// Removes and returns the message at the head of the queue, waiting as
    /// long as it takes for one to arrive.
    ///
    /// Dropping the returned future before it resolves leaves the queue
    /// untouched, which is what lets a pump race this against cancellation.
    pub async fn take(&self) -> Message {
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Some(message) => message,
            // All senders gone can't happen while `self` is alive; park forever.
            None => std::future::pending().await,
        }
    }

    /// Number of messages currently waiting to be taken.
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RelayQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
