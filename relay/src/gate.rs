use crate::message::Message;
use crate::queue::{Offer, RelayQueue};
use log::*;
use std::sync::Arc;
use std::time::Duration;

/// Default grace period a producer waits for room before being told to back off.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Result reported back to a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Success,
    Busy,
}

/// Producer-facing entry point into the relay queue.
///
/// Each submission is a single offer under a fixed timeout. There are no
/// retries here; a `Busy` producer decides for itself whether to try again.
#[derive(Clone)]
pub struct SubmissionGate {
    queue: Arc<RelayQueue>,
    timeout: Duration,
}

impl SubmissionGate {
    pub fn new(queue: Arc<RelayQueue>, timeout: Duration) -> Self {
        Self { queue, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn submit(&self, message: Message) -> Submission {
        let text = message.to_string();

        match self.queue.offer(message, self.timeout).await {
            Offer::Accepted => {
                info!("Webhook received and message queued for relay: {text}");
                Submission::Success
            }
            Offer::TimedOut => {
                warn!(
                    "Webhook message for '{text}' timed out after {:?} waiting for queue space",
                    self.timeout
                );
                Submission::Busy
            }
        }
    }
}
