use config::Config;
use log::info;
use relay::error::Error as RelayError;
use relay::{RelayQueue, SessionRegistry, SubmissionGate};
use std::sync::Arc;

pub mod config;
pub mod logging;

/// Builds the single relay queue shared by every producer and consumer.
pub fn init_relay_queue(config: &Config) -> Result<RelayQueue, RelayError> {
    info!(
        "Relay queue config: capacity={}, submit_timeout={}s",
        config.queue_capacity, config.submit_timeout_secs,
    );

    RelayQueue::new(config.queue_capacity)
}

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub relay_queue: Arc<RelayQueue>,
    pub submission_gate: SubmissionGate,
    pub sessions: Arc<SessionRegistry>,
    pub config: Config,
}

impl AppState {
    pub fn new(app_config: Config, relay_queue: &Arc<RelayQueue>) -> Self {
        Self {
            relay_queue: Arc::clone(relay_queue),
            submission_gate: SubmissionGate::new(
                Arc::clone(relay_queue),
                app_config.submit_timeout(),
            ),
            sessions: Arc::new(SessionRegistry::new()),
            config: app_config,
        }
    }

    pub fn relay_queue_ref(&self) -> &Arc<RelayQueue> {
        &self.relay_queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn init_relay_queue_uses_configured_capacity() {
        let config = Config::try_parse_from(["webhook_relay", "--queue-capacity", "3"]).unwrap();
        let queue = init_relay_queue(&config).unwrap();
        assert_eq!(queue.capacity(), 3);
    }

    #[test]
    fn app_state_shares_one_queue_with_the_gate() {
        let config =
            Config::try_parse_from(["webhook_relay", "--submit-timeout-secs", "2"]).unwrap();
        let queue = Arc::new(init_relay_queue(&config).unwrap());
        let app_state = AppState::new(config, &queue);

        assert!(Arc::ptr_eq(app_state.relay_queue_ref(), &queue));
        assert_eq!(app_state.submission_gate.timeout(), Duration::from_secs(2));
        assert!(app_state.sessions.is_empty());
    }
}
