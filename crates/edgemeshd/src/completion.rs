//! Application-completion signalling.
//!
//! Triggering the demo microservice chain and waiting a fixed duration
//! before looking at the result conflates "has the application finished"
//! with the Controller's own cycle timing, so here it is a trait boundary
//! instead: a round only waits on `AppCompletionSignal`, never on a
//! hardcoded sleep.

use std::time::Duration;

use tracing::debug;

use edgemesh_agent::AgentClient;

/// Something the Controller can await after handing off an invocation path,
/// to know when (or whether) the triggered application run has produced a
/// result.
#[async_trait::async_trait]
pub trait AppCompletionSignal: Send + Sync {
    /// Block (asynchronously) until the application run this round has
    /// completed, or the bounded timeout elapses. Returns the final result
    /// value if one was observed.
    async fn await_completion(&self) -> Option<serde_json::Value>;
}

/// Polls one node's `/get_app_results` with linear backoff up to a bound,
/// rather than sleeping a fixed duration and hoping.
pub struct PollingCompletionSignal {
    client: AgentClient,
    poll_interval: Duration,
    timeout: Duration,
}

impl PollingCompletionSignal {
    pub fn new(client: AgentClient, poll_interval: Duration, timeout: Duration) -> Self {
        Self { client, poll_interval, timeout }
    }
}

#[async_trait::async_trait]
impl AppCompletionSignal for PollingCompletionSignal {
    async fn await_completion(&self) -> Option<serde_json::Value> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            match self.client.get_app_results().await {
                Ok(value) if !value.is_null() => return Some(value),
                Ok(_) => debug!("app results not yet available"),
                Err(e) => debug!(error = %e, "app results poll failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn times_out_against_an_unreachable_agent() {
        let client = AgentClient::new("http://127.0.0.1:1", Duration::from_millis(50));
        let signal = PollingCompletionSignal::new(client, Duration::from_millis(10), Duration::from_millis(60));
        assert!(signal.await_completion().await.is_none());
    }
}
