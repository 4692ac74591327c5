//! Ingestion waiter: poll a job until it is ready, failed, or out of time
//!
//! ```text
//! POLLING ──ready/completed/done/success──▶ READY
//!    │ ╰────────failed/error──────────────▶ FAILED    (payload attached)
//!    ╰──────elapsed > timeout─────────────▶ TIMED_OUT
//! ```
//!
//! Polling uses a fixed interval. The timeout is checked after every
//! non-terminal poll, so an endlessly pending job always ends in TIMED_OUT.

use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::EvalError;
use crate::gateway::{IngestionStatus, SearchGateway};

const READY_STATES: &[&str] = &["ready", "completed", "done", "success"];
const FAILED_STATES: &[&str] = &["failed", "error"];

/// Classification of one status poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionState {
    Polling,
    Ready,
    Failed,
    TimedOut,
}

impl IngestionState {
    /// Map a raw state string (any case) onto the state machine
    pub fn classify(state: &str) -> Self {
        let state = state.to_lowercase();
        if READY_STATES.contains(&state.as_str()) {
            IngestionState::Ready
        } else if FAILED_STATES.contains(&state.as_str()) {
            IngestionState::Failed
        } else {
            IngestionState::Polling
        }
    }
}

pub struct IngestionWaiter<'a> {
    gateway: &'a dyn SearchGateway,
    clock: &'a dyn Clock,
    poll_interval: Duration,
    timeout: Duration,
}

impl<'a> IngestionWaiter<'a> {
    pub fn new(
        gateway: &'a dyn SearchGateway,
        clock: &'a dyn Clock,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            clock,
            poll_interval,
            timeout,
        }
    }

    /// Block until `job_id` is ready, returning its final status
    ///
    /// Errors: [`EvalError::IngestionFailed`], [`EvalError::IngestionTimeout`],
    /// or the gateway error from a poll that exhausted its retries.
    pub fn wait_ready(&self, job_id: &str) -> Result<IngestionStatus> {
        let started = self.clock.now();
        let mut polls = 0u32;

        loop {
            let status = self.gateway.ingestion_get(job_id)?;
            polls += 1;
            let state = status.state();

            match IngestionState::classify(&state) {
                IngestionState::Ready => {
                    info!(job_id, polls, "ingestion job ready");
                    return Ok(status);
                }
                IngestionState::Failed => {
                    return Err(EvalError::IngestionFailed {
                        status: status.into_value(),
                    }
                    .into());
                }
                IngestionState::Polling | IngestionState::TimedOut => {}
            }

            let elapsed = self.clock.now().saturating_sub(started);
            if elapsed > self.timeout {
                debug!(job_id, ?elapsed, "ingestion wait exceeded timeout");
                return Err(EvalError::IngestionTimeout {
                    timeout: self.timeout,
                }
                .into());
            }

            debug!(job_id, state = %state, "ingestion still running");
            self.clock.sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::GatewayError;
    use crate::gateway::SearchRequest;
    use crate::models::Document;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    /// Gateway that replays a scripted sequence of ingestion states
    struct ScriptedJob {
        states: Mutex<Vec<Value>>,
        polls: Mutex<u32>,
    }

    impl ScriptedJob {
        fn new(states: Vec<Value>) -> Self {
            Self {
                states: Mutex::new(states),
                polls: Mutex::new(0),
            }
        }
    }

    impl SearchGateway for ScriptedJob {
        fn health(&self) -> Result<Value, GatewayError> {
            Ok(json!({}))
        }
        fn documents_batch(&self, _: &[Document]) -> Result<Value, GatewayError> {
            Ok(json!({}))
        }
        fn ingestion_start(&self) -> Result<Value, GatewayError> {
            Ok(json!({"id": "job-1"}))
        }
        fn ingestion_get(&self, _: &str) -> Result<IngestionStatus, GatewayError> {
            *self.polls.lock() += 1;
            let mut states = self.states.lock();
            let next = if states.len() > 1 {
                states.remove(0)
            } else {
                states[0].clone()
            };
            Ok(IngestionStatus(next))
        }
        fn search(&self, _: &SearchRequest) -> Result<Vec<String>, GatewayError> {
            Ok(vec![])
        }
    }

    fn waiter<'a>(job: &'a ScriptedJob, clock: &'a ManualClock, timeout_secs: u64) -> IngestionWaiter<'a> {
        IngestionWaiter::new(job, clock, Duration::from_secs(1), Duration::from_secs(timeout_secs))
    }

    #[test]
    fn test_classify() {
        assert_eq!(IngestionState::classify("READY"), IngestionState::Ready);
        assert_eq!(IngestionState::classify("completed"), IngestionState::Ready);
        assert_eq!(IngestionState::classify("Error"), IngestionState::Failed);
        assert_eq!(IngestionState::classify("running"), IngestionState::Polling);
        assert_eq!(IngestionState::classify(""), IngestionState::Polling);
    }

    #[test]
    fn test_ready_after_polling() {
        let job = ScriptedJob::new(vec![
            json!({"state": "queued"}),
            json!({"state": "running"}),
            json!({"state": "ready"}),
        ]);
        let clock = ManualClock::new();
        let status = waiter(&job, &clock, 60).wait_ready("job-1").unwrap();
        assert_eq!(status.state(), "ready");
        assert_eq!(*job.polls.lock(), 3);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1); 2]);
    }

    #[test]
    fn test_failed_carries_payload() {
        let job = ScriptedJob::new(vec![json!({"status": "failed", "reason": "bad doc"})]);
        let clock = ManualClock::new();
        let err = waiter(&job, &clock, 60).wait_ready("job-1").unwrap_err();
        match err.downcast_ref::<EvalError>() {
            Some(EvalError::IngestionFailed { status }) => {
                assert_eq!(status["reason"], json!("bad doc"));
            }
            other => panic!("expected IngestionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_wins_over_later_success() {
        // Ready would arrive on poll 10, but the timeout is 3s with 1s polling
        let mut states = vec![json!({"state": "running"}); 9];
        states.push(json!({"state": "ready"}));
        let job = ScriptedJob::new(states);
        let clock = ManualClock::new();

        let err = waiter(&job, &clock, 3).wait_ready("job-1").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EvalError>(),
            Some(EvalError::IngestionTimeout { .. })
        ));
        assert!(*job.polls.lock() < 10);
    }
}
