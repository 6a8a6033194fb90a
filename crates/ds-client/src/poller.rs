//! Long-running operation polling
//!
//! Answer and report generation are asynchronous server-side jobs. The
//! poller drives such a job to a terminal state: it re-checks the job at a
//! fixed interval until the server reports success or failure, or the
//! configured deadline elapses. Each poll goes through the transport and
//! therefore gets the same retry and re-authentication treatment as any
//! other call; only exhausted retries or the deadline end the wait.

use ds_core::{Error, Result};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Local state of a server-side job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
  /// Creation accepted, job not yet started
  Submitted,
  /// Job is being worked on
  Running,
  /// Terminal: result available
  Succeeded,
  /// Terminal: server reported failure
  Failed,
  /// Terminal: deadline elapsed before the server finished
  TimedOut,
}

impl OperationState {
  /// Whether no further transitions can occur
  pub fn is_terminal(&self) -> bool {
    matches!(self, OperationState::Succeeded | OperationState::Failed | OperationState::TimedOut)
  }
}

/// One poll's view of the job, as mapped from the server status
#[derive(Debug, Clone)]
pub enum PollStatus {
  /// Server reports the job queued (CREATED)
  Submitted,
  /// Server reports the job in flight (STARTED)
  Running,
  /// Terminal success with the result payload
  Succeeded(Value),
  /// Terminal failure with the server-reported reason
  Failed(String),
}

/// A server-side asynchronous job tracked by the client
#[derive(Debug, Clone)]
pub struct PendingOperation {
  /// Operation identifier returned by the creation call
  pub id: String,
  /// Current local state
  pub state: OperationState,
  /// Result payload, present once succeeded
  pub result: Option<Value>,
  /// Failure detail, present once failed
  pub error: Option<String>,
}

impl PendingOperation {
  fn new(id: impl Into<String>) -> Self {
    PendingOperation { id: id.into(), state: OperationState::Submitted, result: None, error: None }
  }
}

/// Drives a [`PendingOperation`] to a terminal state by repeated polling.
#[derive(Debug, Clone, Copy)]
pub struct OperationPoller {
  interval: Duration,
  deadline: Duration,
}

impl OperationPoller {
  /// Poller checking every `interval`, giving up after `deadline`
  pub fn new(interval: Duration, deadline: Duration) -> Self {
    OperationPoller { interval, deadline }
  }

  /// Poll `poll` until the job reaches a terminal state.
  ///
  /// Returns the operation with its result payload on success. A reported
  /// failure raises [`Error::OperationFailed`]; exceeding the deadline
  /// raises [`Error::OperationTimeout`].
  pub async fn wait_for_completion<F, Fut>(
    &self,
    operation_id: &str,
    mut poll: F,
  ) -> Result<PendingOperation>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus>>,
  {
    let started = Instant::now();
    let mut operation = PendingOperation::new(operation_id);

    while started.elapsed() < self.deadline {
      match poll().await? {
        PollStatus::Submitted => {
          operation.state = OperationState::Submitted;
          debug!(id = %operation.id, "operation still queued");
        }
        PollStatus::Running => {
          operation.state = OperationState::Running;
          debug!(id = %operation.id, "operation running");
        }
        PollStatus::Succeeded(result) => {
          operation.state = OperationState::Succeeded;
          operation.result = Some(result);
          return Ok(operation);
        }
        PollStatus::Failed(reason) => {
          operation.state = OperationState::Failed;
          operation.error = Some(reason.clone());
          warn!(id = %operation.id, "operation failed: {reason}");
          return Err(Error::OperationFailed { id: operation.id, reason });
        }
      }
      sleep(self.interval).await;
    }

    operation.state = OperationState::TimedOut;
    warn!(id = %operation.id, "operation timed out after {:?}", self.deadline);
    Err(Error::OperationTimeout {
      id: operation.id,
      deadline_secs: self.deadline.as_secs(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::atomic::{AtomicU32, Ordering};

  fn poller() -> OperationPoller {
    OperationPoller::new(Duration::from_millis(10), Duration::from_secs(5))
  }

  #[tokio::test]
  async fn test_succeeds_after_three_polls() {
    let polls = AtomicU32::new(0);

    let operation = poller()
      .wait_for_completion("op-1", || async {
        Ok(match polls.fetch_add(1, Ordering::SeqCst) {
          0 | 1 => PollStatus::Running,
          _ => PollStatus::Succeeded(json!({"value": 42})),
        })
      })
      .await
      .unwrap();

    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert_eq!(operation.state, OperationState::Succeeded);
    assert_eq!(operation.result, Some(json!({"value": 42})));
  }

  #[tokio::test]
  async fn test_failure_carries_server_reason() {
    let err = poller()
      .wait_for_completion("op-1", || async {
        Ok(PollStatus::Failed("no sources found".to_string()))
      })
      .await
      .unwrap_err();

    match err {
      Error::OperationFailed { id, reason } => {
        assert_eq!(id, "op-1");
        assert_eq!(reason, "no sources found");
      }
      other => panic!("expected OperationFailed, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_deadline_raises_timeout_not_service_error() {
    let poller = OperationPoller::new(Duration::from_millis(5), Duration::from_millis(30));

    let err = poller
      .wait_for_completion("op-1", || async { Ok(PollStatus::Running) })
      .await
      .unwrap_err();

    assert!(matches!(err, Error::OperationTimeout { .. }));
  }

  #[tokio::test]
  async fn test_transient_poll_error_propagates() {
    // a poll whose retries are exhausted ends the wait with that error
    let err = poller()
      .wait_for_completion("op-1", || async {
        Err(Error::Service { status: 503, message: "down".to_string() })
      })
      .await
      .unwrap_err();

    assert!(matches!(err, Error::Service { status: 503, .. }));
  }

  #[test]
  fn test_terminal_states() {
    assert!(OperationState::Succeeded.is_terminal());
    assert!(OperationState::Failed.is_terminal());
    assert!(OperationState::TimedOut.is_terminal());
    assert!(!OperationState::Submitted.is_terminal());
    assert!(!OperationState::Running.is_terminal());
  }
}
