//! Sliding-window rate limiter
//!
//! Enforces the per-operation-class request quotas client-side, before a
//! request is ever sent. Each class keeps its own window of admission
//! timestamps behind its own mutex, so unrelated classes never contend.
//! Server-side 429 handling lives in the transport and is a separate
//! concern; both surface as [`Error::RateLimit`].

use ds_core::{Error, OperationClass, RateLimits, RateQuota, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug)]
struct Window {
  quota: RateQuota,
  stamps: VecDeque<Instant>,
}

impl Window {
  fn new(quota: RateQuota) -> Self {
    Window { quota, stamps: VecDeque::with_capacity(quota.max_calls as usize) }
  }

  /// Atomic check-and-record. On rejection returns the wait until the
  /// oldest stamp leaves the window.
  fn try_admit(&mut self, now: Instant) -> std::result::Result<(), Duration> {
    let window = Duration::from_secs(self.quota.window_secs);

    // evict stale stamps lazily
    while let Some(front) = self.stamps.front() {
      if now.duration_since(*front) >= window {
        self.stamps.pop_front();
      } else {
        break;
      }
    }

    if (self.stamps.len() as u32) < self.quota.max_calls {
      self.stamps.push_back(now);
      Ok(())
    } else {
      // the slot frees up when the oldest stamp ages out
      let oldest = *self.stamps.front().expect("window is at capacity");
      Err(window - now.duration_since(oldest))
    }
  }
}

/// Per-operation-class sliding-window rate limiter.
///
/// In blocking mode `acquire` sleeps until the quota frees up; in
/// fail-fast mode it returns [`Error::RateLimit`] with the computed
/// `retry_after` immediately.
#[derive(Debug)]
pub struct RateLimiter {
  windows: HashMap<OperationClass, Mutex<Window>>,
  fail_fast: bool,
}

impl RateLimiter {
  /// Build a limiter for all operation classes
  pub fn new(limits: RateLimits, fail_fast: bool) -> Self {
    let classes = [
      OperationClass::Read,
      OperationClass::Write,
      OperationClass::AnswerCreate,
      OperationClass::ReportCreate,
    ];
    let windows = classes
      .into_iter()
      .map(|class| (class, Mutex::new(Window::new(limits.quota(class)))))
      .collect();
    RateLimiter { windows, fail_fast }
  }

  /// Admit one call of the given class, waiting or failing per mode.
  pub async fn acquire(&self, class: OperationClass) -> Result<()> {
    loop {
      match self.try_acquire(class) {
        Ok(()) => return Ok(()),
        Err(err) if self.fail_fast => return Err(err),
        Err(err) => {
          let wait = err.retry_after().unwrap_or(Duration::from_secs(1));
          debug!(%class, wait_ms = wait.as_millis() as u64, "rate window full, waiting");
          sleep(wait).await;
        }
      }
    }
  }

  /// Admit one call without waiting.
  pub fn try_acquire(&self, class: OperationClass) -> Result<()> {
    let window = self
      .windows
      .get(&class)
      .ok_or_else(|| Error::Config(format!("no rate window for class {class}")))?;

    let mut guard = window.lock().expect("rate window lock poisoned");
    guard.try_admit(Instant::now()).map_err(|retry_after| Error::RateLimit {
      retry_after: Some(retry_after),
      message: format!(
        "{class} quota of {} calls per {}s exhausted",
        guard.quota.max_calls, guard.quota.window_secs
      ),
    })
  }
}
