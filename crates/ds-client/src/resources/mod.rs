//! Resource wrappers over the platform endpoints
//!
//! Each resource struct bundles the transport with the shared rate limiter
//! and (where reads are cacheable) the response cache. Resources never talk
//! to the network themselves: every call admits through the limiter first,
//! then goes through the transport.

pub mod answers;
pub mod contentstore;
pub mod documents;
pub mod quota;
pub mod reports;

use crate::poller::PollStatus;
use ds_core::{Error, OperationClass, Result};
use ds_models::common::MinionJob;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Base trait for resource implementations
pub trait ResourceBase {
  /// Admit one call of the given class through the shared rate limiter
  async fn admit(&self, class: OperationClass) -> Result<()>;
}

/// Macro to implement the ResourceBase trait for resource structs
macro_rules! impl_resource_base {
  ($struct_name:ident) => {
    impl crate::resources::ResourceBase for $struct_name {
      async fn admit(&self, class: ds_core::OperationClass) -> ds_core::Result<()> {
        self.rate_limiter.acquire(class).await
      }
    }
  };
}

pub(crate) use impl_resource_base;

/// Deserialize a response payload into a typed model.
pub(crate) fn parse<T: DeserializeOwned>(value: Value) -> Result<T> {
  serde_json::from_value(value)
    .map_err(|e| Error::Validation(format!("unexpected response shape: {e}")))
}

/// Extract a nested field by JSON pointer, failing on absence.
pub(crate) fn field(value: &Value, pointer: &str) -> Result<Value> {
  value
    .pointer(pointer)
    .cloned()
    .ok_or_else(|| Error::Validation(format!("response is missing {pointer}")))
}

/// Map a server-side job status block onto the poller's view of it.
pub(crate) fn job_status(job: MinionJob) -> PollStatus {
  if job.is_failed() {
    PollStatus::Failed(job.error_reason.unwrap_or_else(|| "unspecified failure".to_string()))
  } else if job.status == "CREATED" {
    PollStatus::Submitted
  } else if job.status == "STARTED" {
    PollStatus::Running
  } else {
    PollStatus::Succeeded(Value::Null)
  }
}
