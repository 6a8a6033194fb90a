//! AI answer-set endpoints
//!
//! Answer generation is asynchronous: `create` submits the question and
//! returns the job id, the server works the job, and `get` loads the
//! finished answer set. `create_and_wait` chains all three through the
//! operation poller.

use super::{field, impl_resource_base, job_status, parse, ResourceBase};
use crate::poller::OperationPoller;
use crate::rate_limit::RateLimiter;
use crate::transport::Transport;
use ds_core::{Error, OperationClass, Result};
use ds_models::answers::{DocumentAnswer, DocumentAnswerSet};
use ds_models::common::MinionJob;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Maximum time to wait for an answer set to complete
const ANSWER_DEADLINE: Duration = Duration::from_secs(30);

/// Poll interval while an answer set is in flight
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Answer-set endpoints, available on user clients.
pub struct AnswerResource {
  transport: Arc<Transport>,
  rate_limiter: Arc<RateLimiter>,
  poller: OperationPoller,
}

impl AnswerResource {
  /// Create a new answer resource instance
  pub fn new(transport: Arc<Transport>, rate_limiter: Arc<RateLimiter>) -> Self {
    Self { transport, rate_limiter, poller: OperationPoller::new(POLL_INTERVAL, ANSWER_DEADLINE) }
  }

  /// Submit a question for answer generation; returns the job id.
  #[instrument(skip(self))]
  pub async fn create(&self, question: &str) -> Result<String> {
    if question.trim().is_empty() {
      return Err(Error::Validation("question must not be empty".to_string()));
    }

    self.admit(OperationClass::AnswerCreate).await?;
    let body = serde_json::json!({ "input": question });
    let response = self.transport.post("end-user-gateway-service/answer-sets", &[], &body).await?;
    parse(field(&response, "/answer_set/minion_job/id")?)
  }

  /// Wait until the answer set reaches a terminal state.
  #[instrument(skip(self))]
  pub async fn wait_for_answer(&self, answer_set_id: &str) -> Result<()> {
    let path = format!("end-user-gateway-service/answer-sets/{answer_set_id}");

    self
      .poller
      .wait_for_completion(answer_set_id, || {
        let transport = self.transport.clone();
        let rate_limiter = self.rate_limiter.clone();
        let path = path.clone();
        async move {
          rate_limiter.acquire(OperationClass::Read).await?;
          let response = transport.get(&path, &[]).await?;
          let job: MinionJob = parse(field(&response, "/answer_set/minion_job")?)?;
          Ok(job_status(job))
        }
      })
      .await?;

    Ok(())
  }

  /// Load a completed answer set.
  #[instrument(skip(self))]
  pub async fn get(&self, answer_set_id: &str) -> Result<DocumentAnswerSet> {
    self.admit(OperationClass::Read).await?;
    let response = self
      .transport
      .get(&format!("end-user-gateway-service/answer-sets/{answer_set_id}"), &[])
      .await?;

    let permission_validation: String = parse(field(&response, "/permission_validation_result")?)?;
    let answers: Vec<DocumentAnswer> =
      parse(field(&response, "/answer_set/context/summarized_search_results")?)?;
    let search_results: Vec<DocumentAnswer> =
      parse(field(&response, "/answer_set/context/search_results")?)?;

    Ok(DocumentAnswerSet { permission_validation, answers, search_results })
  }

  /// Submit a question and block until the finished answer set is loaded.
  #[instrument(skip(self))]
  pub async fn create_and_wait(&self, question: &str) -> Result<DocumentAnswerSet> {
    let answer_set_id = self.create(question).await?;
    self.wait_for_answer(&answer_set_id).await?;
    self.get(&answer_set_id).await
  }
}

impl_resource_base!(AnswerResource);
