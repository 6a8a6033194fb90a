//! Desk-research report endpoints
//!
//! Reports follow the same submit/poll/load shape as answer sets, but run
//! far longer and are the most tightly rate-limited operation on the
//! platform. A caller without permission for the finished content gets a
//! RESTRICTED placeholder instead of an error.

use super::{field, impl_resource_base, job_status, parse, ResourceBase};
use crate::poller::OperationPoller;
use crate::rate_limit::RateLimiter;
use crate::transport::Transport;
use ds_core::{Error, OperationClass, Result};
use ds_models::common::MinionJob;
use ds_models::reports::{Report, ReportEvidence};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Maximum time to wait for a report to complete
const REPORT_DEADLINE: Duration = Duration::from_secs(600);

/// Poll interval while a report is in flight
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Desk-research report endpoints, available on user clients.
pub struct ReportResource {
  transport: Arc<Transport>,
  rate_limiter: Arc<RateLimiter>,
  poller: OperationPoller,
}

impl ReportResource {
  /// Create a new report resource instance
  pub fn new(transport: Arc<Transport>, rate_limiter: Arc<RateLimiter>) -> Self {
    Self { transport, rate_limiter, poller: OperationPoller::new(POLL_INTERVAL, REPORT_DEADLINE) }
  }

  /// Submit a research question for report generation; returns the job id.
  #[instrument(skip(self))]
  pub async fn create(&self, question: &str) -> Result<String> {
    if question.trim().is_empty() {
      return Err(Error::Validation("question must not be empty".to_string()));
    }

    self.admit(OperationClass::ReportCreate).await?;
    let body = serde_json::json!({ "input": question });
    let response =
      self.transport.post("end-user-gateway-service/desk-researches", &[], &body).await?;
    parse(field(&response, "/desk_research/minion_job/id")?)
  }

  /// Wait until the report reaches a terminal state.
  #[instrument(skip(self))]
  pub async fn wait_for_report(&self, report_id: &str) -> Result<()> {
    let path = format!("end-user-gateway-service/desk-researches/{report_id}");

    self
      .poller
      .wait_for_completion(report_id, || {
        let transport = self.transport.clone();
        let rate_limiter = self.rate_limiter.clone();
        let path = path.clone();
        async move {
          rate_limiter.acquire(OperationClass::Read).await?;
          let response = transport.get(&path, &[]).await?;
          let job: MinionJob = parse(field(&response, "/desk_research/minion_job")?)?;
          Ok(job_status(job))
        }
      })
      .await?;

    Ok(())
  }

  /// Load a report, or its RESTRICTED placeholder if the caller may not
  /// see the content.
  #[instrument(skip(self))]
  pub async fn get(&self, report_id: &str) -> Result<Report> {
    self.admit(OperationClass::Read).await?;
    let response = self
      .transport
      .get(&format!("end-user-gateway-service/desk-researches/{report_id}"), &[])
      .await?;

    let permission_validation: String = parse(field(&response, "/permission_validation_result")?)?;
    if permission_validation == "RESTRICTED" {
      let id: String = parse(field(&response, "/restricted_desk_research/desk_research_id")?)?;
      let question: String = parse(field(&response, "/restricted_desk_research/input")?)?;
      return Ok(Report::restricted(id, question));
    }

    let job: MinionJob = parse(field(&response, "/desk_research/minion_job")?)?;
    let document_sources: Vec<ReportEvidence> =
      parse(field(&response, "/desk_research/context/artifact_vector_search_results")?)?;
    let news_sources: Vec<ReportEvidence> =
      parse(field(&response, "/desk_research/context/scs_news_search_results")?)?;

    Ok(Report {
      permission_validation,
      id: job.id,
      status: job.status,
      question: parse(field(&response, "/desk_research/context/input")?)?,
      topic: parse(field(&response, "/desk_research/context/topic")?)?,
      summary: parse(field(&response, "/desk_research/context/summary")?)?,
      document_sources,
      news_sources,
    })
  }

  /// Submit a question and block until the finished report is loaded.
  #[instrument(skip(self))]
  pub async fn create_and_wait(&self, question: &str) -> Result<Report> {
    let report_id = self.create(question).await?;
    self.wait_for_report(&report_id).await?;
    self.get(&report_id).await
  }
}

impl_resource_base!(ReportResource);
