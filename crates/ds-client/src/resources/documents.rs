//! Document store endpoints
//!
//! Vector search runs at page granularity; document-level results are
//! aggregated client-side from the page hits. Document loads are served
//! through the response cache, and deletion invalidates the cached copy.
//! Uploads go through a server-generated signed storage link and are then
//! polled until the ingestion pipeline reports completion; downloads fetch
//! the original file through the same signed-link mechanism.

use super::{field, impl_resource_base, parse, ResourceBase};
use crate::cache::{fingerprint, ResponseCache};
use crate::poller::{OperationPoller, PollStatus};
use crate::rate_limit::RateLimiter;
use crate::transport::Transport;
use ds_core::{Error, OperationClass, Result};
use ds_models::documents::{Document, DocumentPage, DocumentPageSearchResult, DocumentSearchResult};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Expected query embedding dimensionality (ADA model)
const EMBEDDING_DIM: usize = 1536;

/// How often ingestion of an uploaded document is re-checked
const PROCESSING_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound on the wait for document ingestion
const PROCESSING_DEADLINE: Duration = Duration::from_secs(300);

/// Document store endpoints.
pub struct DocumentResource {
  transport: Arc<Transport>,
  rate_limiter: Arc<RateLimiter>,
  cache: Arc<ResponseCache>,
  document_ttl: Duration,
}

impl DocumentResource {
  /// Create a new document resource instance
  pub fn new(
    transport: Arc<Transport>,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    document_ttl: Duration,
  ) -> Self {
    Self { transport, rate_limiter, cache, document_ttl }
  }

  /// Page-level vector search, sorted by score descending.
  #[instrument(skip(self, query_embedding))]
  pub async fn search_pages(
    &self,
    query_embedding: &[f32],
    min_score: f64,
    max_results: u32,
  ) -> Result<Vec<DocumentPageSearchResult>> {
    validate_search_args(query_embedding, min_score, max_results)?;

    self.admit(OperationClass::Read).await?;
    let params = [("ai_model", "ADA".to_string()), ("search_model", "PAGE".to_string())];
    let body = json!({
      "embeddings": query_embedding,
      "min_score": min_score,
      "limit": max_results,
    });
    let response =
      self.transport.post("vector-search-service/vectors/_search", &params, &body).await?;

    let mut results = parse_page_hits(&response)?;
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    Ok(results)
  }

  /// Document-level vector search: page hits aggregated per document and
  /// ranked by a reciprocal-rank score.
  #[instrument(skip(self, query_embedding))]
  pub async fn search(
    &self,
    query_embedding: &[f32],
    min_score: f64,
    max_results: u32,
  ) -> Result<Vec<DocumentSearchResult>> {
    let page_matches = self.search_pages(query_embedding, min_score, max_results).await?;
    Ok(aggregate_documents(page_matches, max_results))
  }

  /// Load one document, served from the cache within its TTL.
  #[instrument(skip(self))]
  pub async fn load(&self, document_id: &str) -> Result<Document> {
    let key = fingerprint("documents/load", &[("id", document_id)]);
    let path = format!("artifact-service/artifacts/{document_id}");

    let value = self
      .cache
      .get_or_compute(&key, self.document_ttl, || async {
        self.rate_limiter.acquire(OperationClass::Read).await?;
        self.transport.get(&path, &[]).await
      })
      .await?;

    parse(value)
  }

  /// Load one document page, served from the cache within the document TTL.
  #[instrument(skip(self))]
  pub async fn load_page(&self, page_id: &str) -> Result<DocumentPage> {
    let key = fingerprint("documents/load_page", &[("id", page_id)]);
    let path = format!("artifact-service/pages/{page_id}");

    let value = self
      .cache
      .get_or_compute(&key, self.document_ttl, || async {
        self.rate_limiter.acquire(OperationClass::Read).await?;
        self.transport.get(&path, &[]).await
      })
      .await?;

    parse(value)
  }

  /// List stored documents, newest first. Returns the total count across
  /// all pages together with the requested page.
  #[instrument(skip(self))]
  pub async fn list(
    &self,
    page_size: u32,
    page_number: u32,
    status_filter: &[&str],
  ) -> Result<(u64, Vec<Document>)> {
    if page_size == 0 || page_size > 100 {
      return Err(Error::Validation("page_size must be between 1 and 100".to_string()));
    }

    self.admit(OperationClass::Read).await?;
    let mut body = json!({
      "size": page_size,
      "page": page_number,
      "sorting": { "field_name": "origin.creation_time", "sorting_direction": "DESC" },
    });
    if !status_filter.is_empty() {
      body["statuses"] = json!(status_filter);
    }
    let response = self.transport.post("artifact-service/artifacts/_search", &[], &body).await?;

    let total: u64 = parse(field(&response, "/total_items")?)?;
    let documents: Vec<Document> = parse(field(&response, "/items")?)?;
    Ok((total, documents))
  }

  /// Delete one document and drop its cached copy.
  #[instrument(skip(self))]
  pub async fn delete(&self, document_id: &str) -> Result<()> {
    self.admit(OperationClass::Write).await?;
    self.transport.delete(&format!("artifact-service/artifacts/{document_id}")).await?;
    self.cache.invalidate(&fingerprint("documents/load", &[("id", document_id)]));
    Ok(())
  }

  /// Upload a local file for ingestion and return the new document ID.
  ///
  /// The file is pushed to a server-generated signed storage link, then
  /// registered as an artifact. The returned document starts processing
  /// asynchronously; combine with [`wait_for_processing`] or use
  /// [`upload_and_wait`] to block until it is searchable.
  ///
  /// [`wait_for_processing`]: Self::wait_for_processing
  /// [`upload_and_wait`]: Self::upload_and_wait
  #[instrument(skip(self))]
  pub async fn upload(&self, path: &Path) -> Result<String> {
    let file_name = path
      .file_name()
      .and_then(|n| n.to_str())
      .ok_or_else(|| Error::Validation(format!("not a file path: {}", path.display())))?;
    let extension = path
      .extension()
      .and_then(|e| e.to_str())
      .map(str::to_lowercase)
      .unwrap_or_default();
    let content_type = content_type_for(&extension).ok_or_else(|| {
      Error::Validation(format!("unsupported file type .{extension}, expected pdf/doc/docx/ppt/pptx"))
    })?;
    let bytes = tokio::fs::read(path)
      .await
      .map_err(|e| Error::Validation(format!("cannot read {}: {e}", path.display())))?;

    self.admit(OperationClass::Write).await?;
    let body = json!({ "file_name": file_name, "file_type": extension.to_uppercase() });
    let response = self
      .transport
      .post("artifact-service/document-upload-links/_generate", &[], &body)
      .await?;
    let signed_link: String = parse(field(&response, "/signed_link")?)?;
    let gcs_object_id: String = parse(field(&response, "/gcs_object_id")?)?;

    // generation-match 0 means create-only; the signed link is single-use
    let headers =
      [("Content-Type", content_type), ("x-goog-if-generation-match", "0")];
    self.transport.put_signed(&signed_link, &headers, bytes).await?;

    self.admit(OperationClass::Write).await?;
    let body = json!({ "gcs_object_id": gcs_object_id });
    let response = self.transport.post("artifact-service/artifacts", &[], &body).await?;
    parse(field(&response, "/id")?)
  }

  /// Block until an uploaded document finishes ingestion, returning its
  /// final record. The completed record is also placed in the cache.
  #[instrument(skip(self))]
  pub async fn wait_for_processing(&self, document_id: &str) -> Result<Document> {
    let poller = OperationPoller::new(PROCESSING_POLL_INTERVAL, PROCESSING_DEADLINE);
    let path = format!("artifact-service/artifacts/{document_id}");

    let operation = poller
      .wait_for_completion(document_id, || {
        let transport = Arc::clone(&self.transport);
        let rate_limiter = Arc::clone(&self.rate_limiter);
        let path = path.clone();
        async move {
          rate_limiter.acquire(OperationClass::Read).await?;
          let response = transport.get(&path, &[]).await?;
          processing_status(&response)
        }
      })
      .await?;

    let value = operation
      .result
      .ok_or_else(|| Error::Validation("completed document carried no record".to_string()))?;
    let key = fingerprint("documents/load", &[("id", document_id)]);
    self.cache.insert(key, value.clone(), self.document_ttl);
    parse(value)
  }

  /// Upload a local file and wait for ingestion to complete.
  #[instrument(skip(self))]
  pub async fn upload_and_wait(&self, path: &Path) -> Result<Document> {
    let document_id = self.upload(path).await?;
    self.wait_for_processing(&document_id).await
  }

  /// Download the original file content of a stored document.
  ///
  /// Resolves a signed storage link for the artifact, then fetches the raw
  /// bytes. Pair with [`load`](Self::load) for the original file name.
  #[instrument(skip(self))]
  pub async fn download(&self, document_id: &str) -> Result<Vec<u8>> {
    self.admit(OperationClass::Read).await?;
    let path = format!("artifact-service/artifacts/{document_id}/gcs-object-link");
    let response = self.transport.get(&path, &[]).await?;
    let signed_link: String = parse(field(&response, "/signed_link")?)?;
    self.transport.get_signed(&signed_link).await
  }
}

impl_resource_base!(DocumentResource);

/// MIME type for the supported upload formats.
fn content_type_for(extension: &str) -> Option<&'static str> {
  match extension {
    "pdf" => Some("application/pdf"),
    "doc" => Some("application/msword"),
    "docx" => {
      Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
    }
    "ppt" => Some("application/vnd.ms-powerpoint"),
    "pptx" => {
      Some("application/vnd.openxmlformats-officedocument.presentationml.presentation")
    }
    _ => None,
  }
}

/// Map an artifact record's ingestion status onto the poller's view.
///
/// Unlike minion jobs, artifacts report COMPLETED explicitly and carry
/// their failure detail in `error_message`; any other status means the
/// pipeline is still working.
fn processing_status(response: &Value) -> Result<PollStatus> {
  let status: String = parse(field(response, "/status")?)?;
  if status == "COMPLETED" {
    Ok(PollStatus::Succeeded(response.clone()))
  } else if status.starts_with("FAILED") {
    let reason = response
      .pointer("/error_message")
      .and_then(Value::as_str)
      .unwrap_or("unspecified failure")
      .to_string();
    Ok(PollStatus::Failed(reason))
  } else {
    Ok(PollStatus::Running)
  }
}

fn validate_search_args(query_embedding: &[f32], min_score: f64, max_results: u32) -> Result<()> {
  if query_embedding.len() != EMBEDDING_DIM {
    return Err(Error::Validation(format!(
      "query embedding must have {EMBEDDING_DIM} dimensions, got {}",
      query_embedding.len()
    )));
  }
  if !(0.0..=1.0).contains(&min_score) {
    return Err(Error::Validation("min_score must be between 0 and 1".to_string()));
  }
  if max_results == 0 || max_results > 100 {
    return Err(Error::Validation("max_results must be between 1 and 100".to_string()));
  }
  Ok(())
}

/// Flatten the nested search response into page hits.
fn parse_page_hits(response: &Value) -> Result<Vec<DocumentPageSearchResult>> {
  let documents: Vec<Value> = parse(field(response, "/results")?)?;

  let mut hits = Vec::new();
  for document in &documents {
    let document_id: String = parse(field(document, "/artifact_id")?)?;
    let parts: Vec<Value> = parse(field(document, "/result_parts")?)?;
    for part in &parts {
      hits.push(DocumentPageSearchResult {
        id: parse(field(part, "/part_id")?)?,
        document_id: document_id.clone(),
        score: parse(field(part, "/score")?)?,
      });
    }
  }
  Ok(hits)
}

/// Aggregate page hits into ranked document results. Each page contributes
/// a reciprocal-rank boost to its document; documents are ordered by total
/// boost and numbered from 1.
fn aggregate_documents(
  page_matches: Vec<DocumentPageSearchResult>,
  max_results: u32,
) -> Vec<DocumentSearchResult> {
  let mut scores: Vec<(String, f64)> = Vec::new();
  for (rank, page) in page_matches.iter().enumerate() {
    let boost = 1.0 / (rank as f64 + f64::from(max_results) / 2.0);
    match scores.iter_mut().find(|(id, _)| *id == page.document_id) {
      Some((_, score)) => *score += boost,
      None => scores.push((page.document_id.clone(), boost)),
    }
  }
  scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

  scores
    .into_iter()
    .enumerate()
    .map(|(rank, (document_id, _))| DocumentSearchResult {
      page_matches: page_matches.iter().filter(|p| p.document_id == document_id).cloned().collect(),
      id: document_id,
      rank: Some(rank as u32 + 1),
    })
    .collect()
}
