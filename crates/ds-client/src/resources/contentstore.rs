//! Content store search endpoints
//!
//! Hybrid search blends vector and text retrieval server-side over the
//! third-party content pool (news and secondary research). The server
//! returns items in final order; ranks are recorded client-side.

use super::{field, impl_resource_base, parse, ResourceBase};
use crate::rate_limit::RateLimiter;
use crate::transport::Transport;
use ds_core::{Error, OperationClass, Result};
use ds_models::contentstore::ContentStoreSearchResult;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

/// Tuning knobs for hybrid search. The defaults favor vector retrieval
/// with a moderate recency bias.
#[derive(Debug, Clone)]
pub struct HybridSearchOptions {
  /// Maximum number of results, 1..=250
  pub max_results: u32,
  /// Minimum vector similarity for a vector hit to qualify
  pub min_vector_score: f64,
  /// Fraction of results drawn from vector search
  pub vector_fraction: f64,
  /// Weight of vector hits in the blended ranking
  pub vector_weight: f64,
  /// Weight of recency in the blended ranking
  pub recency_weight: f64,
  /// Restrict results to these languages; empty means all
  pub languages: Vec<String>,
}

impl Default for HybridSearchOptions {
  fn default() -> Self {
    HybridSearchOptions {
      max_results: 30,
      min_vector_score: 0.7,
      vector_fraction: 0.9,
      vector_weight: 0.9,
      recency_weight: 0.4,
      languages: Vec::new(),
    }
  }
}

/// Content store search endpoints.
pub struct ContentStoreResource {
  transport: Arc<Transport>,
  rate_limiter: Arc<RateLimiter>,
}

impl ContentStoreResource {
  /// Create a new content store resource instance
  pub fn new(transport: Arc<Transport>, rate_limiter: Arc<RateLimiter>) -> Self {
    Self { transport, rate_limiter }
  }

  /// Hybrid search over news articles.
  #[instrument(skip(self, options))]
  pub async fn search_news(
    &self,
    query: &str,
    options: &HybridSearchOptions,
  ) -> Result<Vec<ContentStoreSearchResult>> {
    self.hybrid_search(query, "NEWS", options).await
  }

  /// Hybrid search over secondary research reports.
  #[instrument(skip(self, options))]
  pub async fn search_secondary(
    &self,
    query: &str,
    options: &HybridSearchOptions,
  ) -> Result<Vec<ContentStoreSearchResult>> {
    self.hybrid_search(query, "SECONDARY", options).await
  }

  async fn hybrid_search(
    &self,
    query: &str,
    item_type: &str,
    options: &HybridSearchOptions,
  ) -> Result<Vec<ContentStoreSearchResult>> {
    validate_options(query, options)?;

    self.admit(OperationClass::Read).await?;
    let body = json!({
      "query": query,
      "source_items_type": item_type,
      "content_restrictions": "NONE",
      "limit": options.max_results,
      "vector_search_cut_off_score": options.min_vector_score,
      "alfa": options.vector_weight,
      "beta": 1.0 - options.recency_weight,
      "text_search_fraction": 1.0 - options.vector_fraction,
      "k": 60,
      "languages": options.languages,
    });
    let response = self.transport.post("item-service/items/_hybrid-search", &[], &body).await?;

    let items: Vec<Value> = parse(field(&response, "/items")?)?;
    items
      .into_iter()
      .enumerate()
      .map(|(rank, item)| {
        let mut hit: ContentStoreSearchResult = parse(flatten_source(item))?;
        hit.rank = Some(rank as u32 + 1);
        Ok(hit)
      })
      .collect()
  }
}

impl_resource_base!(ContentStoreResource);

fn validate_options(query: &str, options: &HybridSearchOptions) -> Result<()> {
  if query.trim().is_empty() {
    return Err(Error::Validation("query must not be empty".to_string()));
  }
  if options.max_results == 0 || options.max_results > 250 {
    return Err(Error::Validation("max_results must be between 1 and 250".to_string()));
  }
  for (name, value) in [
    ("min_vector_score", options.min_vector_score),
    ("vector_fraction", options.vector_fraction),
    ("vector_weight", options.vector_weight),
    ("recency_weight", options.recency_weight),
  ] {
    if !(0.0..=1.0).contains(&value) {
      return Err(Error::Validation(format!("{name} must be between 0 and 1")));
    }
  }
  Ok(())
}

/// The wire item nests its source under `source.display_name`; lift it to
/// the flat field the model expects.
fn flatten_source(mut item: Value) -> Value {
  if let Some(name) = item.pointer("/source/display_name").cloned() {
    if let Some(object) = item.as_object_mut() {
      object.insert("source_name".to_string(), name);
    }
  }
  item
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_default_options_are_valid() {
    assert!(validate_options("beverage trends", &HybridSearchOptions::default()).is_ok());
  }

  #[test]
  fn test_validation_rejects_out_of_range() {
    let mut options = HybridSearchOptions::default();
    assert!(validate_options("", &options).is_err());

    options.max_results = 251;
    assert!(validate_options("q", &options).is_err());

    options = HybridSearchOptions { recency_weight: 1.2, ..Default::default() };
    assert!(validate_options("q", &options).is_err());
  }

  #[test]
  fn test_flatten_source_lifts_display_name() {
    let item = json!({
      "id": "news-1",
      "title": "Beverage market shifts",
      "source": {"display_name": "Example Wire"}
    });

    let hit: ContentStoreSearchResult = parse(flatten_source(item)).unwrap();
    assert_eq!(hit.source.as_deref(), Some("Example Wire"));
  }
}
