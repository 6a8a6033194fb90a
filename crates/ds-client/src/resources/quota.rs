//! API key profile and quota endpoints

use super::{impl_resource_base, parse, ResourceBase};
use crate::rate_limit::RateLimiter;
use crate::transport::Transport;
use ds_core::{OperationClass, Result};
use ds_models::quota::{ApiProfile, QuotaStatus};
use std::sync::Arc;
use tracing::instrument;

/// Quota and key-attribute endpoints.
///
/// Always served fresh; quota numbers are stale the moment they are cached.
pub struct QuotaResource {
  transport: Arc<Transport>,
  rate_limiter: Arc<RateLimiter>,
}

impl QuotaResource {
  /// Create a new quota resource instance
  pub fn new(transport: Arc<Transport>, rate_limiter: Arc<RateLimiter>) -> Self {
    Self { transport, rate_limiter }
  }

  /// Profile of the configured API key (app, tenant, quota limits)
  #[instrument(skip(self))]
  pub async fn get_profile(&self) -> Result<ApiProfile> {
    self.admit(OperationClass::Read).await?;
    let response = self.transport.get("static-resolver/api-key-attributes", &[]).await?;
    parse(response)
  }

  /// Current quota usage for both tracked periods
  #[instrument(skip(self))]
  pub async fn get_status(&self) -> Result<QuotaStatus> {
    self.admit(OperationClass::Read).await?;
    let response = self.transport.get("static-resolver/quota", &[]).await?;
    parse(response)
  }
}

impl_resource_base!(QuotaResource);
