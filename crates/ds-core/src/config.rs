//! Configuration management for the DeepSights client

use crate::error::{Error, Result};
use crate::OperationClass;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;

/// Quota for one operation class: at most `max_calls` requests within a
/// trailing window of `window_secs` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateQuota {
  /// Maximum admitted calls within the window
  pub max_calls: u32,

  /// Trailing window length in seconds
  pub window_secs: u64,
}

impl RateQuota {
  /// Convenience constructor
  pub fn new(max_calls: u32, window_secs: u64) -> Self {
    RateQuota { max_calls, window_secs }
  }
}

/// Per-operation-class rate limits. The numbers are deployment tuning,
/// not protocol invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimits {
  pub read: RateQuota,
  pub write: RateQuota,
  pub answer_create: RateQuota,
  pub report_create: RateQuota,
}

impl RateLimits {
  /// Look up the quota for an operation class
  pub fn quota(&self, class: OperationClass) -> RateQuota {
    match class {
      OperationClass::Read => self.read,
      OperationClass::Write => self.write,
      OperationClass::AnswerCreate => self.answer_create,
      OperationClass::ReportCreate => self.report_create,
    }
  }
}

impl Default for RateLimits {
  fn default() -> Self {
    RateLimits {
      read: RateQuota::new(crate::DEFAULT_READ_LIMIT, 60),
      write: RateQuota::new(crate::DEFAULT_WRITE_LIMIT, 60),
      answer_create: RateQuota::new(crate::DEFAULT_ANSWER_CREATE_LIMIT, 60),
      report_create: RateQuota::new(crate::DEFAULT_REPORT_CREATE_LIMIT, 60),
    }
  }
}

/// Response cache sizing and expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
  /// Maximum number of entries before LRU eviction kicks in
  pub capacity: usize,

  /// TTL in seconds for cached document loads
  pub document_ttl_secs: u64,

  /// TTL in seconds for cached impersonation tokens
  pub user_token_ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    CacheConfig {
      capacity: 1000,
      document_ttl_secs: 300,
      user_token_ttl_secs: crate::DEFAULT_USER_TOKEN_TTL_SECS,
    }
  }
}

/// Main configuration struct for the DeepSights client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
  /// Primary DeepSights API key
  pub api_key: String,

  /// ContentStore API key; None disables content-store search
  pub contentstore_api_key: Option<String>,

  /// MIP identity API key; None disables user impersonation
  pub mip_api_key: Option<String>,

  /// Base URL for the DeepSights API
  pub base_url: String,

  /// Base URL for the ContentStore API
  pub contentstore_base_url: String,

  /// Base URL for the MIP identity service
  pub mip_base_url: String,

  /// Request timeout in seconds
  pub timeout_secs: u64,

  /// Maximum retries for transient failures
  pub max_retries: u32,

  /// Upper bound for a single backoff wait, in milliseconds
  pub backoff_max_ms: u64,

  /// Per-operation-class rate limits
  pub rate_limits: RateLimits,

  /// Response cache sizing and TTLs
  pub cache: CacheConfig,

  /// When true, a caller over quota gets an immediate error with a
  /// retry hint instead of sleeping until the window frees up
  pub fail_fast: bool,
}

impl Config {
  /// Load configuration from environment variables
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let api_key = env::var("DEEPSIGHTS_API_KEY")
      .map_err(|_| Error::Config("DEEPSIGHTS_API_KEY not set".to_string()))?;

    // optional capability keys; absence disables the capability
    let contentstore_api_key = env::var("CONTENTSTORE_API_KEY").ok();
    let mip_api_key = env::var("MIP_API_KEY").ok();

    let base_url =
      env::var("DS_BASE_URL").unwrap_or_else(|_| crate::DEEPSIGHTS_BASE_URL.to_string());
    let contentstore_base_url =
      env::var("CS_BASE_URL").unwrap_or_else(|_| crate::CONTENTSTORE_BASE_URL.to_string());
    let mip_base_url =
      env::var("MIP_BASE_URL").unwrap_or_else(|_| crate::MIP_IDENTITY_BASE_URL.to_string());

    let timeout_secs = env::var("DS_TIMEOUT_SECS")
      .unwrap_or_else(|_| "15".to_string())
      .parse()
      .map_err(|_| Error::Config("Invalid DS_TIMEOUT_SECS".to_string()))?;

    let max_retries = env::var("DS_MAX_RETRIES")
      .unwrap_or_else(|_| "3".to_string())
      .parse()
      .map_err(|_| Error::Config("Invalid DS_MAX_RETRIES".to_string()))?;

    let backoff_max_ms = env::var("DS_BACKOFF_MAX_MS")
      .unwrap_or_else(|_| "5000".to_string())
      .parse()
      .map_err(|_| Error::Config("Invalid DS_BACKOFF_MAX_MS".to_string()))?;

    Ok(Config {
      api_key,
      contentstore_api_key,
      mip_api_key,
      base_url,
      contentstore_base_url,
      mip_base_url,
      timeout_secs,
      max_retries,
      backoff_max_ms,
      rate_limits: RateLimits::default(),
      cache: CacheConfig::default(),
      fail_fast: false,
    })
  }

  /// Create a config with default values (for testing)
  pub fn default_with_key(api_key: String) -> Self {
    Config {
      api_key,
      contentstore_api_key: None,
      mip_api_key: None,
      base_url: crate::DEEPSIGHTS_BASE_URL.to_string(),
      contentstore_base_url: crate::CONTENTSTORE_BASE_URL.to_string(),
      mip_base_url: crate::MIP_IDENTITY_BASE_URL.to_string(),
      timeout_secs: 15,
      max_retries: 3,
      backoff_max_ms: 5000,
      rate_limits: RateLimits::default(),
      cache: CacheConfig::default(),
      fail_fast: false,
    }
  }

  /// Override the base URL, e.g. for a staging environment or a mock server
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }
}
