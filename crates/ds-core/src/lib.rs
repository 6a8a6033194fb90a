pub mod config;
pub mod error;

pub use config::{CacheConfig, Config, RateLimits, RateQuota};
pub use error::{Error, Result};

/// The categories of API calls that share one rate-limit budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
  /// GET-style lookups and searches
  Read,
  /// Mutating calls (uploads, deletes, taxonomy changes)
  Write,
  /// AI answer generation jobs
  AnswerCreate,
  /// Desk-research report generation jobs
  ReportCreate,
}

impl std::fmt::Display for OperationClass {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      OperationClass::Read => write!(f, "read"),
      OperationClass::Write => write!(f, "write"),
      OperationClass::AnswerCreate => write!(f, "answer-create"),
      OperationClass::ReportCreate => write!(f, "report-create"),
    }
  }
}

/// Base URL for the DeepSights API
pub const DEEPSIGHTS_BASE_URL: &str = "https://api.deepsights.ai/ds/v1";

/// Base URL for the ContentStore API
pub const CONTENTSTORE_BASE_URL: &str = "https://api.deepsights.ai/cs/v1";

/// Base URL for the MIP identity service
pub const MIP_IDENTITY_BASE_URL: &str =
  "https://apigee.mlsdevcloud.com/user-management-api/prod/v1";

/// Default per-minute rate limits per operation class
pub const DEFAULT_READ_LIMIT: u32 = 1000;
pub const DEFAULT_WRITE_LIMIT: u32 = 100;
pub const DEFAULT_ANSWER_CREATE_LIMIT: u32 = 10;
pub const DEFAULT_REPORT_CREATE_LIMIT: u32 = 3;

/// Impersonation tokens are cached for four minutes
pub const DEFAULT_USER_TOKEN_TTL_SECS: u64 = 240;
