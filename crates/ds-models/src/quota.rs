//! API key profile and quota status models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile of an API key as reported by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiProfile {
    /// Name of the application associated with the API key
    pub app: String,

    /// Name of the tenant associated with the API key
    pub tenant: String,

    /// User ID associated with the API key, if any
    #[serde(default)]
    pub user: Option<String>,

    /// Daily request quota limit; None means unlimited
    #[serde(rename = "daily_quota_limit", default)]
    pub day_quota: Option<u32>,

    /// Per-minute request quota limit; None means unlimited
    #[serde(rename = "minute_quota_limit", default)]
    pub minute_quota: Option<u32>,
}

/// Usage of one quota window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaInfo {
    /// Request quota limit for the period; None means unlimited
    #[serde(rename = "quota_limit", default)]
    pub quota: Option<u32>,

    /// Number of requests used in this period
    #[serde(default)]
    pub quota_used: Option<u32>,

    /// When the quota resets
    pub quota_reset_at: DateTime<Utc>,
}

/// Quota status across both tracked periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaStatus {
    /// Daily quota limit and usage
    #[serde(rename = "daily")]
    pub day_quota: QuotaInfo,

    /// Per-minute quota limit and usage
    #[serde(rename = "minute")]
    pub minute_quota: QuotaInfo,
}
