//! Content store (third-party content) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A search hit from the content store (news or secondary research)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStoreSearchResult {
    /// Item identifier
    pub id: String,

    /// Item title
    #[serde(default)]
    pub title: Option<String>,

    /// Description of the item
    #[serde(default)]
    pub description: Option<String>,

    /// URL of the item's thumbnail image
    #[serde(default)]
    pub image_url: Option<String>,

    /// URL of the item
    #[serde(default)]
    pub url: Option<String>,

    /// Publication date of the item
    #[serde(rename = "published_at", default)]
    pub publication_date: Option<DateTime<Utc>>,

    /// Name of the item's source
    #[serde(rename = "source_name", default)]
    pub source: Option<String>,

    /// Final rank of the item in the result list; assigned client-side
    #[serde(default)]
    pub rank: Option<u32>,
}
