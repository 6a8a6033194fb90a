//! Document store models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single page of a stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    /// Page identifier
    pub id: String,

    /// One-based page number
    #[serde(alias = "number", default)]
    pub page_number: Option<u32>,

    /// Text content of the page
    #[serde(default)]
    pub text: Option<String>,
}

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier
    pub id: String,

    /// Document title
    #[serde(default)]
    pub title: Option<String>,

    /// Processing status of the document
    #[serde(default)]
    pub status: Option<String>,

    /// Human-readable source of the document
    #[serde(rename = "ai_generated_source", default)]
    pub source: Option<String>,

    /// Name of the uploaded file
    #[serde(default)]
    pub file_name: Option<String>,

    /// Size of the uploaded file in bytes
    #[serde(default)]
    pub file_size: Option<u64>,

    /// Human-readable summary of the document
    #[serde(rename = "summary", default)]
    pub description: Option<String>,

    /// Publication date of the document
    #[serde(default)]
    pub publication_date: Option<DateTime<Utc>>,

    /// IDs of the document's pages
    #[serde(default)]
    pub page_ids: Vec<String>,

    /// Total number of pages
    #[serde(rename = "total_pages", default)]
    pub number_of_pages: Option<u32>,
}

/// A page-level vector search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPageSearchResult {
    /// Page identifier
    pub id: String,

    /// ID of the document the page belongs to
    pub document_id: String,

    /// Similarity score of the hit
    pub score: f64,
}

/// A document-level search result aggregating its matching pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSearchResult {
    /// Document identifier
    pub id: String,

    /// Matching page hits for the document
    #[serde(default)]
    pub page_matches: Vec<DocumentPageSearchResult>,

    /// Final rank of the document in the result list
    #[serde(default)]
    pub rank: Option<u32>,
}
