//! AI answer-set models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to a specific page of a source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPageReference {
    /// Page identifier
    pub id: String,

    /// Page number within the document
    #[serde(alias = "number")]
    pub page_number: u32,
}

/// One answer grounded in a platform artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnswer {
    /// Artifact-derived answer identifier
    pub id: String,

    /// Title of the source artifact
    #[serde(default)]
    pub title: Option<String>,

    /// The generated answer text
    #[serde(rename = "summary", default)]
    pub text: Option<String>,

    /// ID of the artifact the answer is derived from
    pub artifact_id: String,

    /// Type of the source artifact (e.g. DOCUMENT)
    pub artifact_type: String,

    /// Human-readable summary of the artifact
    #[serde(rename = "artifact_summary", default)]
    pub artifact_description: Option<String>,

    /// Publication date of the source artifact
    #[serde(default)]
    pub publication_date: Option<DateTime<Utc>>,

    /// Pages of the source document backing the answer
    #[serde(rename = "page_references", default)]
    pub pages: Vec<AnswerPageReference>,
}

/// A completed answer set: the generated answers plus the raw search
/// results they were grounded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnswerSet {
    /// Permission validation outcome for the caller
    pub permission_validation: String,

    /// Generated answers
    pub answers: Vec<DocumentAnswer>,

    /// Initial search results used for grounding
    pub search_results: Vec<DocumentAnswer>,
}
