//! Desk-research report models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One piece of evidence cited by a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEvidence {
    /// Evidence identifier
    pub id: String,

    /// Title of the evidence source
    #[serde(default)]
    pub title: Option<String>,

    /// Summary of the evidence with respect to the report question
    #[serde(rename = "summary", default)]
    pub evidence_summary: Option<String>,

    /// Publication date of the evidence source
    #[serde(default)]
    pub publication_date: Option<DateTime<Utc>>,

    /// Quotation reference code used in the report text
    #[serde(rename = "reference_id", default)]
    pub reference: Option<String>,
}

/// A generated desk-research report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Permission validation outcome for the caller
    pub permission_validation: String,

    /// Report (minion job) identifier
    pub id: String,

    /// Server-side status of the generating job
    pub status: String,

    /// The research question the report answers
    pub question: String,

    /// Detected topic of the question
    pub topic: String,

    /// The report body
    pub summary: String,

    /// Evidence drawn from the document store
    #[serde(default)]
    pub document_sources: Vec<ReportEvidence>,

    /// Evidence drawn from news search
    #[serde(default)]
    pub news_sources: Vec<ReportEvidence>,
}

impl Report {
    /// A placeholder report returned when the caller lacks permission to
    /// see the content; only the question survives.
    pub fn restricted(id: String, question: String) -> Self {
        Report {
            permission_validation: "RESTRICTED".to_string(),
            id,
            status: "n/a".to_string(),
            question,
            topic: "n/a".to_string(),
            summary: "n/a".to_string(),
            document_sources: Vec::new(),
            news_sources: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_report_is_empty() {
        let report = Report::restricted("rep-1".into(), "market size?".into());
        assert_eq!(report.permission_validation, "RESTRICTED");
        assert!(report.document_sources.is_empty());
        assert!(report.news_sources.is_empty());
    }

    #[test]
    fn evidence_parses_reference_alias() {
        let json = r#"{"id": "ev-1", "summary": "supports claim", "reference_id": "R3"}"#;
        let evidence: ReportEvidence = serde_json::from_str(json).unwrap();
        assert_eq!(evidence.reference.as_deref(), Some("R3"));
    }
}
