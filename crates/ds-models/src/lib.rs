//! # ds-models
//!
//! Data models for DeepSights API responses.
//!
//! Strongly-typed Rust structures for the platform's response payloads:
//! answer sets, desk-research reports, quota/profile information, document
//! store entities and content-store search hits. All types are serde
//! (de)serializable and map wire-level field names via renames/aliases.

#![warn(clippy::all)]

pub mod answers;
pub mod common;
pub mod contentstore;
pub mod documents;
pub mod quota;
pub mod reports;

// Re-export the commonly used types
pub use answers::{AnswerPageReference, DocumentAnswer, DocumentAnswerSet};
pub use common::MinionJob;
pub use contentstore::ContentStoreSearchResult;
pub use documents::{Document, DocumentPage, DocumentPageSearchResult, DocumentSearchResult};
pub use quota::{ApiProfile, QuotaInfo, QuotaStatus};
pub use reports::{Report, ReportEvidence};
