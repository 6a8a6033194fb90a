//! # ds-client
//!
//! A resilient Rust client for the DeepSights market-insights platform.
//!
//! ## Features
//!
//! - **Async/Await**: Built on tokio and reqwest
//! - **Rate Limiting**: Client-side sliding windows per operation class
//! - **Retries**: Jittered exponential backoff for transient failures
//! - **Caching**: LRU + TTL cache for document loads and user tokens
//! - **Impersonation**: Per-user clients resolved through the identity service
//! - **Type Safe**: Strongly typed responses using ds-models
//! - **Configurable**: Environment-based configuration via ds-core
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ds_client::DeepSights;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DeepSights::from_env()?;
//!
//!     // Check quota usage
//!     let status = client.quota().get_status().await?;
//!     println!("daily quota used: {:?}", status.day_quota.quota_used);
//!
//!     // Generate an answer set as a platform user
//!     let user = client.user_client("jane.doe@acme.com").await?;
//!     let answer_set = user.answers().create_and_wait("What drives demand?").await?;
//!     for answer in &answer_set.answers {
//!         println!("{:?}", answer.text);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All methods return `Result<T, ds_core::Error>` for consistent error
//! handling across the entire ds-* workspace. Rate limiting surfaces as a
//! single error variant whether it was enforced client-side (with a retry
//! hint) or by the server (after the retry budget, without one).

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod poller;
pub mod rate_limit;
pub mod resources;
pub mod transport;

// Re-export the main client and common types
pub use client::{DeepSights, UserClient};
pub use ds_core::{Config, Error, OperationClass, Result};
pub use ds_models::*;

// Re-export the core building blocks for direct use
pub use auth::{AuthScheme, RefreshFn, Token, TokenProvider, TokenRefresher};
pub use cache::ResponseCache;
pub use poller::{OperationPoller, OperationState, PendingOperation, PollStatus};
pub use rate_limit::RateLimiter;
pub use transport::Transport;

// Re-export resource types for direct access if needed
pub use resources::{
  answers::AnswerResource, contentstore::ContentStoreResource, documents::DocumentResource,
  quota::QuotaResource, reports::ReportResource,
};
