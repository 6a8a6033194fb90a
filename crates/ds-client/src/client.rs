//! Main DeepSights API client
//!
//! [`DeepSights`] owns the shared infrastructure: one transport per
//! endpoint base, the per-class rate limiter, and the response cache.
//! Resource accessors hand out lightweight wrappers over those shared
//! pieces. User impersonation goes through the MIP identity service and
//! the resolved bearer tokens are cached with a short TTL.

use crate::auth::{Token, TokenProvider, TokenRefresher};
use crate::cache::{fingerprint, ResponseCache};
use crate::rate_limit::RateLimiter;
use crate::resources::answers::AnswerResource;
use crate::resources::contentstore::ContentStoreResource;
use crate::resources::documents::DocumentResource;
use crate::resources::quota::QuotaResource;
use crate::resources::reports::ReportResource;
use crate::resources::{field, parse};
use crate::transport::Transport;
use ds_core::{Config, Error, OperationClass, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Capacity of the impersonation-token cache
const USER_TOKEN_CACHE_CAPACITY: usize = 100;

/// Main DeepSights API client
///
/// # Examples
///
/// ```rust,no_run
/// use ds_client::DeepSights;
/// use ds_core::Config;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = DeepSights::from_env()?;
///
///     let profile = client.quota().get_profile().await?;
///     println!("tenant: {}", profile.tenant);
///
///     let user = client.user_client("jane.doe@acme.com").await?;
///     let answers = user.answers().create_and_wait("What drives demand?").await?;
///     println!("{} answers", answers.answers.len());
///
///     Ok(())
/// }
/// ```
pub struct DeepSights {
  config: Config,
  transport: Arc<Transport>,
  rate_limiter: Arc<RateLimiter>,
  cache: Arc<ResponseCache>,
  contentstore: Option<Arc<Transport>>,
  mip: Option<Arc<Transport>>,
  user_tokens: ResponseCache,
}

impl DeepSights {
  /// Create a new client from an explicit configuration.
  ///
  /// The content-store and impersonation capabilities are only enabled
  /// when their API keys are present in the configuration.
  pub fn new(config: Config) -> Result<Self> {
    let transport = Arc::new(Transport::new(
      &config.base_url,
      TokenProvider::api_key(&config.api_key),
      config.timeout_secs,
      config.max_retries,
      config.backoff_max_ms,
    )?);

    let contentstore = match &config.contentstore_api_key {
      Some(key) => Some(Arc::new(Transport::new(
        &config.contentstore_base_url,
        TokenProvider::api_key(key),
        config.timeout_secs,
        config.max_retries,
        config.backoff_max_ms,
      )?)),
      None => None,
    };

    let mip = match &config.mip_api_key {
      Some(key) => Some(Arc::new(Transport::new(
        &config.mip_base_url,
        TokenProvider::api_key(key),
        config.timeout_secs,
        config.max_retries,
        config.backoff_max_ms,
      )?)),
      None => None,
    };

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limits, config.fail_fast));
    let cache = Arc::new(ResponseCache::new(config.cache.capacity));

    info!(
      contentstore = contentstore.is_some(),
      impersonation = mip.is_some(),
      "DeepSights client created"
    );

    Ok(Self {
      config,
      transport,
      rate_limiter,
      cache,
      contentstore,
      mip,
      user_tokens: ResponseCache::new(USER_TOKEN_CACHE_CAPACITY),
    })
  }

  /// Create a new client from environment variables.
  pub fn from_env() -> Result<Self> {
    Self::new(Config::from_env()?)
  }

  /// Get access to quota endpoints
  pub fn quota(&self) -> QuotaResource {
    QuotaResource::new(self.transport.clone(), self.rate_limiter.clone())
  }

  /// Get access to document store endpoints
  pub fn documents(&self) -> DocumentResource {
    DocumentResource::new(
      self.transport.clone(),
      self.rate_limiter.clone(),
      self.cache.clone(),
      Duration::from_secs(self.config.cache.document_ttl_secs),
    )
  }

  /// Get access to content store search endpoints
  ///
  /// # Errors
  ///
  /// Returns [`Error::Config`] when no content-store API key is configured.
  pub fn contentstore(&self) -> Result<ContentStoreResource> {
    let transport = self
      .contentstore
      .as_ref()
      .ok_or_else(|| Error::Config("CONTENTSTORE_API_KEY not configured".to_string()))?;
    Ok(ContentStoreResource::new(transport.clone(), self.rate_limiter.clone()))
  }

  /// Obtain a client acting as the given platform user.
  ///
  /// The user's bearer token is resolved through the MIP identity service
  /// and cached; repeated calls for the same email within the token TTL do
  /// not hit the identity service again.
  ///
  /// # Errors
  ///
  /// Returns [`Error::Config`] when impersonation is not configured,
  /// [`Error::Validation`] for a malformed email and
  /// [`Error::Authentication`] when the platform does not know the user.
  #[instrument(skip(self))]
  pub async fn user_client(&self, email: &str) -> Result<UserClient> {
    let mip = self
      .mip
      .as_ref()
      .ok_or_else(|| Error::Config("MIP_API_KEY not configured".to_string()))?;

    let email = email.trim().to_lowercase();
    validate_email(&email)?;

    let key = fingerprint("user-token", &[("email", &email)]);
    let ttl = Duration::from_secs(self.config.cache.user_token_ttl_secs);

    let token = self
      .user_tokens
      .get_or_compute(&key, ttl, || async {
        self.rate_limiter.acquire(OperationClass::Write).await?;
        let body = json!({ "user_email": email });
        let (status, value) = mip
          .post_with_expected(
            "user-service-adapter/deep-sights/oauth/_generate-user-token",
            &[],
            &body,
            &[404],
          )
          .await?;
        if status == 404 {
          return Err(Error::Authentication(format!("user not found: {email}")));
        }
        field(&value, "/access_token")
      })
      .await?;

    self.user_client_with_token(parse::<String>(token)?)
  }

  /// Build a user client from an already resolved bearer token.
  pub fn user_client_with_token(&self, token: impl Into<String>) -> Result<UserClient> {
    self.build_user_client(TokenProvider::bearer(token))
  }

  /// Build a user client backed by a unified token: requests carry the
  /// current bearer token and the refresher is invoked when it expires or
  /// is rejected.
  pub fn unified_user_client(
    &self,
    initial: Option<Token>,
    refresher: Arc<dyn TokenRefresher>,
  ) -> Result<UserClient> {
    self.build_user_client(TokenProvider::unified(initial, refresher))
  }

  fn build_user_client(&self, token_provider: TokenProvider) -> Result<UserClient> {
    let transport = Arc::new(Transport::new(
      &self.config.base_url,
      token_provider,
      self.config.timeout_secs,
      self.config.max_retries,
      self.config.backoff_max_ms,
    )?);
    // user clients share the platform-wide limiter with the parent
    Ok(UserClient { transport, rate_limiter: self.rate_limiter.clone() })
  }

  /// Drop all cached responses and impersonation tokens.
  pub fn invalidate_caches(&self) {
    self.cache.invalidate_all();
    self.user_tokens.invalidate_all();
  }

  /// The configuration this client was built with
  pub fn config(&self) -> &Config {
    &self.config
  }
}

impl std::fmt::Debug for DeepSights {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DeepSights")
      .field("transport", &self.transport)
      .field("contentstore", &self.contentstore.is_some())
      .field("impersonation", &self.mip.is_some())
      .finish()
  }
}

/// A client acting on behalf of one platform user.
///
/// Carries the user's bearer credential but shares the platform-wide rate
/// limiter with the parent client, so impersonated traffic counts against
/// the same quotas.
pub struct UserClient {
  transport: Arc<Transport>,
  rate_limiter: Arc<RateLimiter>,
}

impl UserClient {
  /// Get access to answer-set endpoints
  pub fn answers(&self) -> AnswerResource {
    AnswerResource::new(self.transport.clone(), self.rate_limiter.clone())
  }

  /// Get access to desk-research report endpoints
  pub fn reports(&self) -> ReportResource {
    ReportResource::new(self.transport.clone(), self.rate_limiter.clone())
  }
}

impl std::fmt::Debug for UserClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("UserClient").field("transport", &self.transport).finish()
  }
}

/// Minimal structural check; the identity service is the authority on
/// whether the address maps to a user.
fn validate_email(email: &str) -> Result<()> {
  let valid = match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
    }
    None => false,
  };

  if valid {
    Ok(())
  } else {
    Err(Error::Validation(format!("invalid email address: {email}")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client() -> DeepSights {
    DeepSights::new(Config::default_with_key("test_key".to_string())).unwrap()
  }

  #[test]
  fn test_client_creation() {
    let client = client();
    assert_eq!(client.config().api_key, "test_key");
  }

  #[test]
  fn test_optional_capabilities_disabled_without_keys() {
    let client = client();
    assert!(matches!(client.contentstore(), Err(Error::Config(_))));
  }

  #[tokio::test]
  async fn test_user_client_requires_mip_key() {
    let err = client().user_client("jane@acme.com").await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn test_email_validation() {
    assert!(validate_email("jane.doe@acme.com").is_ok());
    assert!(validate_email("j+tag@sub.acme.co.uk").is_ok());

    assert!(validate_email("jane").is_err());
    assert!(validate_email("@acme.com").is_err());
    assert!(validate_email("jane@").is_err());
    assert!(validate_email("jane@acme").is_err());
    assert!(validate_email("jane doe@acme.com").is_err());
    assert!(validate_email("jane@.acme.com").is_err());
  }

  #[test]
  fn test_user_client_from_static_token() {
    let user = client().user_client_with_token("bearer-token").unwrap();
    let _ = user.answers();
    let _ = user.reports();
  }
}
