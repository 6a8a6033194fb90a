//! Credential resolution and refresh
//!
//! Three credential modes are supported: a static API key (sent as
//! `X-Api-Key`), a static bearer token, and a "unified" bearer token with a
//! caller-supplied refresh callback. Refresh is single-flight: concurrent
//! callers hitting an expired token wait for the one in-progress refresh
//! instead of stacking duplicate refreshes.

use async_trait::async_trait;
use ds_core::{Error, Result};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How the credential is attached to requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
  /// `X-Api-Key` header
  ApiKey,
  /// `Authorization: Bearer` header
  Bearer,
}

/// A freshly issued bearer token
#[derive(Debug, Clone)]
pub struct Token {
  /// The token string
  pub secret: String,
  /// Remaining validity; None means the issuer did not say
  pub expires_in: Option<Duration>,
}

impl Token {
  /// Token with unknown validity
  pub fn new(secret: impl Into<String>) -> Self {
    Token { secret: secret.into(), expires_in: None }
  }
}

/// Callback used to obtain a new bearer token when the current one expires
/// or is rejected with 401.
///
/// Returning `None` signals permanent authentication failure; the provider
/// raises [`Error::Authentication`] without further attempts.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
  /// Obtain a fresh token, or None if the credential is beyond recovery
  async fn refresh(&self) -> Option<Token>;
}

/// Adapter so plain async closures can serve as refreshers.
pub struct RefreshFn<F>(
  /// The wrapped closure
  pub F,
);

#[async_trait]
impl<F> TokenRefresher for RefreshFn<F>
where
  F: Fn() -> BoxFuture<'static, Option<Token>> + Send + Sync,
{
  async fn refresh(&self) -> Option<Token> {
    (self.0)().await
  }
}

#[derive(Debug)]
enum CredentialState {
  /// Fixed secret, never expires
  Static { secret: String },
  /// Refreshable bearer token plus optional absolute expiry
  Refreshable { token: Option<String>, expires_at: Option<Instant> },
}

/// Resolves the credential for each request and coordinates refreshes.
///
/// This is the one shared critical section of the client: the token is
/// platform-wide, so all operation classes serialize on it during refresh.
pub struct TokenProvider {
  scheme: AuthScheme,
  state: Mutex<CredentialState>,
  refresher: Option<Arc<dyn TokenRefresher>>,
}

impl TokenProvider {
  /// Static API-key credential
  pub fn api_key(secret: impl Into<String>) -> Self {
    TokenProvider {
      scheme: AuthScheme::ApiKey,
      state: Mutex::new(CredentialState::Static { secret: secret.into() }),
      refresher: None,
    }
  }

  /// Static bearer-token credential
  pub fn bearer(token: impl Into<String>) -> Self {
    TokenProvider {
      scheme: AuthScheme::Bearer,
      state: Mutex::new(CredentialState::Static { secret: token.into() }),
      refresher: None,
    }
  }

  /// Unified-token credential: caller-supplied bearer token with a refresh
  /// callback. `initial` may be None, in which case the first request
  /// triggers a refresh.
  pub fn unified(initial: Option<Token>, refresher: Arc<dyn TokenRefresher>) -> Self {
    let (token, expires_at) = match initial {
      Some(t) => (Some(t.secret), t.expires_in.map(|d| Instant::now() + d)),
      None => (None, None),
    };
    TokenProvider {
      scheme: AuthScheme::Bearer,
      state: Mutex::new(CredentialState::Refreshable { token, expires_at }),
      refresher: Some(refresher),
    }
  }

  /// Header scheme used by this credential
  pub fn scheme(&self) -> AuthScheme {
    self.scheme
  }

  /// Resolve the current credential, refreshing first if it is known
  /// to be expired.
  pub async fn token(&self) -> Result<String> {
    let mut state = self.state.lock().await;
    match &*state {
      CredentialState::Static { secret } => Ok(secret.clone()),
      CredentialState::Refreshable { token: Some(token), expires_at } => {
        let expired = expires_at.map(|at| Instant::now() >= at).unwrap_or(false);
        if expired {
          debug!("cached token expired, refreshing");
          self.refresh_locked(&mut state).await
        } else {
          Ok(token.clone())
        }
      }
      CredentialState::Refreshable { token: None, .. } => {
        debug!("no cached token, performing initial refresh");
        self.refresh_locked(&mut state).await
      }
    }
  }

  /// React to an explicit 401 for a request that used `failed_token`.
  ///
  /// If another caller already replaced the token, the replacement is
  /// returned as-is; otherwise exactly one refresh is forced. Static
  /// credentials cannot recover from 401.
  pub async fn handle_unauthorized(&self, failed_token: &str) -> Result<String> {
    let mut state = self.state.lock().await;
    match &*state {
      CredentialState::Static { .. } => {
        Err(Error::Authentication("credential rejected by server".to_string()))
      }
      CredentialState::Refreshable { token, .. } => {
        if let Some(current) = token {
          if current != failed_token {
            debug!("token already refreshed by another caller, reusing");
            return Ok(current.clone());
          }
        }
        warn!("401 received, forcing token refresh");
        self.refresh_locked(&mut state).await
      }
    }
  }

  /// Refresh while the state lock is held (single-flight).
  async fn refresh_locked(&self, state: &mut CredentialState) -> Result<String> {
    let refresher = self
      .refresher
      .as_ref()
      .ok_or_else(|| Error::Authentication("no refresh callback configured".to_string()))?;

    match refresher.refresh().await {
      None => {
        warn!("refresh callback signaled permanent authentication failure");
        Err(Error::Authentication(
          "token refresh callback signaled permanent failure".to_string(),
        ))
      }
      Some(token) if token.secret.is_empty() => {
        Err(Error::Authentication("token refresh callback returned an empty token".to_string()))
      }
      Some(token) => {
        info!("unified token refreshed");
        *state = CredentialState::Refreshable {
          token: Some(token.secret.clone()),
          expires_at: token.expires_in.map(|d| Instant::now() + d),
        };
        Ok(token.secret)
      }
    }
  }
}

impl std::fmt::Debug for TokenProvider {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TokenProvider").field("scheme", &self.scheme).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  struct CountingRefresher {
    calls: AtomicU32,
    result: Option<&'static str>,
  }

  #[async_trait]
  impl TokenRefresher for CountingRefresher {
    async fn refresh(&self) -> Option<Token> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
      self.result.map(|prefix| Token::new(format!("{prefix}-{n}")))
    }
  }

  #[tokio::test]
  async fn test_static_key_never_refreshes() {
    let provider = TokenProvider::api_key("secret");
    assert_eq!(provider.token().await.unwrap(), "secret");
    assert_eq!(provider.scheme(), AuthScheme::ApiKey);
    // a 401 on a static credential is permanent
    assert!(matches!(
      provider.handle_unauthorized("secret").await,
      Err(Error::Authentication(_))
    ));
  }

  #[tokio::test]
  async fn test_unified_initial_refresh() {
    let refresher = Arc::new(CountingRefresher { calls: AtomicU32::new(0), result: Some("tok") });
    let provider = TokenProvider::unified(None, refresher.clone());

    assert_eq!(provider.token().await.unwrap(), "tok-1");
    // cached afterwards
    assert_eq!(provider.token().await.unwrap(), "tok-1");
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_expired_token_triggers_refresh() {
    let refresher = Arc::new(CountingRefresher { calls: AtomicU32::new(0), result: Some("tok") });
    let initial = Token { secret: "stale".to_string(), expires_in: Some(Duration::ZERO) };
    let provider = TokenProvider::unified(Some(initial), refresher);

    // expiry is in the past, so the stale token must never be exposed
    assert_eq!(provider.token().await.unwrap(), "tok-1");
  }

  #[tokio::test]
  async fn test_unauthorized_skips_refresh_when_already_replaced() {
    let refresher = Arc::new(CountingRefresher { calls: AtomicU32::new(0), result: Some("tok") });
    let provider = TokenProvider::unified(Some(Token::new("old")), refresher.clone());

    // first caller refreshes
    assert_eq!(provider.handle_unauthorized("old").await.unwrap(), "tok-1");
    // second caller reports the same stale token; no second refresh
    assert_eq!(provider.handle_unauthorized("old").await.unwrap(), "tok-1");
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_closure_refresher_adapter() {
    let refresher = Arc::new(RefreshFn(|| {
      Box::pin(async { Some(Token::new("closure-tok")) }) as BoxFuture<'static, Option<Token>>
    }));
    let provider = TokenProvider::unified(None, refresher);

    assert_eq!(provider.token().await.unwrap(), "closure-tok");
  }

  #[tokio::test]
  async fn test_none_from_callback_is_permanent_failure() {
    let refresher = Arc::new(CountingRefresher { calls: AtomicU32::new(0), result: None });
    let provider = TokenProvider::unified(Some(Token::new("old")), refresher);

    let err = provider.handle_unauthorized("old").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));
  }
}
