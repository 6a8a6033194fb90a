//! HTTP transport layer with retry, backoff and re-authentication
//!
//! All network I/O of the client goes through [`Transport`]. Outcomes are
//! classified per status code: 2xx parses and returns, 401 forces a single
//! token refresh, 429 and 5xx are retried with jittered exponential backoff
//! (a `Retry-After` hint wins over the computed wait), remaining 4xx are
//! surfaced as validation errors without retry. A 429 that survives the
//! whole retry budget converts to [`Error::RateLimit`] with no hint, so
//! callers handle one error type for every rate-limiting cause.

use crate::auth::{AuthScheme, TokenProvider};
use ds_core::{Error, Result};
use rand::Rng;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Total authentication attempts per logical call (initial + one refresh)
const MAX_AUTH_ATTEMPTS: u32 = 2;

/// First-attempt upper bound for the jittered backoff wait
const BACKOFF_BASE_MS: u64 = 250;

/// HTTP transport for one endpoint base (platform, content store or
/// identity service), carrying its own credential.
pub struct Transport {
  client: Client,
  base_url: String,
  token_provider: TokenProvider,
  max_retries: u32,
  backoff_max: Duration,
}

impl Transport {
  /// Create a new transport instance
  pub fn new(
    base_url: impl Into<String>,
    token_provider: TokenProvider,
    timeout_secs: u64,
    max_retries: u32,
    backoff_max_ms: u64,
  ) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .user_agent(concat!("ds-client/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| Error::Http(format!("Failed to create HTTP client: {e}")))?;

    let mut base_url = base_url.into();
    while base_url.ends_with('/') {
      base_url.pop();
    }

    Ok(Self {
      client,
      base_url,
      token_provider,
      max_retries,
      backoff_max: Duration::from_millis(backoff_max_ms),
    })
  }

  /// GET returning the parsed JSON body
  pub async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
    let (_, value) = self.execute(Method::GET, path, params, None, &[]).await?;
    Ok(value)
  }

  /// POST returning the parsed JSON body
  pub async fn post(&self, path: &str, params: &[(&str, String)], body: &Value) -> Result<Value> {
    let (_, value) = self.execute(Method::POST, path, params, Some(body), &[]).await?;
    Ok(value)
  }

  /// POST where some non-2xx statuses are expected and returned to the
  /// caller instead of raising (e.g. 404 for "user not found").
  pub async fn post_with_expected(
    &self,
    path: &str,
    params: &[(&str, String)],
    body: &Value,
    expected: &[u16],
  ) -> Result<(u16, Value)> {
    self.execute(Method::POST, path, params, Some(body), expected).await
  }

  /// DELETE; the body, if any, is discarded
  pub async fn delete(&self, path: &str) -> Result<()> {
    self.execute(Method::DELETE, path, &[], None, &[]).await?;
    Ok(())
  }

  /// Issue one logical request, absorbing transient failures up to the
  /// retry budget and re-authenticating once on 401.
  #[instrument(skip(self, params, body, expected), fields(method = %method, path = %path))]
  async fn execute(
    &self,
    method: Method,
    path: &str,
    params: &[(&str, String)],
    body: Option<&Value>,
    expected: &[u16],
  ) -> Result<(u16, Value)> {
    let url = self.endpoint(path)?;
    let mut attempt: u32 = 0;
    let mut auth_attempts: u32 = 0;

    loop {
      let token = self.token_provider.token().await?;

      let mut request = self.client.request(method.clone(), url.clone());
      if !params.is_empty() {
        request = request.query(params);
      }
      request = match self.token_provider.scheme() {
        AuthScheme::ApiKey => request.header("X-Api-Key", &token),
        AuthScheme::Bearer => request.bearer_auth(&token),
      };
      if let Some(body) = body {
        request = request.json(body);
      }

      debug!("dispatching request (attempt {})", attempt + 1);
      let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
          // connection-level failures (timeout, refused) are transient
          attempt += 1;
          if attempt >= self.max_retries {
            error!("request failed after {attempt} attempts: {e}");
            return Err(Error::Http(format!("request failed: {e}")));
          }
          let delay = self.backoff_delay(attempt, None);
          warn!("connection error, retrying in {}ms: {e}", delay.as_millis());
          tokio::time::sleep(delay).await;
          continue;
        }
      };

      let status = response.status();
      debug!("received status {status}");

      if status.is_success() {
        return Ok((status.as_u16(), read_json(response).await?));
      }

      if expected.contains(&status.as_u16()) {
        return Ok((status.as_u16(), Value::Null));
      }

      match status {
        StatusCode::UNAUTHORIZED => {
          auth_attempts += 1;
          if auth_attempts >= MAX_AUTH_ATTEMPTS {
            error!("authentication failed after {auth_attempts} attempts");
            return Err(Error::Authentication(format!(
              "authentication failed after {auth_attempts} attempts"
            )));
          }
          // one forced re-fetch; does not consume the transient budget
          self.token_provider.handle_unauthorized(&token).await?;
        }
        StatusCode::TOO_MANY_REQUESTS => {
          let hint = retry_after(&response);
          attempt += 1;
          if attempt >= self.max_retries {
            warn!("rate limited by server after {attempt} attempts");
            return Err(Error::RateLimit {
              retry_after: None,
              message: format!("server returned 429 for {} attempts", attempt),
            });
          }
          let delay = self.backoff_delay(attempt, hint);
          warn!("server rate limit, retrying in {}ms", delay.as_millis());
          tokio::time::sleep(delay).await;
        }
        status if status.is_server_error() => {
          let message = read_error_body(response).await;
          attempt += 1;
          if attempt >= self.max_retries {
            error!("service error {status} after {attempt} attempts: {message}");
            return Err(Error::Service { status: status.as_u16(), message });
          }
          let delay = self.backoff_delay(attempt, None);
          warn!("transient {status}, retrying in {}ms", delay.as_millis());
          tokio::time::sleep(delay).await;
        }
        status => {
          // remaining 4xx: the request itself is wrong, retrying won't help
          let message = read_error_body(response).await;
          error!("request rejected with {status}: {message}");
          return Err(Error::Validation(format!("{}: {message}", status.as_u16())));
        }
      }
    }
  }

  /// PUT raw bytes to a pre-signed storage URL.
  ///
  /// The link embeds its own authorization and is single-use, so neither
  /// the credential nor the retry treatment applies.
  pub async fn put_signed(
    &self,
    url: &str,
    headers: &[(&str, &str)],
    body: Vec<u8>,
  ) -> Result<()> {
    let mut request = self.client.put(url);
    for (name, value) in headers {
      request = request.header(*name, *value);
    }

    debug!(url, "uploading to signed link");
    let response =
      request.body(body).send().await.map_err(|e| Error::Http(format!("upload failed: {e}")))?;

    let status = response.status();
    if status.is_success() {
      Ok(())
    } else {
      let message = read_error_body(response).await;
      error!("signed upload rejected with {status}: {message}");
      Err(Error::Service { status: status.as_u16(), message })
    }
  }

  /// GET raw bytes from a pre-signed storage URL.
  pub async fn get_signed(&self, url: &str) -> Result<Vec<u8>> {
    debug!(url, "downloading from signed link");
    let response =
      self.client.get(url).send().await.map_err(|e| Error::Http(format!("download failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
      let message = read_error_body(response).await;
      error!("signed download rejected with {status}: {message}");
      return Err(Error::Service { status: status.as_u16(), message });
    }

    let bytes =
      response.bytes().await.map_err(|e| Error::Http(format!("failed to read body: {e}")))?;
    Ok(bytes.to_vec())
  }

  /// Build the full endpoint URL
  fn endpoint(&self, path: &str) -> Result<Url> {
    let full = format!("{}/{}", self.base_url, path.trim_matches('/'));
    Url::parse(&full).map_err(|e| Error::Http(format!("invalid URL {full}: {e}")))
  }

  /// Wait before retry `attempt` (1-based): uniform jitter over an
  /// exponentially growing, capped interval. A server-provided hint
  /// overrides the computed wait.
  fn backoff_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
    if let Some(hint) = hint {
      return hint.min(self.backoff_max);
    }
    let exp = BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(16));
    let upper = exp.min(self.backoff_max.as_millis() as u64);
    Duration::from_millis(rand::thread_rng().gen_range(0..=upper))
  }

  /// The base URL this transport talks to
  pub fn base_url(&self) -> &str {
    &self.base_url
  }
}

/// Parse the `Retry-After` header as whole seconds, if present.
fn retry_after(response: &Response) -> Option<Duration> {
  response
    .headers()
    .get("Retry-After")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.parse::<u64>().ok())
    .map(Duration::from_secs)
}

/// Read a successful body as JSON; empty bodies (e.g. 204) become Null.
async fn read_json(response: Response) -> Result<Value> {
  let text =
    response.text().await.map_err(|e| Error::Http(format!("failed to read body: {e}")))?;
  if text.is_empty() {
    return Ok(Value::Null);
  }
  serde_json::from_str(&text)
    .map_err(|e| Error::Validation(format!("malformed response body: {e}")))
}

/// Best-effort error detail, truncated for log hygiene.
async fn read_error_body(response: Response) -> String {
  match response.text().await {
    Ok(text) if !text.is_empty() => text.chars().take(500).collect(),
    _ => "<no body>".to_string(),
  }
}

impl std::fmt::Debug for Transport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Transport")
      .field("base_url", &self.base_url)
      .field("max_retries", &self.max_retries)
      .finish()
  }
}
