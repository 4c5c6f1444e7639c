// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: HTTP transport seam used by the Jira and ArgoCD clients (auth headers, timeouts, TLS toggle)
// role: io/http
// inputs: URL, query pairs or JSON body; Auth (bearer or basic)
// outputs: HttpReply { status, body } for every response that reached the server
// side_effects: Network calls
// invariants:
// - Non-2xx statuses are returned as replies, never as transport errors; callers classify them
// - Every request carries a 30s global timeout; no call blocks indefinitely
// - Network failures (DNS, connect, timeout, TLS) map to ExtractError::Transport
// errors: Transport for I/O failures; MalformedInput when a body is not JSON
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use crate::error::{ExtractError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials attached to every request.
#[derive(Clone)]
pub enum Auth {
  Bearer(String),
  Basic { user: String, secret: String },
}

impl Auth {
  /// Jira convention: an email means basic auth with the API token, otherwise bearer.
  pub fn for_jira(email: Option<&str>, token: &str) -> Self {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
      Some(user) => Auth::Basic {
        user: user.to_string(),
        secret: token.to_string(),
      },
      None => Auth::Bearer(token.to_string()),
    }
  }

  pub fn header_value(&self) -> String {
    match self {
      Auth::Bearer(t) => format!("Bearer {}", t),
      Auth::Basic { user, secret } => format!("Basic {}", STANDARD.encode(format!("{}:{}", user, secret))),
    }
  }
}

impl std::fmt::Debug for Auth {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Auth::Bearer(_) => f.write_str("Auth::Bearer(***)"),
      Auth::Basic { user, .. } => write!(f, "Auth::Basic({}:***)", user),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
  pub status: u16,
  pub body: String,
}

impl HttpReply {
  pub fn new(status: u16, body: impl Into<String>) -> Self {
    Self {
      status,
      body: body.into(),
    }
  }

  #[cfg(test)]
  pub fn ok_json(v: &serde_json::Value) -> Self {
    Self::new(200, v.to_string())
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn is_gone(&self) -> bool {
    self.status == 410
  }

  pub fn json(&self) -> Result<serde_json::Value> {
    serde_json::from_str(&self.body)
      .map_err(|e| ExtractError::MalformedInput(format!("response body is not JSON: {}", e)))
  }

  /// Parse a successful reply as JSON, or classify the status as an error.
  pub fn into_json(self, url: &str, what: &str) -> Result<serde_json::Value> {
    if self.is_success() {
      self.json()
    } else {
      Err(ExtractError::from_status(self.status, url, what, &self.body))
    }
  }
}

// --- Trait seam for HTTP ---
pub trait Transport {
  fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpReply>;
  fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpReply>;
}

/// ureq-backed transport owning one Agent (connection pool) per client.
pub struct UreqTransport {
  agent: ureq::Agent,
  auth: Auth,
}

impl UreqTransport {
  pub fn new(auth: Auth, verify_tls: bool) -> Self {
    Self::with_timeout(auth, verify_tls, DEFAULT_TIMEOUT)
  }

  pub fn with_timeout(auth: Auth, verify_tls: bool, timeout: Duration) -> Self {
    let tls = ureq::tls::TlsConfig::builder()
      .disable_verification(!verify_tls)
      .build();

    let agent: ureq::Agent = ureq::Agent::config_builder()
      .timeout_global(Some(timeout))
      .http_status_as_error(false)
      .tls_config(tls)
      .build()
      .into();

    Self { agent, auth }
  }

  fn finish(url: &str, resp: std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>) -> Result<HttpReply> {
    let mut r = resp.map_err(|e| ExtractError::Transport(format!("{}: {}", url, e)))?;
    let status = r.status().as_u16();
    let body = r
      .body_mut()
      .read_to_string()
      .map_err(|e| ExtractError::Transport(format!("reading body from {}: {}", url, e)))?;

    debug!(url, status, bytes = body.len(), "http reply");

    Ok(HttpReply::new(status, body))
  }
}

impl Transport for UreqTransport {
  fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpReply> {
    let mut req = self
      .agent
      .get(url)
      .header("Accept", "application/json")
      .header("User-Agent", "release-scope")
      .header("Authorization", &self.auth.header_value());

    for (k, v) in query {
      req = req.query(*k, v.as_str());
    }

    Self::finish(url, req.call())
  }

  fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpReply> {
    let resp = self
      .agent
      .post(url)
      .header("Accept", "application/json")
      .header("User-Agent", "release-scope")
      .header("Authorization", &self.auth.header_value())
      .send_json(body);

    Self::finish(url, resp)
  }
}
