// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed error taxonomy shared by the Jira and ArgoCD clients
// role: errors/taxonomy
// outputs: ExtractError and the crate-wide Result alias
// invariants:
// - Every variant renders a distinct, human-readable message (no generic "error occurred")
// - EndpointRetired is recoverable; callers fall back before surfacing it
// - HTTP status mapping lives in one place (from_status)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Error, Debug)]
pub enum ExtractError {
  #[error("request failed: {0}")]
  Transport(String),

  #[error("HTTP {status} from {url}: {body}")]
  Status { status: u16, url: String, body: String },

  #[error("endpoint retired (HTTP 410): {0}")]
  EndpointRetired(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("token invalid or expired: {0}")]
  AuthInvalid(String),

  #[error("permission denied, check token permissions: {0}")]
  PermissionDenied(String),

  #[error("malformed input: {0}")]
  MalformedInput(String),

  #[error("configuration error: {0}")]
  Configuration(String),

  #[error("I/O error on {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

impl ExtractError {
  /// Map a non-2xx HTTP status onto the taxonomy. `what` names the resource for messages.
  pub fn from_status(status: u16, url: &str, what: &str, body: &str) -> Self {
    match status {
      401 => ExtractError::AuthInvalid(format!("{} rejected the credentials", what)),
      403 => ExtractError::PermissionDenied(what.to_string()),
      404 => ExtractError::NotFound(format!("{} does not exist", what)),
      410 => ExtractError::EndpointRetired(url.to_string()),
      _ => ExtractError::Status {
        status,
        url: url.to_string(),
        body: truncate_body(body),
      },
    }
  }

  pub fn is_retired(&self) -> bool {
    matches!(self, ExtractError::EndpointRetired(_))
  }

  pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
    ExtractError::Io {
      path: path.into(),
      source,
    }
  }
}

fn truncate_body(body: &str) -> String {
  const MAX: usize = 500;
  if body.len() <= MAX {
    return body.to_string();
  }
  let mut end = MAX;
  while !body.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}...", &body[..end])
}
