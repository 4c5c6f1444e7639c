// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Offline JWT validity inspection for ArgoCD bearer tokens (structure and exp claim only)
// role: argocd/auth
// inputs: Raw token string; reference "now"
// outputs: TokenStatus with a human-readable message
// invariants:
// - No signature verification and no network access
// - Base64url payload padding is tolerated
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Local, TimeZone};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
  Valid {
    expires_at: DateTime<Local>,
    remaining: Duration,
  },
  NoExpiry,
  Expired { expired_at: DateTime<Local> },
  Malformed { reason: String },
}

impl TokenStatus {
  pub fn is_usable(&self) -> bool {
    matches!(self, TokenStatus::Valid { .. } | TokenStatus::NoExpiry)
  }
}

impl fmt::Display for TokenStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TokenStatus::Valid { remaining, .. } => write!(f, "token valid ({} remaining)", format_remaining(*remaining)),
      TokenStatus::NoExpiry => f.write_str("token well-formed but carries no expiry"),
      TokenStatus::Expired { expired_at } => {
        write!(f, "token expired (at {})", expired_at.format("%Y-%m-%d %H:%M:%S"))
      }
      TokenStatus::Malformed { reason } => write!(f, "token malformed: {}", reason),
    }
  }
}

pub fn inspect_token(token: &str, now: DateTime<Local>) -> TokenStatus {
  let parts: Vec<&str> = token.trim().split('.').collect();
  if parts.len() != 3 {
    return TokenStatus::Malformed {
      reason: "not a JWT (expected three dot-separated parts)".into(),
    };
  }

  let Some(payload) = decode_payload(parts[1]) else {
    return TokenStatus::Malformed {
      reason: "payload could not be decoded".into(),
    };
  };

  let Some(exp) = payload.get("exp") else {
    return TokenStatus::NoExpiry;
  };

  // NumericDate may carry a fractional part.
  let secs = exp.as_i64().or_else(|| exp.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64));
  let Some(expires_at) = secs.and_then(|secs| Local.timestamp_opt(secs, 0).single()) else {
    return TokenStatus::Malformed {
      reason: format!("exp claim is not a timestamp: {}", exp),
    };
  };

  if now > expires_at {
    TokenStatus::Expired { expired_at: expires_at }
  } else {
    TokenStatus::Valid {
      expires_at,
      remaining: expires_at - now,
    }
  }
}

fn decode_payload(segment: &str) -> Option<Value> {
  let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;
  serde_json::from_slice(&bytes).ok()
}

/// "2d 3h", "4h 10m" or "12m".
pub fn format_remaining(d: Duration) -> String {
  let days = d.num_days();
  let hours = d.num_hours() % 24;
  let minutes = d.num_minutes() % 60;

  if days > 0 {
    format!("{}d {}h", days, hours)
  } else if hours > 0 {
    format!("{}h {}m", hours, minutes)
  } else {
    format!("{}m", minutes)
  }
}
