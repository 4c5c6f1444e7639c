// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Guess which Jira custom field holds "affects project" data from a small issue sample
// role: jira/heuristics
// inputs: IssueSearcher (sample), Transport (issue detail with expand=names), search target
// outputs: A custom field id; FALLBACK_FIELD_ID in degraded conditions
// side_effects: Network calls (one search + one detail call per sampled issue)
// invariants:
// - Fields are scanned in lexicographic field-id order; the first match wins
// - Never returns "not found": no sample, no match, or any error => FALLBACK_FIELD_ID
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::ext::serde_json::{JsonFetch, JsonShape};
use crate::http::Transport;
use crate::jira::search::{IssueSearcher, SearchTarget};

/// Affects Project field on the QIMA Jira instance.
pub const FALLBACK_FIELD_ID: &str = "customfield_10423";
pub const SAMPLE_SIZE: usize = 5;
const KEYWORDS: [&str; 6] = ["service", "cloud", "legacy", "web", "api", "project"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldGuess {
  pub field_id: String,
  /// Display name from the `names` dictionary, when the guess came from a real match.
  pub field_name: Option<String>,
  pub detected: bool,
}

impl FieldGuess {
  fn fallback() -> Self {
    Self {
      field_id: FALLBACK_FIELD_ID.to_string(),
      field_name: None,
      detected: false,
    }
  }
}

pub fn detect_affects_project_field(transport: &dyn Transport, base_url: &str, target: &SearchTarget) -> FieldGuess {
  match try_detect(transport, base_url, target) {
    Ok(Some(guess)) => {
      info!(field = %guess.field_id, name = ?guess.field_name, "detected affects-project field");
      guess
    }
    Ok(None) => {
      warn!(fallback = FALLBACK_FIELD_ID, "no affects-project field detected; using fallback");
      FieldGuess::fallback()
    }
    Err(e) => {
      warn!(error = %e, fallback = FALLBACK_FIELD_ID, "field detection failed; using fallback");
      FieldGuess::fallback()
    }
  }
}

fn try_detect(transport: &dyn Transport, base_url: &str, target: &SearchTarget) -> Result<Option<FieldGuess>> {
  let searcher = IssueSearcher::new(transport, base_url);
  let sample = searcher.search(target, &["key".to_string()], SAMPLE_SIZE)?;

  if sample.issues.is_empty() {
    info!(jql = %sample.jql, "field detection sample is empty");
    return Ok(None);
  }

  for issue in &sample.issues {
    let Some(key) = issue.fetch("key").to::<String>() else { continue };
    let url = format!("{}/rest/api/3/issue/{}", base_url.trim_end_matches('/'), key);
    let detail = transport
      .get(&url, &[("expand", "names".to_string())])?
      .into_json(&url, &format!("issue {}", key))?;

    if let Some(guess) = match_field(&detail) {
      return Ok(Some(guess));
    }
  }

  Ok(None)
}

/// Inspect one issue-detail payload (`fields` + `names`).
pub fn match_field(detail: &Value) -> Option<FieldGuess> {
  let fields = detail.get("fields")?.as_object()?;
  let names = detail.get("names").and_then(Value::as_object);

  // serde_json::Map iterates in key order, which pins tie-breaks to the field id.
  for (field_id, value) in fields {
    if !field_id.starts_with("customfield_") || !value.is_truthy() {
      continue;
    }

    let field_name = names
      .and_then(|n| n.get(field_id))
      .and_then(Value::as_str)
      .map(str::to_string);

    let name_lower = field_name.as_deref().unwrap_or("N/A").to_lowercase();
    let value_lower = value.as_str().map(str::to_lowercase);

    let hit = KEYWORDS.iter().any(|kw| {
      name_lower.contains(kw) || value_lower.as_deref().map(|v| v.contains(kw)).unwrap_or(false)
    });

    if hit {
      return Some(FieldGuess {
        field_id: field_id.clone(),
        field_name,
        detected: true,
      });
    }
  }

  None
}
