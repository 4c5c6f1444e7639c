// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Orchestrate Jira extraction: search, per-issue normalization, mapping expansion, failure isolation
// role: jira/orchestration
// inputs: Transport (owned), Jira base URL, ProjectMappingTable (owned), search target, optional field id
// outputs: ExtractionReport { records, failures, field_id, jql, used_fallback }
// side_effects: Network calls only; the mapping table is loaded once at construction
// invariants:
// - One IssueRecord per well-formed issue, in search order
// - A malformed issue lands in failures and never aborts the batch
// - Only the search step can fail the whole extraction
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ExtractError, Result};
use crate::ext::serde_json::JsonFetch;
use crate::http::Transport;
use crate::jira::field_detect::{detect_affects_project_field, FieldGuess};
use crate::jira::field_value::normalize;
use crate::jira::mapping::ProjectMappingTable;
use crate::jira::search::{IssueSearcher, SearchTarget};
use crate::model::{ExtractionReport, IssueFailure, IssueRecord};

const BASE_FIELDS: [&str; 3] = ["summary", "key", "status"];

pub struct JiraExtractor {
  transport: Box<dyn Transport>,
  base_url: String,
  mappings: ProjectMappingTable,
}

impl JiraExtractor {
  pub fn new(transport: Box<dyn Transport>, base_url: impl Into<String>, mappings: ProjectMappingTable) -> Self {
    Self {
      transport,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      mappings,
    }
  }

  /// Construct with the mapping table loaded from `mapping_path` (default table when absent).
  pub fn with_mapping_file(transport: Box<dyn Transport>, base_url: impl Into<String>, mapping_path: &Path) -> Self {
    Self::new(transport, base_url, ProjectMappingTable::load(mapping_path))
  }

  pub fn detect_field(&self, target: &SearchTarget) -> FieldGuess {
    detect_affects_project_field(self.transport.as_ref(), &self.base_url, target)
  }

  pub fn extract(&self, target: &SearchTarget, field_id: Option<&str>, max_results: usize) -> Result<ExtractionReport> {
    // Phase 1: resolve the field holding affects-project data
    let field_id = match field_id.map(str::trim).filter(|f| !f.is_empty()) {
      Some(f) => f.to_string(),
      None => self.detect_field(target).field_id,
    };

    // Phase 2: search
    let mut fields: Vec<String> = BASE_FIELDS.iter().map(|s| s.to_string()).collect();
    fields.push(field_id.clone());

    let searcher = IssueSearcher::new(self.transport.as_ref(), &self.base_url);
    let found = searcher.search(target, &fields, max_results)?;

    // Phase 3: per-issue records, failures isolated
    let mut records = Vec::with_capacity(found.issues.len());
    let mut failures = Vec::new();

    for issue in &found.issues {
      match self.record_for(issue, &field_id) {
        Ok(r) => records.push(r),
        Err(e) => {
          let issue_key = issue.fetch("key").to::<String>();
          warn!(issue = ?issue_key, error = %e, "skipping malformed issue");
          failures.push(IssueFailure {
            issue_key,
            error: e.to_string(),
          });
        }
      }
    }

    info!(
      records = records.len(),
      failures = failures.len(),
      field = %field_id,
      fallback = found.used_fallback,
      "jira extraction finished"
    );

    Ok(ExtractionReport {
      field_id,
      jql: found.jql,
      used_fallback: found.used_fallback,
      records,
      failures,
    })
  }

  fn record_for(&self, issue: &Value, field_id: &str) -> Result<IssueRecord> {
    let key = issue
      .fetch("key")
      .to::<String>()
      .filter(|k| !k.trim().is_empty())
      .ok_or_else(|| ExtractError::MalformedInput("issue without a key".into()))?;

    let fields = issue
      .get("fields")
      .and_then(Value::as_object)
      .ok_or_else(|| ExtractError::MalformedInput(format!("issue {} has no fields object", key)))?;

    let summary = fields.get("summary").and_then(Value::as_str).unwrap_or_default().to_string();
    let status = fields
      .get("status")
      .and_then(|s| s.get("name"))
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string();

    let normalized = normalize(fields.get(field_id));
    let projects = self.mappings.expand(&normalized.tokens);

    Ok(IssueRecord::new(key, summary, status, projects))
  }
}
