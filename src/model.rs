// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the records shared by extraction, comparison and export (issues, images, batch outcomes)
// role: model/types
// outputs: Serializable structs with stable field names
// invariants:
// - IssueRecord.affects_projects_raw == affects_projects.join(", ")
// - ServiceImageResult carries exactly one of image_tag / error_message
// - BatchOutcome.success and BatchOutcome.failed never share a key
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IssueRecord {
  pub issue_key: String,
  pub summary: String,
  pub status: String,
  pub affects_projects: Vec<String>,
  pub affects_projects_raw: String,
}

impl IssueRecord {
  pub fn new(issue_key: String, summary: String, status: String, affects_projects: Vec<String>) -> Self {
    let affects_projects_raw = affects_projects.join(", ");
    Self {
      issue_key,
      summary,
      status,
      affects_projects,
      affects_projects_raw,
    }
  }

  pub fn project_count(&self) -> usize {
    self.affects_projects.len()
  }
}

/// An issue that could not be turned into a record; the rest of the batch continues.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IssueFailure {
  pub issue_key: Option<String>,
  pub error: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
  pub field_id: String,
  pub jql: String,
  pub used_fallback: bool,
  pub records: Vec<IssueRecord>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub failures: Vec<IssueFailure>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ServiceImageResult {
  Found { service_name: String, image_tag: String },
  Failed { service_name: String, error_message: String },
}

impl ServiceImageResult {
  pub fn service_name(&self) -> &str {
    match self {
      ServiceImageResult::Found { service_name, .. } | ServiceImageResult::Failed { service_name, .. } => service_name,
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
  pub success: BTreeMap<String, String>,
  pub failed: BTreeMap<String, String>,
  pub details: Vec<ServiceImageResult>,
}

impl BatchOutcome {
  /// Record one service result. A later result for the same service replaces the earlier one.
  pub fn push(&mut self, result: ServiceImageResult) {
    self.details.retain(|d| d.service_name() != result.service_name());
    match &result {
      ServiceImageResult::Found { service_name, image_tag } => {
        self.failed.remove(service_name);
        self.success.insert(service_name.clone(), image_tag.clone());
      }
      ServiceImageResult::Failed { service_name, error_message } => {
        self.success.remove(service_name);
        self.failed.insert(service_name.clone(), error_message.clone());
      }
    }
    self.details.push(result);
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TagChange {
  pub previous: String,
  pub current: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ImageComparison {
  pub added: BTreeMap<String, String>,
  pub updated: BTreeMap<String, TagChange>,
  pub unchanged: BTreeMap<String, String>,
  pub removed: BTreeMap<String, String>,
}

impl ImageComparison {
  pub fn total_changes(&self) -> usize {
    self.added.len() + self.updated.len() + self.removed.len()
  }
}
