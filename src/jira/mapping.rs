// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Project-mapping table (source name -> extra project names) with expansion and JSON persistence
// role: jira/mapping
// inputs: Token lists from the field normalizer; mapping file path
// outputs: Expanded token lists; mapping file on disk (whole-file replace)
// side_effects: save/replace write the mapping file; load only reads
// invariants:
// - Keys match tokens by exact, case-insensitive equality (never substring)
// - Originals keep their order and precede appended targets; each target appended at most once
// - Expansion is not recursive; an empty table is the identity
// - Missing or unreadable file => built-in default table (logged), never an error
// errors: save/replace surface I/O and serialization errors; load swallows them with a warning
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ExtractError, Result};

pub const DEFAULT_MAPPING_PATH: &str = "config/project_mapping.json";
const DOCUMENT_VERSION: &str = "1.0";
const DOCUMENT_DESCRIPTION: &str = "Affects-project expansion rules: when a key is listed on an issue, the mapped projects are added";

/// On-disk representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingDocument {
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub version: String,
  #[serde(default)]
  pub last_updated: String,
  pub mappings: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMappingTable {
  mappings: BTreeMap<String, Vec<String>>,
}

impl Default for ProjectMappingTable {
  fn default() -> Self {
    Self::builtin()
  }
}

impl ProjectMappingTable {
  pub fn new(mappings: BTreeMap<String, Vec<String>>) -> Self {
    Self { mappings }
  }

  pub fn empty() -> Self {
    Self::new(BTreeMap::new())
  }

  /// Table used when no mapping file exists yet.
  pub fn builtin() -> Self {
    let mut m = BTreeMap::new();
    m.insert("aca".to_string(), vec!["aca-cn".to_string()]);
    m.insert("aims-service-cloud".to_string(), vec!["aims-web-cloud".to_string()]);
    m.insert("program-service-cloud".to_string(), vec!["program-web-cloud".to_string()]);
    Self::new(m)
  }

  pub fn mappings(&self) -> &BTreeMap<String, Vec<String>> {
    &self.mappings
  }

  /// Append mapped targets for every token whose trimmed form equals a key (case-insensitive).
  pub fn expand(&self, tokens: &[String]) -> Vec<String> {
    let mut out: Vec<String> = tokens.to_vec();
    if self.mappings.is_empty() {
      return out;
    }

    for token in tokens {
      let needle = token.trim().to_lowercase();

      for (key, targets) in &self.mappings {
        if key.trim().to_lowercase() != needle {
          continue;
        }
        for target in targets {
          if !out.iter().any(|existing| existing == target) {
            out.push(target.clone());
          }
        }
      }
    }

    out
  }

  /// Load from `path`; absent or unparseable files fall back to the built-in table.
  pub fn load(path: &Path) -> Self {
    let text = match std::fs::read_to_string(path) {
      Ok(t) => t,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        info!(path = %path.display(), "no mapping file; using built-in project mappings");
        return Self::builtin();
      }
      Err(e) => {
        warn!(path = %path.display(), error = %e, "cannot read mapping file; using built-in project mappings");
        return Self::builtin();
      }
    };

    match serde_json::from_str::<MappingDocument>(&text) {
      Ok(doc) => {
        info!(path = %path.display(), entries = doc.mappings.len(), "loaded project mappings");
        Self::new(doc.mappings)
      }
      Err(e) => {
        let err = ExtractError::Configuration(format!("{}: {}", path.display(), e));
        warn!(error = %err, "invalid mapping file; using built-in project mappings");
        Self::builtin()
      }
    }
  }

  pub fn to_document(&self, now: DateTime<Local>) -> MappingDocument {
    MappingDocument {
      description: DOCUMENT_DESCRIPTION.to_string(),
      version: DOCUMENT_VERSION.to_string(),
      last_updated: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
      mappings: self.mappings.clone(),
    }
  }

  /// Write the whole table to `path`, creating parent directories.
  pub fn save(&self, path: &Path, now: DateTime<Local>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent.display().to_string(), e))?;
    }
    let bytes = serde_json::to_vec_pretty(&self.to_document(now))
      .map_err(|e| ExtractError::Configuration(format!("serializing mappings: {}", e)))?;
    std::fs::write(path, bytes).map_err(|e| ExtractError::io(path.display().to_string(), e))?;

    info!(path = %path.display(), entries = self.mappings.len(), "saved project mappings");
    Ok(())
  }

  /// Replace the whole table and persist it. No merging with previous entries.
  pub fn replace(&mut self, mappings: BTreeMap<String, Vec<String>>, path: &Path, now: DateTime<Local>) -> Result<()> {
    self.mappings = mappings;
    self.save(path, now)
  }
}
