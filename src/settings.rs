// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Persisted tool settings (last-used ArgoCD environment/services and Jira connection details)
// role: config/settings
// inputs: Settings file path (default config/settings.json)
// outputs: ToolSettings used as defaults for omitted CLI flags
// side_effects: save rewrites the whole file
// invariants:
// - Tokens are never part of the persisted document
// - Missing or malformed file => defaults (malformed is logged), never an error
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::argocd::environment::Environment;
use crate::error::{ExtractError, Result};

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgoCdSettings {
  #[serde(default)]
  pub environment: Option<Environment>,
  #[serde(default)]
  pub services: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraSettings {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filter_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub field_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
  #[serde(default)]
  pub argocd: ArgoCdSettings,
  #[serde(default)]
  pub jira: JiraSettings,
}

impl ToolSettings {
  pub fn load(path: &Path) -> Self {
    let text = match std::fs::read_to_string(path) {
      Ok(t) => t,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
      Err(e) => {
        warn!(path = %path.display(), error = %e, "cannot read settings; using defaults");
        return Self::default();
      }
    };

    serde_json::from_str(&text).unwrap_or_else(|e| {
      warn!(path = %path.display(), error = %e, "invalid settings file; using defaults");
      Self::default()
    })
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent.display().to_string(), e))?;
    }
    let bytes = serde_json::to_vec_pretty(self)
      .map_err(|e| ExtractError::Configuration(format!("serializing settings: {}", e)))?;
    std::fs::write(path, bytes).map_err(|e| ExtractError::io(path.display().to_string(), e))?;
    info!(path = %path.display(), "saved settings");
    Ok(())
  }
}
