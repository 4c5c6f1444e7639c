// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Fixed ArgoCD environment table (server URL, application-name prefix and suffix)
// role: argocd/config
// outputs: Environment enum with lookups; application names
// invariants:
// - Exactly three environments: preprod, staging, prod
// - Application name = prefix + service + suffix
// - Unknown names are rejected with a Configuration error listing the supported ones
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  Preprod,
  Staging,
  Prod,
}

impl Environment {
  pub const ALL: [Environment; 3] = [Environment::Preprod, Environment::Staging, Environment::Prod];

  pub fn name(&self) -> &'static str {
    match self {
      Environment::Preprod => "preprod",
      Environment::Staging => "staging",
      Environment::Prod => "prod",
    }
  }

  pub fn server(&self) -> &'static str {
    match self {
      Environment::Preprod => "https://argocd.qcore-preprod.qima.com",
      Environment::Staging => "https://argocd.qcore-staging.qima.com",
      Environment::Prod => "https://argocd.qcore-prod.qima.com",
    }
  }

  pub fn app_prefix(&self) -> &'static str {
    match self {
      Environment::Preprod => "preprod-",
      Environment::Staging => "staging-",
      Environment::Prod => "prod-",
    }
  }

  pub fn app_suffix(&self) -> &'static str {
    match self {
      Environment::Preprod => "--qcore-preprod",
      Environment::Staging => "--qcore-staging",
      Environment::Prod => "--qcore-prod",
    }
  }

  pub fn app_name(&self, service: &str) -> String {
    format!("{}{}{}", self.app_prefix(), service, self.app_suffix())
  }

  /// Server host without scheme, e.g. `argocd.qcore-prod.qima.com`.
  pub fn host(&self) -> &'static str {
    self.server().trim_start_matches("https://")
  }

  pub fn list() -> Vec<&'static str> {
    Self::ALL.iter().map(Environment::name).collect()
  }
}

impl fmt::Display for Environment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Environment {
  type Err = ExtractError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .iter()
      .copied()
      .find(|e| e.name() == s.trim())
      .ok_or_else(|| {
        ExtractError::Configuration(format!(
          "unsupported environment: {}. Supported environments: {}",
          s,
          Self::list().join(", ")
        ))
      })
  }
}
