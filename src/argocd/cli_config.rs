// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Discover an ArgoCD auth token from the argocd CLI's local config (~/.argocd/config)
// role: argocd/auth
// inputs: Config path (default from the home directory); environment
// outputs: Option<String> token
// side_effects: Reads one file
// invariants:
// - Never fails: missing file or any parse problem => None (logged at debug)
// - A context whose server mentions the environment host (or name) wins; otherwise the first user's token
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::argocd::environment::Environment;

#[derive(Debug, Default, Deserialize)]
struct CliConfig {
  #[serde(default)]
  contexts: Vec<CliContext>,
  #[serde(default)]
  users: Vec<CliUser>,
}

#[derive(Debug, Deserialize)]
struct CliContext {
  #[serde(default)]
  server: String,
  #[serde(default)]
  user: Option<UserRef>,
}

/// The argocd CLI stores the user by name; some hand-written configs inline it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserRef {
  Name(String),
  Inline {
    #[serde(rename = "auth-token")]
    auth_token: Option<String>,
  },
}

#[derive(Debug, Deserialize)]
struct CliUser {
  name: String,
  #[serde(rename = "auth-token")]
  auth_token: Option<String>,
}

pub fn default_config_path() -> Option<PathBuf> {
  dirs::home_dir().map(|h| h.join(".argocd").join("config"))
}

/// Token for `env` from the default config location.
pub fn discover_token(env: Environment) -> Option<String> {
  default_config_path().and_then(|p| token_from_file(&p, env))
}

pub fn token_from_file(path: &Path, env: Environment) -> Option<String> {
  let text = match std::fs::read_to_string(path) {
    Ok(t) => t,
    Err(e) => {
      debug!(path = %path.display(), error = %e, "argocd cli config not readable");
      return None;
    }
  };

  match serde_yaml::from_str::<CliConfig>(&text) {
    Ok(cfg) => pick_token(&cfg, env),
    Err(e) => {
      debug!(path = %path.display(), error = %e, "argocd cli config not parseable");
      None
    }
  }
}

fn pick_token(cfg: &CliConfig, env: Environment) -> Option<String> {
  // Host first: "prod" alone is a substring of the preprod server.
  let matching = cfg
    .contexts
    .iter()
    .find(|c| c.server.contains(env.host()))
    .or_else(|| cfg.contexts.iter().find(|c| c.server.contains(env.name())));

  if let Some(tok) = matching.and_then(|c| resolve_user(cfg, c.user.as_ref())) {
    return Some(tok);
  }

  cfg
    .users
    .iter()
    .find_map(|u| u.auth_token.clone().filter(|t| !t.is_empty()))
    .or_else(|| cfg.contexts.first().and_then(|c| resolve_user(cfg, c.user.as_ref())))
}

fn resolve_user(cfg: &CliConfig, user: Option<&UserRef>) -> Option<String> {
  match user? {
    UserRef::Inline { auth_token } => auth_token.clone(),
    UserRef::Name(name) => cfg.users.iter().find(|u| &u.name == name).and_then(|u| u.auth_token.clone()),
  }
  .filter(|t| !t.is_empty())
}
