use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::argocd::environment::Environment;
use crate::jira::mapping::DEFAULT_MAPPING_PATH;
use crate::jira::search::SearchTarget;
use crate::settings::{ToolSettings, DEFAULT_SETTINGS_PATH};

pub const DEFAULT_MAX_RESULTS: usize = 1000;

#[derive(Parser, Debug)]
#[command(
    name = "release-scope",
    version,
    about = "Extract Jira affects-project lists and ArgoCD image tags (JSON + CSV export)",
    long_about = None
)]
pub struct Cli {
  /// Results directory, or "-" to print the full JSON to stdout instead of writing files
  #[arg(long, global = true, default_value = "results")]
  pub out: String,

  /// Persisted settings used as defaults for omitted flags
  #[arg(long, global = true, default_value = DEFAULT_SETTINGS_PATH)]
  pub settings: PathBuf,

  /// Store the effective non-secret options into the settings file after a successful run
  #[arg(long, global = true)]
  pub remember: bool,

  /// Skip TLS certificate verification
  #[arg(long, global = true)]
  pub insecure: bool,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Pin the export timestamp (hidden; tests only)
  #[arg(long = "now-override", global = true, hide = true)]
  pub now_override: Option<String>,

  #[command(subcommand)]
  pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Jira issue extraction
  #[command(subcommand)]
  Jira(JiraCommand),
  /// ArgoCD deployment queries
  #[command(subcommand)]
  Argocd(ArgoCommand),
}

#[derive(Subcommand, Debug)]
pub enum JiraCommand {
  /// Extract affects-project lists from a filter or JQL query
  Extract(JiraExtractArgs),
  /// Guess which custom field holds affects-project data
  DetectField(JiraQueryArgs),
  /// Inspect or replace the project-mapping table
  #[command(subcommand)]
  Mappings(MappingsCommand),
}

#[derive(Subcommand, Debug)]
pub enum MappingsCommand {
  /// Print the mapping table in effect
  Show(MappingFileArg),
  /// Replace the whole mapping table with the contents of a JSON file
  Import {
    /// JSON file: a mapping document or a plain {"key": ["target", ...]} object
    source: PathBuf,
    #[command(flatten)]
    target: MappingFileArg,
  },
}

#[derive(Args, Debug, Clone)]
pub struct MappingFileArg {
  #[arg(long, default_value = DEFAULT_MAPPING_PATH)]
  pub mapping_file: PathBuf,
}

#[derive(Args, Debug, Clone, Default)]
pub struct JiraConnArgs {
  /// Jira base URL, e.g. https://example.atlassian.net
  #[arg(long, env = "JIRA_BASE_URL")]
  pub base_url: Option<String>,

  /// Account email; enables basic auth with the API token
  #[arg(long, env = "JIRA_EMAIL")]
  pub email: Option<String>,

  /// API token (never persisted)
  #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
  pub token: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct JiraQueryArgs {
  #[command(flatten)]
  pub conn: JiraConnArgs,

  /// Saved filter id
  #[arg(long, conflicts_with = "jql")]
  pub filter: Option<String>,

  /// Literal JQL query
  #[arg(long)]
  pub jql: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct JiraExtractArgs {
  #[command(flatten)]
  pub query: JiraQueryArgs,

  /// Custom field id holding affects-project data (skips detection)
  #[arg(long)]
  pub field: Option<String>,

  #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
  pub max_results: usize,

  #[arg(long, default_value = DEFAULT_MAPPING_PATH)]
  pub mapping_file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ArgoCommand {
  /// Query deployed image tags for services
  Images(ArgoImagesArgs),
  /// Inspect the bearer token's structure and expiry (offline)
  ValidateToken(ArgoAuthArgs),
  /// List supported environments
  Environments,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ArgoAuthArgs {
  #[arg(long = "env", value_enum)]
  pub environment: Option<Environment>,

  /// Bearer token; falls back to the argocd CLI config (~/.argocd/config)
  #[arg(long, env = "ARGOCD_TOKEN", hide_env_values = true)]
  pub token: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ArgoImagesArgs {
  #[command(flatten)]
  pub auth: ArgoAuthArgs,

  /// Service names (comma-separated or repeated)
  #[arg(long = "services", value_delimiter = ',')]
  pub services: Vec<String>,

  /// Previously exported argocd_images_*.json to compare against
  #[arg(long)]
  pub compare_with: Option<PathBuf>,

  /// Query another ArgoCD server with the environment's naming (hidden; tests only)
  #[arg(long = "server-override", hide = true)]
  pub server_override: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JiraConn {
  pub base_url: String,
  pub email: Option<String>,
  pub token: String,
}

#[derive(Debug, Clone)]
pub enum Action {
  JiraExtract {
    conn: JiraConn,
    target: SearchTarget,
    field_id: Option<String>,
    max_results: usize,
    mapping_file: PathBuf,
  },
  JiraDetectField {
    conn: JiraConn,
    target: SearchTarget,
  },
  MappingsShow {
    mapping_file: PathBuf,
  },
  MappingsImport {
    source: PathBuf,
    mapping_file: PathBuf,
  },
  ArgoImages {
    environment: Environment,
    token: Option<String>,
    services: Vec<String>,
    compare_with: Option<PathBuf>,
    server_override: Option<String>,
  },
  ArgoValidateToken {
    environment: Environment,
    token: Option<String>,
  },
  ArgoEnvironments,
}

#[derive(Debug, Clone)]
pub struct EffectiveConfig {
  pub action: Action,
  pub out: String,
  pub settings_path: PathBuf,
  pub remember: bool,
  pub verify_tls: bool,
  pub now_override: Option<String>,
}

impl EffectiveConfig {
  pub fn prints_to_stdout(&self) -> bool {
    self.out == "-"
  }
}

/// Validate flags against persisted settings; every error here happens before any network call.
pub fn normalize(cli: Cli, settings: &ToolSettings) -> Result<EffectiveConfig> {
  let Some(command) = cli.command else {
    bail!("Provide a command: `jira ...` or `argocd ...` (see --help)")
  };

  let action = match command {
    Command::Jira(JiraCommand::Extract(args)) => {
      let (conn, target) = jira_query(&args.query, settings)?;
      let field_id = non_empty(args.field).or_else(|| settings.jira.field_id.clone());
      if args.max_results == 0 {
        bail!("--max-results must be at least 1");
      }
      Action::JiraExtract {
        conn,
        target,
        field_id,
        max_results: args.max_results,
        mapping_file: args.mapping_file,
      }
    }
    Command::Jira(JiraCommand::DetectField(args)) => {
      let (conn, target) = jira_query(&args, settings)?;
      Action::JiraDetectField { conn, target }
    }
    Command::Jira(JiraCommand::Mappings(MappingsCommand::Show(m))) => Action::MappingsShow {
      mapping_file: m.mapping_file,
    },
    Command::Jira(JiraCommand::Mappings(MappingsCommand::Import { source, target })) => Action::MappingsImport {
      source,
      mapping_file: target.mapping_file,
    },
    Command::Argocd(ArgoCommand::Images(args)) => {
      let services: Vec<String> = args
        .services
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
      let services = if services.is_empty() {
        settings.argocd.services.clone()
      } else {
        services
      };
      if services.is_empty() {
        bail!("Provide --services (comma-separated) or remember a service list in the settings file");
      }
      Action::ArgoImages {
        environment: environment(&args.auth, settings),
        token: non_empty(args.auth.token),
        services,
        compare_with: args.compare_with,
        server_override: non_empty(args.server_override),
      }
    }
    Command::Argocd(ArgoCommand::ValidateToken(auth)) => Action::ArgoValidateToken {
      environment: environment(&auth, settings),
      token: non_empty(auth.token),
    },
    Command::Argocd(ArgoCommand::Environments) => Action::ArgoEnvironments,
  };

  Ok(EffectiveConfig {
    action,
    out: cli.out,
    settings_path: cli.settings,
    remember: cli.remember,
    verify_tls: !cli.insecure,
    now_override: cli.now_override,
  })
}

fn jira_query(args: &JiraQueryArgs, settings: &ToolSettings) -> Result<(JiraConn, SearchTarget)> {
  let Some(base_url) = non_empty(args.conn.base_url.clone()).or_else(|| settings.jira.base_url.clone()) else {
    bail!("Provide --base-url (or JIRA_BASE_URL)")
  };
  if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
    bail!("--base-url must start with http:// or https:// (got {:?})", base_url);
  }
  let Some(token) = non_empty(args.conn.token.clone()) else {
    bail!("Provide --token (or JIRA_API_TOKEN)")
  };
  let email = non_empty(args.conn.email.clone()).or_else(|| settings.jira.email.clone());

  let target = match (non_empty(args.filter.clone()), non_empty(args.jql.clone())) {
    (Some(f), None) => SearchTarget::Filter(f),
    (None, Some(q)) => SearchTarget::Jql(q),
    (None, None) => match &settings.jira.filter_id {
      Some(f) => SearchTarget::Filter(f.clone()),
      None => bail!("Provide one of --filter or --jql"),
    },
    (Some(_), Some(_)) => bail!("Ambiguous query: choose only one of --filter | --jql"),
  };

  Ok((
    JiraConn {
      base_url: base_url.trim_end_matches('/').to_string(),
      email,
      token,
    },
    target,
  ))
}

fn environment(auth: &ArgoAuthArgs, settings: &ToolSettings) -> Environment {
  auth
    .environment
    .or(settings.argocd.environment)
    .unwrap_or(Environment::Preprod)
}

fn non_empty(s: Option<String>) -> Option<String> {
  s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
