use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod argocd;
mod cli;
mod error;
mod export;
mod ext;
mod http;
mod jira;
mod model;
mod settings;
mod util;

use crate::argocd::{cli_config, compare, token, ArgoCdClient, Environment};
use crate::cli::{normalize, Action, Cli, EffectiveConfig, JiraConn};
use crate::http::{Auth, UreqTransport};
use crate::jira::mapping::MappingDocument;
use crate::jira::{JiraExtractor, ProjectMappingTable, SearchTarget};
use crate::settings::ToolSettings;

fn main() -> Result<()> {
  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  init_tracing();

  // Phase 1: settings + normalize CLI
  let mut settings = ToolSettings::load(&cli.settings);
  let cfg = normalize(cli, &settings)?;
  let now = util::effective_now(util::parse_now_override(cfg.now_override.as_deref())?);

  // Phase 2: run the action
  let output = match &cfg.action {
    Action::JiraExtract {
      conn,
      target,
      field_id,
      max_results,
      mapping_file,
    } => run_jira_extract(&cfg, conn, target, field_id.as_deref(), *max_results, mapping_file, now)?,
    Action::JiraDetectField { conn, target } => {
      let ex = JiraExtractor::new(jira_transport(conn, cfg.verify_tls), conn.base_url.clone(), ProjectMappingTable::empty());
      serde_json::to_value(ex.detect_field(target))?
    }
    Action::MappingsShow { mapping_file } => serde_json::to_value(ProjectMappingTable::load(mapping_file).to_document(now))?,
    Action::MappingsImport { source, mapping_file } => run_mappings_import(source, mapping_file, now)?,
    Action::ArgoImages {
      environment,
      token,
      services,
      compare_with,
      server_override,
    } => run_argo_images(
      &cfg,
      *environment,
      token.as_deref(),
      services,
      compare_with.as_deref(),
      server_override.as_deref(),
      now,
    )?,
    Action::ArgoValidateToken { environment, token } => {
      let token = resolve_argo_token(*environment, token.as_deref())?;
      let status = token::inspect_token(&token, now);
      println!(
        "{}",
        json!({"environment": environment.name(), "usable": status.is_usable(), "message": status.to_string()})
      );
      if !status.is_usable() {
        bail!("{}", status);
      }
      return Ok(());
    }
    Action::ArgoEnvironments => Value::Array(
      Environment::ALL
        .iter()
        .map(|e| json!({"name": e.name(), "server": e.server(), "app_prefix": e.app_prefix(), "app_suffix": e.app_suffix()}))
        .collect(),
    ),
  };

  // Phase 3: remember non-secret options
  if cfg.remember {
    remember(&mut settings, &cfg.action);
    settings
      .save(&cfg.settings_path)
      .with_context(|| format!("saving settings to {}", cfg.settings_path.display()))?;
  }

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("release_scope=info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}

fn jira_transport(conn: &JiraConn, verify_tls: bool) -> Box<UreqTransport> {
  let auth = Auth::for_jira(conn.email.as_deref(), &conn.token);
  Box::new(UreqTransport::new(auth, verify_tls))
}

fn run_jira_extract(
  cfg: &EffectiveConfig,
  conn: &JiraConn,
  target: &SearchTarget,
  field_id: Option<&str>,
  max_results: usize,
  mapping_file: &Path,
  now: DateTime<Local>,
) -> Result<Value> {
  let ex = JiraExtractor::with_mapping_file(jira_transport(conn, cfg.verify_tls), conn.base_url.clone(), mapping_file);

  let report = ex
    .extract(target, field_id, max_results)
    .with_context(|| format!("extracting issues for {}", target.jql()))?;

  if cfg.prints_to_stdout() {
    return Ok(serde_json::to_value(&report)?);
  }

  let dir = util::prepare_results_dir(&cfg.out)?;
  let paths = export::export_jira(&dir, &report.records, now)?;
  info!(json = %paths.json.display(), csv = %paths.csv.display(), "exported jira results");

  Ok(json!({
    "records": report.records.len(),
    "failures": report.failures.len(),
    "field_id": report.field_id,
    "used_fallback": report.used_fallback,
    "json": paths.json,
    "csv": paths.csv,
  }))
}

fn run_mappings_import(source: &Path, mapping_file: &Path, now: DateTime<Local>) -> Result<Value> {
  let text = std::fs::read_to_string(source).with_context(|| format!("reading {}", source.display()))?;

  let mappings: BTreeMap<String, Vec<String>> = match serde_json::from_str::<MappingDocument>(&text) {
    Ok(doc) => doc.mappings,
    Err(_) => serde_json::from_str(&text)
      .with_context(|| format!("{} is neither a mapping document nor a name -> [names] object", source.display()))?,
  };

  let mut table = ProjectMappingTable::load(mapping_file);
  table.replace(mappings, mapping_file, now)?;

  Ok(json!({"entries": table.mappings().len(), "path": mapping_file}))
}

fn resolve_argo_token(env: Environment, token: Option<&str>) -> Result<String> {
  if let Some(t) = token {
    return Ok(t.to_string());
  }
  match cli_config::discover_token(env) {
    Some(t) => {
      info!(env = %env, "using token from the argocd CLI config");
      Ok(t)
    }
    None => bail!("Provide --token (or ARGOCD_TOKEN), or log in with the argocd CLI"),
  }
}

fn run_argo_images(
  cfg: &EffectiveConfig,
  env: Environment,
  token: Option<&str>,
  services: &[String],
  compare_with: Option<&Path>,
  server_override: Option<&str>,
  now: DateTime<Local>,
) -> Result<Value> {
  let token = resolve_argo_token(env, token)?;

  // Load the previous run first so a bad path fails before any network call.
  let previous = compare_with
    .map(|p| compare::load_previous_results(p).with_context(|| format!("loading {}", p.display())))
    .transpose()?;

  let mut client = ArgoCdClient::connect(env.name(), &token, cfg.verify_tls)?;
  if let Some(server) = server_override {
    client = client.with_server(server);
  }

  let status = client.token_status(now);
  if !status.is_usable() {
    warn!(env = %env, status = %status, "token looks unusable; querying anyway");
  }

  let outcome = client.query_multiple_services(services);
  let comparison = previous.as_ref().map(|prev| compare::compare_images(&outcome.success, prev));

  if cfg.prints_to_stdout() {
    return Ok(export::argocd_document(env, &outcome, comparison.as_ref(), now));
  }

  let dir = util::prepare_results_dir(&cfg.out)?;
  let paths = export::export_argocd(&dir, env, &outcome, comparison.as_ref(), now)?;
  info!(json = %paths.json.display(), csv = %paths.csv.display(), "exported argocd results");

  let mut summary = json!({
    "environment": env.name(),
    "success": outcome.success.len(),
    "failed": outcome.failed.len(),
    "json": paths.json,
    "csv": paths.csv,
  });
  if let Some(cmp) = &comparison {
    summary["total_changes"] = json!(cmp.total_changes());
  }
  Ok(summary)
}

fn remember(settings: &mut ToolSettings, action: &Action) {
  match action {
    Action::JiraExtract { conn, target, field_id, .. } => {
      settings.jira.base_url = Some(conn.base_url.clone());
      settings.jira.email = conn.email.clone();
      if let SearchTarget::Filter(f) = target {
        settings.jira.filter_id = Some(f.clone());
      }
      if field_id.is_some() {
        settings.jira.field_id = field_id.clone();
      }
    }
    Action::ArgoImages { environment, services, .. } => {
      settings.argocd.environment = Some(*environment);
      settings.argocd.services = services.clone();
    }
    _ => {}
  }
}
