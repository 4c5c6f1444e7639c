// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Write extraction results as timestamped JSON + CSV file pairs
// role: persistence/export
// inputs: IssueRecord list or BatchOutcome; results directory; generation time
// outputs: ExportPaths { json, csv } under the results directory
// side_effects: Creates the results directory and writes two files per export
// invariants:
// - Jira names: jira_affects_projects_<YYYYmmdd_HHMMSS>.{json,csv}
// - ArgoCD names: argocd_images_<env>_<YYYYmmdd_HHMMSS>.{json,csv}
// - Jira CSV columns: issue_key, summary, status, affects_projects_raw, project_count
// - ArgoCD CSV columns: service, version, status, environment
// errors: IO/serialization errors surfaced with full path context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::json;

use crate::argocd::environment::Environment;
use crate::model::{BatchOutcome, ImageComparison, IssueRecord, ServiceImageResult};

const STATUS_DETAIL_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPaths {
  pub json: PathBuf,
  pub csv: PathBuf,
}

pub fn file_timestamp(now: DateTime<Local>) -> String {
  now.format("%Y%m%d_%H%M%S").to_string()
}

pub fn jira_file_stem(now: DateTime<Local>) -> String {
  format!("jira_affects_projects_{}", file_timestamp(now))
}

pub fn argocd_file_stem(env: Environment, now: DateTime<Local>) -> String {
  format!("argocd_images_{}_{}", env, file_timestamp(now))
}

#[derive(Serialize)]
struct IssueRow<'a> {
  issue_key: &'a str,
  summary: &'a str,
  status: &'a str,
  affects_projects_raw: &'a str,
  project_count: usize,
}

#[derive(Serialize)]
struct ImageRow<'a> {
  service: &'a str,
  version: &'a str,
  status: String,
  environment: String,
}

pub fn export_jira(dir: &Path, records: &[IssueRecord], now: DateTime<Local>) -> Result<ExportPaths> {
  let stem = jira_file_stem(now);
  let paths = paths_for(dir, &stem);

  write_json(&paths.json, &records)?;

  let rows = records.iter().map(|r| IssueRow {
    issue_key: &r.issue_key,
    summary: &r.summary,
    status: &r.status,
    affects_projects_raw: &r.affects_projects_raw,
    project_count: r.project_count(),
  });
  write_csv(&paths.csv, rows)?;

  Ok(paths)
}

/// JSON document of one ArgoCD batch, optionally with the comparison against a previous run.
pub fn argocd_document(
  env: Environment,
  outcome: &BatchOutcome,
  comparison: Option<&ImageComparison>,
  now: DateTime<Local>,
) -> serde_json::Value {
  let mut doc = json!({
    "environment": env.name().to_uppercase(),
    "query_time": now.format("%Y-%m-%d %H:%M:%S").to_string(),
    "results": outcome.success,
    "failed": outcome.failed,
  });
  if let Some(cmp) = comparison {
    doc["comparison"] = json!(cmp);
    doc["total_changes"] = json!(cmp.total_changes());
  }
  doc
}

pub fn export_argocd(
  dir: &Path,
  env: Environment,
  outcome: &BatchOutcome,
  comparison: Option<&ImageComparison>,
  now: DateTime<Local>,
) -> Result<ExportPaths> {
  let stem = argocd_file_stem(env, now);
  let paths = paths_for(dir, &stem);

  write_json(&paths.json, &argocd_document(env, outcome, comparison, now))?;

  let environment = env.name().to_uppercase();
  let rows = outcome.details.iter().map(|d| match d {
    ServiceImageResult::Found { service_name, image_tag } => ImageRow {
      service: service_name,
      version: image_tag,
      status: "ok".to_string(),
      environment: environment.clone(),
    },
    ServiceImageResult::Failed { service_name, error_message } => ImageRow {
      service: service_name,
      version: "N/A",
      status: format!("failed: {}", clip(error_message, STATUS_DETAIL_MAX)),
      environment: environment.clone(),
    },
  });
  write_csv(&paths.csv, rows)?;

  Ok(paths)
}

fn paths_for(dir: &Path, stem: &str) -> ExportPaths {
  ExportPaths {
    json: dir.join(format!("{}.json", stem)),
    csv: dir.join(format!("{}.csv", stem)),
  }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
  let bytes = serde_json::to_vec_pretty(value).with_context(|| format!("serializing {}", path.display()))?;
  std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
  Ok(())
}

fn write_csv<R: Serialize>(path: &Path, rows: impl Iterator<Item = R>) -> Result<()> {
  let mut w = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
  for row in rows {
    w.serialize(row).with_context(|| format!("writing row to {}", path.display()))?;
  }
  w.flush().with_context(|| format!("flushing {}", path.display()))?;
  Ok(())
}

fn clip(s: &str, max_chars: usize) -> String {
  if s.chars().count() <= max_chars {
    return s.to_string();
  }
  let head: String = s.chars().take(max_chars).collect();
  format!("{}...", head)
}
