// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for the results directory, the pinned "now", and man page rendering
// role: utilities/helpers
// inputs: Output argument; optional now override; clap CommandFactory
// outputs: Existing results directory, effective DateTime<Local>, man page text
// side_effects: prepare_results_dir creates directories
// invariants:
// - prepare_results_dir returns an existing directory
// - parse_now_override accepts RFC3339 or local %Y-%m-%dT%H:%M:%S and nothing else
// errors: IO errors bubble with context; invalid overrides are reported with the offending text
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use clap::CommandFactory;

/// Returns the effective "now" given an optional override.
///
/// Keeps test determinism in one place instead of sprinkling `Local::now()`.
pub fn effective_now(override_now: Option<DateTime<Local>>) -> DateTime<Local> {
  override_now.unwrap_or_else(Local::now)
}

/// Parse the hidden `--now-override` value.
pub fn parse_now_override(raw: Option<&str>) -> Result<Option<DateTime<Local>>> {
  let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
    return Ok(None);
  };

  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(Some(dt.with_timezone(&Local)));
  }

  let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
    .with_context(|| format!("invalid --now-override {:?} (expected RFC3339 or YYYY-MM-DDTHH:MM:SS)", raw))?;

  Local
    .from_local_datetime(&naive)
    .earliest()
    .map(Some)
    .with_context(|| format!("--now-override {:?} does not exist in the local timezone", raw))
}

/// Create (if needed) and return the directory exports are written to.
pub fn prepare_results_dir(out: &str) -> Result<PathBuf> {
  let dir = PathBuf::from(out);
  std::fs::create_dir_all(&dir).with_context(|| format!("creating results directory {}", dir.display()))?;
  Ok(dir)
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
