// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Compare two runs of service -> image tag maps (added / updated / unchanged / removed)
// role: argocd/compare
// inputs: Current and previous success maps; previously exported ArgoCD JSON
// outputs: ImageComparison
// invariants: Every service of either map lands in exactly one bucket
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ExtractError, Result};
use crate::ext::serde_json::JsonFetch;
use crate::model::{ImageComparison, TagChange};

pub fn compare_images(current: &BTreeMap<String, String>, previous: &BTreeMap<String, String>) -> ImageComparison {
  let mut cmp = ImageComparison::default();

  for (service, tag) in current {
    match previous.get(service) {
      Some(prev) if prev == tag => {
        cmp.unchanged.insert(service.clone(), tag.clone());
      }
      Some(prev) => {
        cmp.updated.insert(
          service.clone(),
          TagChange {
            previous: prev.clone(),
            current: tag.clone(),
          },
        );
      }
      None => {
        cmp.added.insert(service.clone(), tag.clone());
      }
    }
  }

  for (service, tag) in previous {
    if !current.contains_key(service) {
      cmp.removed.insert(service.clone(), tag.clone());
    }
  }

  cmp
}

/// Success map (`results`) of a previously exported ArgoCD JSON file.
pub fn load_previous_results(path: &Path) -> Result<BTreeMap<String, String>> {
  let text = std::fs::read_to_string(path).map_err(|e| ExtractError::io(path.display().to_string(), e))?;
  let doc: serde_json::Value = serde_json::from_str(&text)
    .map_err(|e| ExtractError::MalformedInput(format!("{}: {}", path.display(), e)))?;

  doc
    .fetch("results")
    .to::<BTreeMap<String, String>>()
    .ok_or_else(|| ExtractError::MalformedInput(format!("{}: no results map", path.display())))
}
