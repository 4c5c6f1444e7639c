// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Extract container name -> image references from rendered Kubernetes manifests and pick a service tag
// role: argocd/manifests
// inputs: Manifest strings (YAML or JSON), one resource each
// outputs: ContainerImages (insertion-ordered); a tag string per service
// invariants:
// - Each manifest is parsed independently; a malformed one is skipped, never fatal for the batch
// - Later manifests overwrite earlier ones for the same container name, keeping first-insertion position
// - Placeholder "-" names or images are never recorded
// - Tag = text after the last ':' of the image, or "latest"
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::ext::serde_json::JsonFetch;

const PLACEHOLDER: &str = "-";
const SIDECARS: [&str; 2] = ["nginx-prometheus-exporter", "prometheus-exporter"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
  #[error("manifest is not valid YAML/JSON: {0}")]
  Parse(String),
  #[error("manifest has no kind")]
  NoKind,
  #[error("{kind} manifest is missing {path}")]
  MissingPath { kind: String, path: &'static str },
  #[error("containers at {0} is not a list")]
  NotAList(&'static str),
}

/// Container name -> image, in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerImages {
  entries: Vec<(String, String)>,
}

impl ContainerImages {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert or overwrite; an overwrite keeps the original position.
  pub fn upsert(&mut self, name: impl Into<String>, image: impl Into<String>) {
    let name = name.into();
    let image = image.into();
    match self.entries.iter_mut().find(|(n, _)| *n == name) {
      Some(slot) => slot.1 = image,
      None => self.entries.push((name, image)),
    }
  }

  pub fn merge(&mut self, other: ContainerImages) {
    for (n, i) in other.entries {
      self.upsert(n, i);
    }
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.entries.iter().find(|(n, _)| n == name).map(|(_, i)| i.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(n, i)| (n.as_str(), i.as_str()))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Parse one manifest into its container images.
pub fn parse_manifest(text: &str) -> Result<ContainerImages, ManifestError> {
  let doc: Value = serde_yaml::from_str(text).map_err(|e| ManifestError::Parse(e.to_string()))?;

  let kind = doc.get("kind").and_then(Value::as_str).ok_or(ManifestError::NoKind)?;
  let spec = doc.get("spec");
  let has = |key: &str| spec.and_then(|s| s.get(key)).is_some();

  let (path, containers) = if has("template") {
    ("spec.template.spec.containers", doc.fetch("spec.template.spec.containers").value())
  } else if kind == "Pod" {
    ("spec.containers", doc.fetch("spec.containers").value())
  } else if (kind == "Job" || kind == "CronJob") && has("jobTemplate") {
    let path = "spec.jobTemplate.spec.template.spec.containers";
    (path, Some(required(&doc, kind, path)?))
  } else if kind == "CronJob" && has("cronJobTemplate") {
    let path = "spec.cronJobTemplate.spec.jobTemplate.spec.template.spec.containers";
    (path, Some(required(&doc, kind, path)?))
  } else if has("containers") {
    ("spec.containers", doc.fetch("spec.containers").value())
  } else {
    ("", None)
  };

  let mut out = ContainerImages::new();
  let Some(containers) = containers.filter(|c| !c.is_null()) else {
    return Ok(out);
  };
  let list = containers.as_array().ok_or(ManifestError::NotAList(path))?;

  for c in list {
    let name = c.get("name").and_then(Value::as_str).unwrap_or(PLACEHOLDER);
    let image = c.get("image").and_then(Value::as_str).unwrap_or(PLACEHOLDER);
    if name != PLACEHOLDER && image != PLACEHOLDER {
      out.upsert(name, image);
    }
  }

  Ok(out)
}

fn required<'a>(doc: &'a Value, kind: &str, path: &'static str) -> Result<&'a Value, ManifestError> {
  doc.fetch(path).value().ok_or_else(|| ManifestError::MissingPath {
    kind: kind.to_string(),
    path,
  })
}

/// Fold every manifest; malformed ones are dropped.
pub fn extract_images<S: AsRef<str>>(manifests: &[S]) -> ContainerImages {
  let mut images = ContainerImages::new();

  for (idx, m) in manifests.iter().enumerate() {
    match parse_manifest(m.as_ref()) {
      Ok(found) => images.merge(found),
      Err(e) => debug!(index = idx, error = %e, "skipping manifest"),
    }
  }

  if images.is_empty() && !manifests.is_empty() {
    debug!(manifests = manifests.len(), "no containers in any manifest");
  }

  images
}

/// Container matching the service name, else the first non-sidecar, else the first.
pub fn select_image<'a>(images: &'a ContainerImages, service: &str) -> Option<&'a str> {
  images
    .get(service)
    .or_else(|| images.iter().find(|(n, _)| !SIDECARS.contains(n)).map(|(_, i)| i))
    .or_else(|| images.iter().next().map(|(_, i)| i))
}

pub fn image_tag(image: &str) -> String {
  match image.rsplit_once(':') {
    Some((_, tag)) => tag.to_string(),
    None => "latest".to_string(),
  }
}
