// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: ArgoCD REST client: application lookup, deployed revision, manifests, per-service image tags
// role: argocd/client
// inputs: Environment name, bearer token, Transport; service names
// outputs: Revision strings, manifest lists, image tags, BatchOutcome for service batches
// side_effects: Network calls through the Transport seam
// invariants:
// - Unknown environments are rejected at construction
// - Batch queries run sequentially in input order; one service failing never aborts the rest
// - BatchOutcome.success and .failed never share a key
// errors: 404 NotFound, 403 PermissionDenied, 401 AuthInvalid, other non-2xx Status; missing deploy state NotFound
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::argocd::environment::Environment;
use crate::argocd::manifest::{extract_images, image_tag, select_image};
use crate::argocd::token::{inspect_token, TokenStatus};
use crate::error::{ExtractError, Result};
use crate::ext::serde_json::{JsonFetch, JsonShape};
use crate::http::{Auth, Transport, UreqTransport};
use crate::model::{BatchOutcome, ServiceImageResult};

pub struct ArgoCdClient {
  environment: Environment,
  server: String,
  token: String,
  transport: Box<dyn Transport>,
}

impl ArgoCdClient {
  pub fn new(environment: &str, token: impl Into<String>, transport: Box<dyn Transport>) -> Result<Self> {
    let environment: Environment = environment.parse()?;
    Ok(Self {
      environment,
      server: environment.server().to_string(),
      token: token.into(),
      transport,
    })
  }

  /// Client over a real HTTP transport with bearer auth.
  pub fn connect(environment: &str, token: &str, verify_tls: bool) -> Result<Self> {
    let transport = UreqTransport::new(Auth::Bearer(token.to_string()), verify_tls);
    Self::new(environment, token, Box::new(transport))
  }

  /// Point at a different server while keeping the environment's naming scheme.
  pub fn with_server(mut self, server: impl Into<String>) -> Self {
    self.server = server.into().trim_end_matches('/').to_string();
    self
  }

  /// Offline check of the bearer token's exp claim.
  pub fn token_status(&self, now: chrono::DateTime<chrono::Local>) -> TokenStatus {
    inspect_token(&self.token, now)
  }

  pub fn get_application(&self, app_name: &str) -> Result<Value> {
    let url = format!("{}/api/v1/applications/{}", self.server, app_name);
    let reply = self.transport.get(&url, &[])?;
    reply.into_json(&url, &format!("application {}", app_name))
  }

  pub fn get_app_revision(&self, app_name: &str) -> Result<String> {
    let app = self.get_application(app_name)?;

    let op = app
      .fetch("status.operationState")
      .value()
      .filter(|v| v.is_truthy())
      .ok_or_else(|| ExtractError::NotFound(format!("application {} has never been deployed (no operationState)", app_name)))?;

    op.fetch("operation.sync.revision")
      .to::<String>()
      .filter(|r| !r.is_empty())
      .ok_or_else(|| ExtractError::NotFound(format!("application {} has no synced revision", app_name)))
  }

  pub fn get_manifests(&self, app_name: &str, revision: &str) -> Result<Vec<String>> {
    let url = format!("{}/api/v1/applications/{}/manifests", self.server, app_name);
    let reply = self.transport.get(&url, &[("revision", revision.to_string())])?;
    let body = reply.into_json(&url, &format!("manifests of {}", app_name))?;

    let list = body
      .get("manifests")
      .and_then(Value::as_array)
      .ok_or_else(|| ExtractError::MalformedInput(format!("manifests response for {} has no manifests list", app_name)))?;

    Ok(list.iter().filter_map(Value::as_str).map(str::to_string).collect())
  }

  /// Deployed image tag of one service.
  pub fn get_service_images(&self, service: &str) -> Result<String> {
    let app_name = self.environment.app_name(service);

    // Phase 1: revision
    let revision = self.get_app_revision(&app_name)?;

    // Phase 2: manifests -> containers
    let manifests = self.get_manifests(&app_name, &revision)?;
    let images = extract_images(&manifests);
    debug!(service, revision = %revision, containers = images.len(), "manifests scanned");

    // Phase 3: tag selection
    let image = select_image(&images, service)
      .ok_or_else(|| ExtractError::NotFound(format!("no container images in {} at revision {}", app_name, revision)))?;

    Ok(image_tag(image))
  }

  pub fn query_multiple_services<S: AsRef<str>>(&self, services: &[S]) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for service in services {
      let service = service.as_ref().trim();
      if service.is_empty() {
        continue;
      }

      let result = match self.get_service_images(service) {
        Ok(tag) => {
          info!(service, tag = %tag, env = %self.environment, "resolved image tag");
          ServiceImageResult::Found {
            service_name: service.to_string(),
            image_tag: tag,
          }
        }
        Err(e) => {
          warn!(service, error = %e, env = %self.environment, "service query failed");
          ServiceImageResult::Failed {
            service_name: service.to_string(),
            error_message: e.to_string(),
          }
        }
      };
      outcome.push(result);
    }

    outcome
  }
}
