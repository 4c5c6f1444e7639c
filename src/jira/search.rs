// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Jira issue search across API generations (enhanced /search/jql, then legacy /search v3 and v2)
// role: jira/search
// inputs: Transport, Jira base URL, JQL or filter id, projected fields, result cap
// outputs: Raw issue JSON objects (at most max_results)
// side_effects: Network calls through the Transport seam
// invariants:
// - Strategies run in fixed order: Enhanced, Legacy v3, Legacy v2; the first success wins
// - HTTP 410 is the "endpoint retired" signal; any enhanced failure also moves on to legacy
// - search_issues never leaks EndpointRetired; it becomes a Transport error naming the attempts
// - search_by_filter substitutes FALLBACK_JQL only when the chain ends retired
// errors: Last attempt's error when every strategy fails
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{ExtractError, Result};
use crate::ext::serde_json::JsonFetch;
use crate::http::{HttpReply, Transport};

/// Used when filter search is retired: QIMA issues done but not yet released, touched in the last
/// 30 days, excluding the mobile squad.
pub const FALLBACK_JQL: &str = "project = QIMA AND statusCategory = Done AND fixVersion is EMPTY \
AND updated >= -30d AND (Team is EMPTY OR Team != \"Mobile Squad\") ORDER BY updated DESC";

const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
  /// POST /rest/api/3/search/jql with token pagination.
  Enhanced,
  /// GET /rest/api/{version}/search with offset pagination.
  Legacy { version: u8 },
}

pub const STRATEGIES: [SearchStrategy; 3] = [
  SearchStrategy::Enhanced,
  SearchStrategy::Legacy { version: 3 },
  SearchStrategy::Legacy { version: 2 },
];

impl SearchStrategy {
  pub fn endpoint(&self, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    match self {
      SearchStrategy::Enhanced => format!("{}/rest/api/3/search/jql", base),
      SearchStrategy::Legacy { version } => format!("{}/rest/api/{}/search", base, version),
    }
  }
}

#[derive(Debug)]
pub enum AttemptOutcome {
  Success(Vec<Value>),
  Retired(String),
  Failure(ExtractError),
}

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTarget {
  Filter(String),
  Jql(String),
}

impl SearchTarget {
  pub fn jql(&self) -> String {
    match self {
      SearchTarget::Filter(id) => format!("filter={}", id.trim()),
      SearchTarget::Jql(q) => q.clone(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
  pub issues: Vec<Value>,
  pub jql: String,
  pub used_fallback: bool,
}

pub struct IssueSearcher<'a> {
  transport: &'a dyn Transport,
  base_url: &'a str,
}

impl<'a> IssueSearcher<'a> {
  pub fn new(transport: &'a dyn Transport, base_url: &'a str) -> Self {
    Self { transport, base_url }
  }

  /// Literal query. Exhausted retirement surfaces as a Transport error.
  pub fn search_issues(&self, jql: &str, fields: &[String], max_results: usize) -> Result<Vec<Value>> {
    self.run_chain(jql, fields, max_results).map_err(|e| match e {
      ExtractError::EndpointRetired(last) => ExtractError::Transport(format!(
        "every search endpoint is retired ({}); last: {}",
        STRATEGIES
          .iter()
          .map(|s| s.endpoint(self.base_url))
          .collect::<Vec<_>>()
          .join(", "),
        last
      )),
      other => other,
    })
  }

  /// Filter search; when the filter query hits only retired endpoints, run FALLBACK_JQL instead.
  pub fn search_by_filter(&self, filter_id: &str, fields: &[String], max_results: usize) -> Result<SearchResult> {
    let jql = SearchTarget::Filter(filter_id.to_string()).jql();

    match self.run_chain(&jql, fields, max_results) {
      Ok(issues) => Ok(SearchResult {
        issues,
        jql,
        used_fallback: false,
      }),
      Err(e) if e.is_retired() => {
        warn!(filter = filter_id, "filter search retired; running fallback query");
        let issues = self.search_issues(FALLBACK_JQL, fields, max_results)?;
        Ok(SearchResult {
          issues,
          jql: FALLBACK_JQL.to_string(),
          used_fallback: true,
        })
      }
      Err(e) => Err(e),
    }
  }

  pub fn search(&self, target: &SearchTarget, fields: &[String], max_results: usize) -> Result<SearchResult> {
    match target {
      SearchTarget::Filter(id) => self.search_by_filter(id, fields, max_results),
      SearchTarget::Jql(q) => Ok(SearchResult {
        issues: self.search_issues(q, fields, max_results)?,
        jql: q.clone(),
        used_fallback: false,
      }),
    }
  }

  /// Try each strategy in order; keep the last error.
  fn run_chain(&self, jql: &str, fields: &[String], max_results: usize) -> Result<Vec<Value>> {
    let mut last: Option<ExtractError> = None;

    for strategy in STRATEGIES {
      match self.attempt(strategy, jql, fields, max_results) {
        AttemptOutcome::Success(issues) => {
          info!(?strategy, count = issues.len(), "jira search succeeded");
          return Ok(issues);
        }
        AttemptOutcome::Retired(url) => {
          warn!(?strategy, url = %url, "search endpoint retired");
          last = Some(ExtractError::EndpointRetired(url));
        }
        AttemptOutcome::Failure(err) => {
          warn!(?strategy, error = %err, "search attempt failed");
          last = Some(err);
        }
      }
    }

    Err(last.unwrap_or_else(|| ExtractError::Transport("no search strategy attempted".into())))
  }

  pub fn attempt(&self, strategy: SearchStrategy, jql: &str, fields: &[String], max_results: usize) -> AttemptOutcome {
    let url = strategy.endpoint(self.base_url);
    let result = match strategy {
      SearchStrategy::Enhanced => self.enhanced_pages(&url, jql, fields, max_results),
      SearchStrategy::Legacy { .. } => self.legacy_pages(&url, jql, fields, max_results),
    };

    match result {
      Ok(issues) => AttemptOutcome::Success(issues),
      Err(ExtractError::EndpointRetired(u)) => AttemptOutcome::Retired(u),
      Err(e) => AttemptOutcome::Failure(e),
    }
  }

  fn enhanced_pages(&self, url: &str, jql: &str, fields: &[String], max_results: usize) -> Result<Vec<Value>> {
    let mut out: Vec<Value> = Vec::new();
    let mut next_token: Option<String> = None;

    while out.len() < max_results {
      let mut body = json!({
        "jql": jql,
        "fields": fields,
        "maxResults": PAGE_SIZE.min(max_results - out.len()),
      });
      if let Some(t) = &next_token {
        body["nextPageToken"] = json!(t);
      }

      let page = classify(self.transport.post_json(url, &body)?, url)?;
      let issues = page.fetch("issues").to_or_default::<Vec<Value>>();
      let fetched = issues.len();
      out.extend(issues);

      next_token = page.fetch("nextPageToken").to::<String>();
      let is_last = page.fetch("isLast").to::<bool>().unwrap_or(next_token.is_none());
      debug!(url, fetched, is_last, "enhanced search page");

      if is_last || next_token.is_none() || fetched == 0 {
        break;
      }
    }

    out.truncate(max_results);
    Ok(out)
  }

  fn legacy_pages(&self, url: &str, jql: &str, fields: &[String], max_results: usize) -> Result<Vec<Value>> {
    let mut out: Vec<Value> = Vec::new();
    let field_list = fields.join(",");

    while out.len() < max_results {
      let start_at = out.len();
      let query = [
        ("jql", jql.to_string()),
        ("fields", field_list.clone()),
        ("maxResults", PAGE_SIZE.min(max_results - start_at).to_string()),
        ("startAt", start_at.to_string()),
      ];

      let page = classify(self.transport.get(url, &query)?, url)?;
      let issues = page.fetch("issues").to_or_default::<Vec<Value>>();
      let fetched = issues.len();
      out.extend(issues);

      let total = page.fetch("total").to::<usize>().unwrap_or(out.len());
      debug!(url, fetched, total, "legacy search page");

      if fetched == 0 || out.len() >= total {
        break;
      }
    }

    out.truncate(max_results);
    Ok(out)
  }
}

fn classify(reply: HttpReply, url: &str) -> Result<Value> {
  if reply.is_gone() {
    return Err(ExtractError::EndpointRetired(url.to_string()));
  }
  reply.into_json(url, "jira search")
}
