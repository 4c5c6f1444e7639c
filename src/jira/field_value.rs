// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Normalize an arbitrarily shaped Jira field value into project-name tokens plus a display string
// role: jira/normalization
// inputs: Option<&serde_json::Value> (string, list, option object, rich-text document, scalar)
// outputs: Normalized { display, tokens }
// invariants:
// - Dispatch order: empty > string > list > document > object > scalar
// - Tokens keep original casing and left-to-right order; duplicates retained
// - Sentinels (NA/NONE/NULL), 1-char pieces, and URL/path-like pieces never become tokens
// - tokenize(tokens.join(", ")) == tokens
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::ext::serde_json::JsonShape;
use crate::jira::adf;

static RE_COUNTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+\d+").unwrap());
static RE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;\n\s]+").unwrap());

/// Whole-blob sentinels, compared upper-cased after trimming.
const BLANK_SENTINELS: [&str; 3] = ["", "NA", "NONE"];
/// Per-piece sentinels, compared upper-cased.
const PIECE_SENTINELS: [&str; 3] = ["NA", "NONE", "NULL"];
/// Substrings marking a piece as a link or repository path rather than a name.
const URL_MARKERS: [&str; 5] = ["http", "://", ".com", ".git", ".org"];

/// The shapes a Jira field value shows up in.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
  Empty,
  PlainText(&'a str),
  TextList(&'a [Value]),
  RichDocument(&'a Value),
  ObjectRef(&'a Map<String, Value>),
  Scalar(&'a Value),
}

impl<'a> FieldValue<'a> {
  pub fn classify(raw: Option<&'a Value>) -> Self {
    let Some(v) = raw else { return FieldValue::Empty };

    if !v.is_truthy() {
      return FieldValue::Empty;
    }

    match v {
      Value::String(s) => FieldValue::PlainText(s),
      Value::Array(items) => FieldValue::TextList(items),
      Value::Object(_) if adf::is_document(v) => FieldValue::RichDocument(v),
      Value::Object(obj) => FieldValue::ObjectRef(obj),
      other => FieldValue::Scalar(other),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
  pub display: String,
  pub tokens: Vec<String>,
}

/// Normalize one raw field value.
pub fn normalize(raw: Option<&Value>) -> Normalized {
  let display = match FieldValue::classify(raw) {
    FieldValue::Empty => return Normalized::default(),
    FieldValue::PlainText(s) => s.to_string(),
    FieldValue::TextList(items) => items.iter().map(element_text).collect::<Vec<_>>().join(" "),
    FieldValue::RichDocument(doc) => adf::flatten(doc),
    FieldValue::ObjectRef(obj) => option_text(obj),
    FieldValue::Scalar(v) => v.string_form(),
  };

  let tokens = tokenize(&display);
  Normalized { display, tokens }
}

fn element_text(item: &Value) -> String {
  if adf::is_document(item) {
    return adf::flatten(item);
  }
  match item.as_object() {
    Some(obj) => option_text(obj),
    None => item.string_form(),
  }
}

/// Select-list options carry `value`; users/components carry `name`.
fn option_text(obj: &Map<String, Value>) -> String {
  obj
    .get("value")
    .filter(|v| v.is_truthy())
    .or_else(|| obj.get("name").filter(|v| v.is_truthy()))
    .map(JsonShape::string_form)
    .unwrap_or_else(|| Value::Object(obj.clone()).to_string())
}

/// Split a text blob into project-name tokens.
pub fn tokenize(text: &str) -> Vec<String> {
  let trimmed = text.trim();
  let upper = trimmed.to_uppercase();
  if BLANK_SENTINELS.contains(&upper.as_str()) {
    return Vec::new();
  }

  let without_counters = RE_COUNTER.replace_all(trimmed, " ");

  RE_SEPARATORS
    .split(&without_counters)
    .map(str::trim)
    .filter(|piece| keep_piece(piece))
    .map(str::to_string)
    .collect()
}

fn keep_piece(piece: &str) -> bool {
  if piece.chars().count() < 2 {
    return false;
  }
  if PIECE_SENTINELS.contains(&piece.to_uppercase().as_str()) {
    return false;
  }
  let lower = piece.to_ascii_lowercase();
  !URL_MARKERS.iter().any(|m| lower.contains(m))
}
