// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Flatten Atlassian Document Format (rich-text) trees into plain text
// role: jira/rich-text
// inputs: serde_json::Value (document node or any other value)
// outputs: Single space-joined string of text leaves in traversal order
// invariants:
// - Never fails; malformed nodes are skipped
// - Text leaves are trimmed; empty leaves are dropped
// - Any node carrying `content` is descended regardless of its `type`
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde_json::Value;

use crate::ext::serde_json::JsonShape;

/// Object carrying both `type` and `content`: a rich-text node rather than a plain value.
pub fn is_document(v: &Value) -> bool {
  v.as_object()
    .map(|o| o.contains_key("type") && o.contains_key("content"))
    .unwrap_or(false)
}

/// Reduce a rich-text tree to plain text. Non-document values return their string form.
pub fn flatten(node: &Value) -> String {
  let is_doc_root = node.as_object().map(|o| o.contains_key("content")).unwrap_or(false);
  if !is_doc_root {
    return node.string_form();
  }

  let mut parts: Vec<String> = Vec::new();
  collect_text(node, &mut parts);
  parts.join(" ")
}

fn collect_text(node: &Value, out: &mut Vec<String>) {
  match node {
    Value::Array(items) => {
      for item in items {
        collect_text(item, out);
      }
    }
    Value::Object(obj) => {
      if obj.get("type").and_then(Value::as_str) == Some("text") {
        if let Some(text) = obj.get("text").and_then(Value::as_str) {
          let t = text.trim();
          if !t.is_empty() {
            out.push(t.to_string());
          }
        }
      } else if let Some(content) = obj.get("content") {
        collect_text(content, out);
      }
    }
    _ => {}
  }
}
