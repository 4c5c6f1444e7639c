// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Nested JSON fetching via dotted paths, plus truthiness and string-form helpers for loosely shaped API payloads
// role: extension/serde_json
// outputs: JsonFetch trait, JsonFetched wrapper, JsonShape trait
// invariants: No panics; missing paths yield None; to_or_default returns T::default on failure
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Wrapper around a JSON location to allow typed extraction via a clear second step.
pub struct JsonFetched<'a> {
  inner: Option<&'a Value>,
}

impl<'a> JsonFetched<'a> {
  /// Attempt to deserialize the fetched value as `T`.
  pub fn to<T>(&self) -> Option<T>
  where
    T: DeserializeOwned,
  {
    self.inner.and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
  }

  /// Deserialize as `T`, returning `T::default()` on failure.
  pub fn to_or_default<T>(&self) -> T
  where
    T: DeserializeOwned + Default,
  {
    self.to::<T>().unwrap_or_default()
  }

  /// Borrow the raw value without cloning.
  pub fn value(&self) -> Option<&'a Value> {
    self.inner
  }
}

/// Extension to fetch nested values via dotted paths like "status.operationState".
pub trait JsonFetch {
  fn fetch(&self, path: &str) -> JsonFetched<'_>;
}

impl JsonFetch for Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched { inner: Some(self) };
    }

    let mut cur = self;

    for key in path.split('.') {
      match cur.get(key) {
        Some(next) => cur = next,
        None => return JsonFetched { inner: None },
      }
    }

    JsonFetched { inner: Some(cur) }
  }
}

/// Shape predicates shared by the field normalizer and the heuristics.
pub trait JsonShape {
  /// Falsy: null, false, 0, "", [] and {}.
  fn is_truthy(&self) -> bool;
  /// Strings yield their content; everything else its compact JSON form.
  fn string_form(&self) -> String;
}

impl JsonShape for Value {
  fn is_truthy(&self) -> bool {
    match self {
      Value::Null => false,
      Value::Bool(b) => *b,
      Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
      Value::String(s) => !s.is_empty(),
      Value::Array(a) => !a.is_empty(),
      Value::Object(o) => !o.is_empty(),
    }
  }

  fn string_form(&self) -> String {
    match self {
      Value::String(s) => s.clone(),
      other => other.to_string(),
    }
  }
}
