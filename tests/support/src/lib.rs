//! test-support: helpers for robust, nextest-friendly tests.
//!
//! Added as a dev-dependency in the top-level `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support", features = ["serde"] }
//! ```
//!
//! Then in tests:
//! ```rust
//! use test_support::{init_tracing, fixtures_dir};
//!
//! #[test]
//! fn example() {
//!     init_tracing();
//!     let _root = fixtures_dir();
//! }
//! ```

use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

use std::{
    env,
    path::{Path, PathBuf},
};

/// Initialize `tracing` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global subscriber.
pub fn init_tracing() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn,release_scope=info"))
            .unwrap();
        // with_test_writer() causes logs to appear alongside failing tests only (cargo/nextest)
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
    Lazy::force(&INIT);
}

/// Root of the main package (two levels above this crate's manifest).
pub fn workspace_root() -> PathBuf {
    let support = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    support
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or(support)
}

/// Return the path to the repository's `tests/fixtures` directory.
///
/// Anchored on the package directory, so it's stable regardless of the runner's
/// working directory (cargo vs nextest).
pub fn fixtures_dir() -> PathBuf {
    workspace_root().join("tests").join("fixtures")
}

/// Return the path to the repository's `tests/schemas` directory.
pub fn schemas_dir() -> PathBuf {
    workspace_root().join("tests").join("schemas")
}

/// Read a UTF-8 text fixture into a string.
pub fn read_fixture_text<P: AsRef<Path>>(rel_path: P) -> String {
    let path = fixtures_dir().join(rel_path);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
}

/// Parse a JSON file written by the binary under test.
#[cfg(feature = "serde")]
pub fn read_json_file<P: AsRef<Path>>(path: P) -> serde_json::Value {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()))
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Set multiple environment variables for the duration of the returned guard.
pub fn with_env(vars: &[(&str, &str)]) -> EnvGuard {
    EnvGuard::set_many(vars)
}

/// Run a binary target with `assert_cmd`, returning the ready-to-run `Command`.
///
/// Credentials from the developer's shell are cleared so tests never reach real services,
/// and HOME points at an empty directory so no argocd CLI config is discovered.
///
/// Example:
/// ```no_run
/// use test_support::cmd_bin;
///
/// let (mut cmd, _home) = cmd_bin("release-scope");
/// cmd.arg("--help").assert().success();
/// ```
pub fn cmd_bin(bin: &str) -> (assert_cmd::Command, tempfile::TempDir) {
    init_tracing();
    let home = tempdir();
    let mut cmd = assert_cmd::Command::cargo_bin(bin).expect("binary target not found");
    for var in ["JIRA_BASE_URL", "JIRA_EMAIL", "JIRA_API_TOKEN", "ARGOCD_TOKEN", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd.env("HOME", home.path());
    (cmd, home)
}

/// Guard for temporarily setting environment variables.
pub struct EnvGuard {
    prev: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set_many(kv: &[(&str, &str)]) -> Self {
        let mut prev = Vec::with_capacity(kv.len());
        for (k, v) in kv {
            prev.push((k.to_string(), env::var(k).ok()));
            env::set_var(k, v);
        }
        Self { prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, old) in self.prev.drain(..) {
            match old {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}
