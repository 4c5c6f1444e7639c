use predicates::prelude::*;
use test_support::cmd_bin;

#[test]
fn no_command_is_an_error() {
  let (mut cmd, _home) = cmd_bin("release-scope");
  cmd.assert().failure().stderr(predicate::str::contains("Provide a command"));
}

#[test]
fn jira_requires_token_before_any_request() {
  let (mut cmd, _home) = cmd_bin("release-scope");
  cmd
    .args(["jira", "extract", "--filter", "1", "--base-url", "http://127.0.0.1:9"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--token"));
}

#[test]
fn jira_base_url_needs_scheme() {
  let (mut cmd, _home) = cmd_bin("release-scope");
  cmd
    .args(["jira", "extract", "--filter", "1", "--base-url", "jira.example", "--token", "t"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("http:// or https://"));
}

#[test]
fn unknown_environment_is_rejected() {
  let (mut cmd, _home) = cmd_bin("release-scope");
  cmd
    .args(["argocd", "images", "--env", "qa", "--services", "web"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("qa"));
}

#[test]
fn argocd_without_services_or_token_fails() {
  let (mut no_services, _h1) = cmd_bin("release-scope");
  no_services
    .args(["argocd", "images", "--env", "prod", "--token", "t"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--services"));

  let (mut no_token, _h2) = cmd_bin("release-scope");
  no_token
    .args(["argocd", "images", "--env", "prod", "--services", "web"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("ARGOCD_TOKEN"));
}

#[test]
fn environment_variables_supply_jira_connection() {
  let (mut cmd, _home) = cmd_bin("release-scope");
  cmd
    .env("JIRA_BASE_URL", "ftp://nope")
    .env("JIRA_API_TOKEN", "t")
    .args(["jira", "extract", "--filter", "1"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("ftp://nope"));
}
