use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use mockito::Matcher;
use predicates::prelude::*;
use serde_json::{json, Value};
use test_support::{cmd_bin, read_fixture_text, read_json_file, tempdir};

const NOW: &str = "2025-08-15T12:00:00";

fn jwt(claims: Value) -> String {
  format!("eyJhbGciOiJIUzI1NiJ9.{}.c2ln", URL_SAFE_NO_PAD.encode(claims.to_string()))
}

fn mock_web(server: &mut mockito::ServerGuard) -> (mockito::Mock, mockito::Mock) {
  let app = server
    .mock("GET", "/api/v1/applications/prod-web--qcore-prod")
    .match_header("authorization", Matcher::Regex("^Bearer ".into()))
    .with_status(200)
    .with_body(read_fixture_text("argocd/application.json"))
    .create();
  let manifests = server
    .mock("GET", "/api/v1/applications/prod-web--qcore-prod/manifests")
    .match_query(Matcher::UrlEncoded("revision".into(), "9f2c1e7".into()))
    .with_status(200)
    .with_body(read_fixture_text("argocd/manifests.json"))
    .create();
  (app, manifests)
}

#[test]
fn images_partition_success_and_failure_and_export() {
  let mut server = mockito::Server::new();
  let (app, manifests) = mock_web(&mut server);
  let _ghost = server
    .mock("GET", "/api/v1/applications/prod-ghost--qcore-prod")
    .with_status(404)
    .create();

  let work = tempdir();
  let results = work.path().join("results");
  let (mut cmd, _home) = cmd_bin("release-scope");
  let out = cmd
    .args(["argocd", "images", "--env", "prod", "--services", "web,ghost"])
    .args(["--token", &jwt(json!({"exp": 4_102_444_800i64})), "--server-override", &server.url()])
    .args(["--out", results.to_str().unwrap(), "--now-override", NOW])
    .output()
    .unwrap();

  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  app.assert();
  manifests.assert();

  let summary: Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(summary["success"], 1);
  assert_eq!(summary["failed"], 1);

  let doc = read_json_file(results.join("argocd_images_prod_20250815_120000.json"));
  assert_eq!(doc["environment"], "PROD");
  assert_eq!(doc["query_time"], "2025-08-15 12:00:00");
  assert_eq!(doc["results"], json!({"web": "2.14.0"}));
  assert!(doc["failed"]["ghost"].as_str().unwrap().contains("does not exist"));

  let csv = std::fs::read_to_string(results.join("argocd_images_prod_20250815_120000.csv")).unwrap();
  let lines: Vec<&str> = csv.lines().collect();
  assert_eq!(lines[0], "service,version,status,environment");
  assert_eq!(lines[1], "web,2.14.0,ok,PROD");
  assert!(lines[2].starts_with("ghost,N/A,failed: "), "{}", lines[2]);
}

#[test]
fn compare_with_previous_export_reports_changes() {
  let mut server = mockito::Server::new();
  let _mocks = mock_web(&mut server);

  let work = tempdir();
  let previous = work.path().join("previous.json");
  std::fs::write(
    &previous,
    r#"{"environment": "PROD", "query_time": "2025-08-01 09:00:00", "results": {"web": "2.13.0", "billing": "1.0.0"}, "failed": {}}"#,
  )
  .unwrap();

  let (mut cmd, _home) = cmd_bin("release-scope");
  let out = cmd
    .args(["argocd", "images", "--env", "prod", "--services", "web"])
    .args(["--token", "opaque", "--server-override", &server.url(), "--out", "-"])
    .args(["--compare-with", previous.to_str().unwrap(), "--now-override", NOW])
    .output()
    .unwrap();

  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  let doc: Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(doc["total_changes"], 2);
  assert_eq!(doc["comparison"]["updated"]["web"], json!({"previous": "2.13.0", "current": "2.14.0"}));
  assert_eq!(doc["comparison"]["removed"]["billing"], "1.0.0");
}

#[test]
fn remember_persists_environment_and_services_without_token() {
  let mut server = mockito::Server::new();
  let _mocks = mock_web(&mut server);
  let work = tempdir();
  let settings = work.path().join("config").join("settings.json");

  let (mut cmd, _home) = cmd_bin("release-scope");
  cmd
    .args(["argocd", "images", "--env", "prod", "--services", "web", "--remember"])
    .args(["--token", "secret-token", "--server-override", &server.url(), "--out", "-"])
    .args(["--settings", settings.to_str().unwrap()])
    .assert()
    .success();

  let saved = std::fs::read_to_string(&settings).unwrap();
  assert!(!saved.contains("secret-token"));
  let v: Value = serde_json::from_str(&saved).unwrap();
  assert_eq!(v["argocd"]["environment"], "prod");
  assert_eq!(v["argocd"]["services"], json!(["web"]));
}

#[test]
fn validate_token_reports_expiry() {
  let (mut ok, _h1) = cmd_bin("release-scope");
  ok.args(["argocd", "validate-token", "--env", "staging"])
    .args(["--token", &jwt(json!({"exp": 4_102_444_800i64})), "--now-override", NOW])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"usable\":true"));

  let (mut expired, _h2) = cmd_bin("release-scope");
  expired
    .args(["argocd", "validate-token", "--env", "staging"])
    .args(["--token", &jwt(json!({"exp": 1_000})), "--now-override", NOW])
    .assert()
    .failure()
    .stdout(predicate::str::contains("token expired"));
}

#[test]
fn token_discovered_from_cli_config() {
  let (mut cmd, home) = cmd_bin("release-scope");
  let cfg_dir = home.path().join(".argocd");
  std::fs::create_dir_all(&cfg_dir).unwrap();
  std::fs::write(
    cfg_dir.join("config"),
    format!(
      "contexts:\n- name: staging\n  server: argocd.qcore-staging.qima.com\n  user: staging\nusers:\n- name: staging\n  auth-token: {}\n",
      jwt(json!({"sub": "ci"}))
    ),
  )
  .unwrap();

  cmd
    .args(["argocd", "validate-token", "--env", "staging"])
    .assert()
    .success()
    .stdout(predicate::str::contains("no expiry"));
}

#[test]
fn environments_are_listed() {
  let (mut cmd, _home) = cmd_bin("release-scope");
  let out = cmd.args(["argocd", "environments"]).output().unwrap();
  assert!(out.status.success());
  let v: Value = serde_json::from_slice(&out.stdout).unwrap();
  let names: Vec<&str> = v.as_array().unwrap().iter().map(|e| e["name"].as_str().unwrap()).collect();
  assert_eq!(names, vec!["preprod", "staging", "prod"]);
  assert_eq!(v[2]["app_suffix"], "--qcore-prod");
}
