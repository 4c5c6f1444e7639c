use mockito::Matcher;
use predicates::prelude::*;
use serde_json::{json, Value};
use test_support::{cmd_bin, read_fixture_text, read_json_file, tempdir};

const NOW: &str = "2025-08-15T12:00:00";

#[test]
fn extract_with_known_field_writes_json_and_csv() {
  let mut server = mockito::Server::new();
  let search = server
    .mock("POST", "/rest/api/3/search/jql")
    .match_header("authorization", Matcher::Regex("^Basic ".into()))
    .match_body(Matcher::PartialJson(json!({"jql": "filter=20334"})))
    .with_status(200)
    .with_header("content-type", "application/json")
    .with_body(read_fixture_text("jira/search_enhanced.json"))
    .create();

  let work = tempdir();
  let results = work.path().join("results");
  let (mut cmd, _home) = cmd_bin("release-scope");
  let out = cmd
    .args(["jira", "extract", "--filter", "20334", "--field", "customfield_10423"])
    .args(["--base-url", &server.url(), "--email", "dev@example.com", "--token", "t0k"])
    .args(["--mapping-file", work.path().join("absent.json").to_str().unwrap()])
    .args(["--out", results.to_str().unwrap(), "--now-override", NOW])
    .output()
    .unwrap();

  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  search.assert();

  let summary: Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(summary["records"], 3);
  assert_eq!(summary["failures"], 1);
  assert_eq!(summary["field_id"], "customfield_10423");
  assert_eq!(summary["used_fallback"], false);

  let json_path = results.join("jira_affects_projects_20250815_120000.json");
  assert_eq!(summary["json"], json!(json_path));

  let records = read_json_file(&json_path);
  assert_eq!(records[0]["issue_key"], "QIMA-101");
  assert_eq!(
    records[0]["affects_projects"],
    json!(["aims-service-cloud", "aca", "aims-web-cloud", "aca-cn"])
  );
  assert_eq!(
    records[1]["affects_projects_raw"],
    "program-service-cloud, lt-external-service-cloud, program-web-cloud"
  );
  assert_eq!(records[2]["affects_projects"], json!([]));

  let csv = std::fs::read_to_string(results.join("jira_affects_projects_20250815_120000.csv")).unwrap();
  let mut lines = csv.lines();
  assert_eq!(lines.next(), Some("issue_key,summary,status,affects_projects_raw,project_count"));
  assert_eq!(
    lines.next(),
    Some("QIMA-101,Inspection report export times out,Done,\"aims-service-cloud, aca, aims-web-cloud, aca-cn\",4")
  );
}

#[test]
fn retired_filter_search_runs_fallback_query() {
  let mut server = mockito::Server::new();
  let retired_enhanced = server
    .mock("POST", "/rest/api/3/search/jql")
    .match_body(Matcher::PartialJson(json!({"jql": "filter=1"})))
    .with_status(410)
    .create();
  let retired_v3 = server
    .mock("GET", "/rest/api/3/search")
    .match_query(Matcher::UrlEncoded("jql".into(), "filter=1".into()))
    .with_status(410)
    .create();
  let retired_v2 = server
    .mock("GET", "/rest/api/2/search")
    .match_query(Matcher::UrlEncoded("jql".into(), "filter=1".into()))
    .with_status(410)
    .create();
  let fallback = server
    .mock("POST", "/rest/api/3/search/jql")
    .match_body(Matcher::Regex("statusCategory = Done".into()))
    .with_status(200)
    .with_body(read_fixture_text("jira/search_enhanced.json"))
    .create();

  let (mut cmd, _home) = cmd_bin("release-scope");
  let out = cmd
    .args(["jira", "extract", "--filter", "1", "--field", "customfield_10423"])
    .args(["--base-url", &server.url(), "--token", "t0k", "--out", "-"])
    .args(["--mapping-file", tempdir().path().join("m.json").to_str().unwrap()])
    .output()
    .unwrap();

  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  retired_enhanced.assert();
  retired_v3.assert();
  retired_v2.assert();
  fallback.assert();

  let report: Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(report["used_fallback"], true);
  assert!(report["jql"].as_str().unwrap().contains("Mobile Squad"));
  assert_eq!(report["records"].as_array().unwrap().len(), 3);
  assert_eq!(report["failures"][0]["issue_key"], "QIMA-104");
}

#[test]
fn detect_field_reads_names_dictionary() {
  let mut server = mockito::Server::new();
  let _sample = server
    .mock("POST", "/rest/api/3/search/jql")
    .match_body(Matcher::PartialJson(json!({"fields": ["key"], "maxResults": 5})))
    .with_status(200)
    .with_body(r#"{"issues": [{"key": "QIMA-101"}], "isLast": true}"#)
    .create();
  let detail = server
    .mock("GET", "/rest/api/3/issue/QIMA-101")
    .match_query(Matcher::UrlEncoded("expand".into(), "names".into()))
    .match_header("authorization", "Bearer t0k")
    .with_status(200)
    .with_body(read_fixture_text("jira/issue_with_names.json"))
    .create();

  let (mut cmd, _home) = cmd_bin("release-scope");
  let out = cmd
    .args(["jira", "detect-field", "--filter", "20334", "--base-url", &server.url(), "--token", "t0k"])
    .output()
    .unwrap();

  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  detail.assert();
  let guess: Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(guess["field_id"], "customfield_10423");
  assert_eq!(guess["field_name"], "Affects Project");
  assert_eq!(guess["detected"], true);
}

#[test]
fn rejected_credentials_fail_with_message() {
  let mut server = mockito::Server::new();
  let _enhanced = server.mock("POST", "/rest/api/3/search/jql").with_status(401).create();
  let _v3 = server.mock("GET", "/rest/api/3/search").match_query(Matcher::Any).with_status(401).create();
  let _v2 = server.mock("GET", "/rest/api/2/search").match_query(Matcher::Any).with_status(401).create();

  let (mut cmd, _home) = cmd_bin("release-scope");
  cmd
    .args(["jira", "extract", "--jql", "project = QIMA", "--field", "customfield_1"])
    .args(["--base-url", &server.url(), "--token", "bad", "--out", "-"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("token invalid or expired"));
}
