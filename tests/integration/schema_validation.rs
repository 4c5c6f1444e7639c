use jsonschema::validator_for;
use mockito::Matcher;
use serde_json::Value;
use test_support::{cmd_bin, read_fixture_text, read_json_file, schemas_dir, tempdir};

fn compile_schema(name: &str) -> jsonschema::Validator {
  let data = std::fs::read(schemas_dir().join(name)).expect("schema file");
  let schema: Value = serde_json::from_slice(&data).expect("valid schema JSON");
  validator_for(&schema).expect("compile schema")
}

#[test]
fn jira_export_conforms_to_schema() {
  let mut server = mockito::Server::new();
  let _search = server
    .mock("POST", "/rest/api/3/search/jql")
    .with_status(200)
    .with_body(read_fixture_text("jira/search_enhanced.json"))
    .create();

  let out_dir = tempdir();
  let (mut cmd, _home) = cmd_bin("release-scope");
  let out = cmd
    .args(["jira", "extract", "--jql", "project = QIMA", "--field", "customfield_10423"])
    .args(["--base-url", &server.url(), "--token", "t"])
    .args(["--mapping-file", out_dir.path().join("m.json").to_str().unwrap()])
    .args(["--out", out_dir.path().to_str().unwrap()])
    .output()
    .unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

  let summary: Value = serde_json::from_slice(&out.stdout).unwrap();
  let exported = read_json_file(summary["json"].as_str().unwrap());
  compile_schema("jira-affects-projects.schema.json")
    .validate(&exported)
    .expect("schema validation failed for jira export");
}

#[test]
fn argocd_export_conforms_to_schema() {
  let mut server = mockito::Server::new();
  let _app = server
    .mock("GET", "/api/v1/applications/staging-web--qcore-staging")
    .with_status(200)
    .with_body(read_fixture_text("argocd/application.json"))
    .create();
  let _manifests = server
    .mock("GET", "/api/v1/applications/staging-web--qcore-staging/manifests")
    .match_query(Matcher::Any)
    .with_status(200)
    .with_body(read_fixture_text("argocd/manifests.json"))
    .create();

  let work = tempdir();
  let previous = work.path().join("prev.json");
  std::fs::write(&previous, r#"{"results": {"web": "2.14.0"}}"#).unwrap();

  let (mut cmd, _home) = cmd_bin("release-scope");
  let out = cmd
    .args(["argocd", "images", "--env", "staging", "--services", "web,api"])
    .args(["--token", "t", "--server-override", &server.url()])
    .args(["--compare-with", previous.to_str().unwrap()])
    .args(["--out", work.path().join("results").to_str().unwrap()])
    .output()
    .unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

  let summary: Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(summary["total_changes"], 0);
  let exported = read_json_file(summary["json"].as_str().unwrap());
  compile_schema("argocd-images.schema.json")
    .validate(&exported)
    .expect("schema validation failed for argocd export");
}
