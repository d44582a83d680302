use std::fs;

use anyhow::Result;
use expect_test::expect;
use indoc::indoc;
use serde_json::json;
use tempfile::tempdir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{basic_auth, method, path},
};

use crate::{stderr, stdout, updatebot};

const REPO: &str = "contoso/web/_git/frontend";
const REPO_PATH: &str = "/contoso/web/_apis/git/repositories/frontend";

#[test]
fn malformed_repository() -> Result<()> {
    let output = updatebot([
        "-v",
        "list",
        "--package-manager",
        "npm",
        "--repo",
        "contoso/frontend",
    ])?;

    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains("Failed to set up provider for contoso/frontend"));
    assert!(stderr.contains("Failed to parse repository contoso/frontend"));
    Ok(())
}

#[test]
fn missing_repository() -> Result<()> {
    let output = updatebot(["list", "--package-manager", "npm"])?;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("UPDATEBOT_REPOSITORY"));
    Ok(())
}

#[test]
fn payload_without_version() -> Result<()> {
    let tmpdir = tempdir()?;
    let payload_path = tmpdir.path().join("payload.json");
    fs::write(
        &payload_path,
        indoc! {r#"
            {
              "baseCommitSha": "abc123",
              "updatedFiles": [],
              "commitMessage": "",
              "prTitle": "",
              "prBody": "",
              "dependencies": [{ "name": "lodash" }]
            }
        "#},
    )?;
    let payload = payload_path.display().to_string();

    let output = updatebot([
        "create",
        "--package-manager",
        "npm",
        "--repo",
        REPO,
        payload.as_str(),
    ])?;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to deserialize pull request payload"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn list_as_json() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{REPO_PATH}/refs")))
        .and(basic_auth("bot", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"name": "refs/heads/dependabot/npm/lodash-4.17.21"},
                {"name": "refs/heads/dependabot/npm/left-pad-1.3.0"},
            ],
            "count": 2,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tmpdir = tempdir()?;
    let credentials_path = tmpdir.path().join("credentials.json");
    fs::write(
        &credentials_path,
        r#"[{"host": "127.0.0.1", "username": "bot", "password": "s3cret"}]"#,
    )?;
    let credentials = credentials_path.display().to_string();

    let api_url = server.uri();
    let output = tokio::task::spawn_blocking(move || {
        updatebot([
            "list",
            "--json",
            "--package-manager",
            "npm",
            "--repo",
            REPO,
            "--api-url",
            api_url.as_str(),
            "--credentials",
            credentials.as_str(),
        ])
    })
    .await??;

    assert!(output.status.success(), "{}", stderr(&output));
    let expected = expect![[r#"
        [
          [
            {
              "dependencyName": "lodash",
              "dependencyVersion": "4.17.21"
            },
            {
              "dependencyName": "left-pad",
              "dependencyVersion": "1.3.0"
            }
          ]
        ]
    "#]];
    expected.assert_eq(&stdout(&output));
    Ok(())
}

#[test]
fn list_unreachable_remote() -> Result<()> {
    let args = [
        "--package-manager",
        "npm",
        "--repo",
        REPO,
        "--api-url",
        "http://127.0.0.1:1",
    ];

    let output = updatebot(["list"].iter().chain(&args))?;
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to list update branches"));

    // The nested output swallows the failure.
    let output = updatebot(["list", "--json"].iter().chain(&args))?;
    assert!(output.status.success());
    assert_eq!(stdout(&output), "[]\n");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn create_from_payload() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{REPO_PATH}/pushes")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"pushId": 1})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{REPO_PATH}/pullrequests")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"pullRequestId": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let tmpdir = tempdir()?;
    let payload_path = tmpdir.path().join("payload.json");
    fs::write(
        &payload_path,
        indoc! {r#"
            {
              "baseCommitSha": "abc123",
              "updatedFiles": [
                { "directory": "/", "name": "package.json", "content": "{}\n" }
              ],
              "commitMessage": "Bump lodash to 4.17.21",
              "prTitle": "Bump lodash from 4.17.20 to 4.17.21",
              "prBody": "Bumps lodash.",
              "dependencies": [{ "name": "lodash", "version": "4.17.21" }]
            }
        "#},
    )?;
    let payload = payload_path.display().to_string();

    let api_url = server.uri();
    let output = tokio::task::spawn_blocking(move || {
        updatebot([
            "create",
            "--package-manager",
            "npm",
            "--repo",
            REPO,
            "--api-url",
            api_url.as_str(),
            payload.as_str(),
        ])
    })
    .await??;

    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("Pushing refs/heads/dependabot/npm/lodash-4.17.21..."));
    Ok(())
}
