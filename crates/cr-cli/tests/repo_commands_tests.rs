// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! CLI commands against the in-memory server

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cr_api_contract::{ConfigRepoJson, ParseResultJson};
use cr_cli::repo_commands;
use cr_client_api::ClientApiError;
use cr_core::RepositoryCollection;
use cr_rest_mock_client::{MockConfigRepoServer, MockOperation};
use cr_test_utils::{git_repo_json, parsed_repo_json};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn seeded() -> MockConfigRepoServer {
    let server = MockConfigRepoServer::new();
    server
        .seed([
            parsed_repo_json("gocd", "https://github.com/gocd/gocd", "4926940143a2"),
            git_repo_json("other", "https://example.com/other.git"),
        ])
        .await;
    server
}

fn collection(server: &MockConfigRepoServer) -> RepositoryCollection {
    RepositoryCollection::new(Arc::new(server.clone())).with_poll_interval(Duration::from_millis(5))
}

fn write_repo(dir: &TempDir, repo: &ConfigRepoJson) -> PathBuf {
    let path = dir.path().join(format!("{}.json", repo.id));
    std::fs::write(&path, serde_json::to_string_pretty(repo).unwrap()).unwrap();
    path
}

fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn list_filters_by_search_text() {
    let server = seeded().await;
    let mut out = Vec::new();
    repo_commands::list(&mut collection(&server), Some("49269"), &mut out).await.unwrap();

    let output = text(out);
    assert_eq!(output.lines().count(), 1);
    assert!(output.starts_with("gocd "));
    assert!(output.contains("parsed 4926940143a2"));
}

#[tokio::test]
async fn list_reports_an_empty_result() {
    let server = seeded().await;
    let mut out = Vec::new();
    repo_commands::list(&mut collection(&server), Some("nothing-matches"), &mut out)
        .await
        .unwrap();
    assert_eq!(text(out), "No config repos found\n");
}

#[tokio::test]
async fn show_prints_details() {
    let server = seeded().await;
    let mut out = Vec::new();
    repo_commands::show(&mut collection(&server), "gocd", &mut out).await.unwrap();

    let output = text(out);
    assert!(output.contains("Id:        gocd"));
    assert!(output.contains("Material:  Git https://github.com/gocd/gocd"));
}

#[tokio::test]
async fn show_unknown_id_fails() {
    let server = seeded().await;
    let err = repo_commands::show(&mut collection(&server), "missing", &mut Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Config repo 'missing' not found");
}

#[tokio::test]
async fn create_from_file() {
    let server = seeded().await;
    let dir = TempDir::new().unwrap();
    let file = write_repo(&dir, &git_repo_json("fresh", "https://example.com/fresh.git"));

    let mut out = Vec::new();
    repo_commands::create(&mut collection(&server), &file, &mut out).await.unwrap();

    assert_eq!(text(out), "Created config repo 'fresh'\n");
    assert!(server.repo("fresh").await.is_some());
}

#[tokio::test]
async fn invalid_file_is_rejected_before_any_request() {
    let server = seeded().await;
    let dir = TempDir::new().unwrap();
    let mut repo = git_repo_json("fresh", "https://example.com/fresh.git");
    repo.plugin_id = String::new();
    let file = write_repo(&dir, &repo);

    let err = repo_commands::create(&mut collection(&server), &file, &mut Vec::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("pluginId:"));
    assert_eq!(server.calls(MockOperation::Create).await, 0);
}

#[tokio::test]
async fn malformed_file_names_the_path() {
    let server = seeded().await;
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("broken.json");
    std::fs::write(&file, "{ not json").unwrap();

    let err = repo_commands::create(&mut collection(&server), &file, &mut Vec::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("broken.json"));
    assert_eq!(server.total_calls().await, 0);
}

#[tokio::test]
async fn update_replaces_the_definition() {
    let server = seeded().await;
    let dir = TempDir::new().unwrap();
    let mut repo = git_repo_json("other", "https://example.com/moved.git");
    repo.plugin_id = cr_test_utils::YAML_PLUGIN.to_string();
    let file = write_repo(&dir, &repo);

    let mut out = Vec::new();
    repo_commands::update(&mut collection(&server), "other", &file, &mut out)
        .await
        .unwrap();

    assert_eq!(text(out), "Updated config repo 'other'\n");
    let stored = server.repo("other").await.unwrap();
    assert_eq!(stored.plugin_id, cr_test_utils::YAML_PLUGIN);
}

#[tokio::test]
async fn update_refuses_a_file_for_another_repo() {
    let server = seeded().await;
    let dir = TempDir::new().unwrap();
    let file = write_repo(&dir, &git_repo_json("gocd", "https://example.com/x.git"));

    let err = repo_commands::update(&mut collection(&server), "other", &file, &mut Vec::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not 'other'"));
    assert_eq!(server.calls(MockOperation::Update).await, 0);
}

#[tokio::test]
async fn update_conflict_tells_the_user_to_reload() {
    let server = seeded().await;
    server
        .fail(
            MockOperation::Update,
            ClientApiError::Conflict {
                message: "Someone has modified the configuration for config repo 'other'.".into(),
            },
        )
        .await;
    let dir = TempDir::new().unwrap();
    let file = write_repo(&dir, &git_repo_json("other", "https://example.com/moved.git"));

    let err = repo_commands::update(&mut collection(&server), "other", &file, &mut Vec::new())
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("Someone has modified"));
    assert!(message.contains("Fetch the latest copy"));
}

#[tokio::test]
async fn delete_removes_from_the_server() {
    let server = seeded().await;
    let mut out = Vec::new();
    repo_commands::delete(&mut collection(&server), "other", &mut out).await.unwrap();

    assert_eq!(text(out), "Deleted config repo 'other'\n");
    assert_eq!(server.repo_ids().await, vec!["gocd".to_string()]);
}

#[tokio::test]
async fn reparse_waits_for_the_result() {
    let server = seeded().await.polls_until_done(2);
    server
        .set_parse_outcome(
            "other",
            ParseResultJson {
                revision: Some("feedbeef".into()),
                success: false,
                error: Some("Unexpected token in other.gocd.json".into()),
            },
        )
        .await;

    let mut out = Vec::new();
    repo_commands::reparse(&mut collection(&server), "other", false, &mut out)
        .await
        .unwrap();

    assert_eq!(
        text(out),
        "other: failed at feedbeef\nUnexpected token in other.gocd.json\n"
    );
    assert_eq!(server.calls(MockOperation::UpdateStatus).await, 3);
}

#[tokio::test]
async fn reparse_without_waiting() {
    let server = seeded().await;
    let mut out = Vec::new();
    repo_commands::reparse(&mut collection(&server), "gocd", true, &mut out)
        .await
        .unwrap();

    assert_eq!(text(out), "Triggered an update of config repo 'gocd'\n");
    assert_eq!(server.calls(MockOperation::TriggerUpdate).await, 1);
}

#[tokio::test]
async fn reparse_reports_a_failed_trigger() {
    let server = seeded().await;
    server
        .fail(
            MockOperation::TriggerUpdate,
            ClientApiError::Transport("connection refused".into()),
        )
        .await;

    let err = repo_commands::reparse(&mut collection(&server), "gocd", false, &mut Vec::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("connection refused"));
}
