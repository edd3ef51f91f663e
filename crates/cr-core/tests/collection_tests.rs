// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! RepositoryCollection against the in-memory server

use std::sync::Arc;
use std::time::Duration;

use cr_api_contract::ParseResultJson;
use cr_client_api::ClientApiError;
use cr_core::{Mode, OperationError, RepositoryCollection, TrackerState};
use cr_domain_types::{GitAttributes, MaterialAttributes, MaterialKind};
use cr_rest_mock_client::{MockConfigRepoServer, MockOperation};
use cr_test_utils::{JSON_PLUGIN, YAML_PLUGIN, git_repo_json, parsed_repo_json};
use pretty_assertions::assert_eq;

async fn loaded(server: &MockConfigRepoServer) -> RepositoryCollection {
    let mut collection =
        RepositoryCollection::new(Arc::new(server.clone())).with_poll_interval(Duration::from_millis(5));
    collection.load().await.unwrap();
    collection
}

async fn seeded() -> MockConfigRepoServer {
    let server = MockConfigRepoServer::new();
    server
        .seed([
            parsed_repo_json(
                "All_Test_Pipelines",
                "https://github.com/gocd/gocd",
                "4926940143a238fefb7566141ba24a96",
            ),
            git_repo_json("other", "https://example.com/other.git"),
        ])
        .await;
    server
}

fn fill_git_draft(collection: &mut RepositoryCollection, id: &str, url: &str) {
    let draft = collection.draft_mut().unwrap();
    draft.set_id(id);
    draft.set_plugin_id(JSON_PLUGIN);
    draft.set_material(MaterialAttributes::Git(GitAttributes {
        url: Some(url.to_string()),
        ..Default::default()
    }));
}

#[tokio::test]
async fn load_failure_keeps_the_previous_list() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    assert_eq!(collection.records().len(), 2);

    server
        .fail(MockOperation::List, ClientApiError::Transport("connection refused".into()))
        .await;
    let err = collection.load().await.unwrap_err();

    assert_eq!(err, OperationError::Request("connection refused".into()));
    assert_eq!(collection.records().len(), 2);
    assert_eq!(collection.last_error(), Some(&err));

    server.clear_failure(MockOperation::List).await;
    collection.load().await.unwrap();
    assert_eq!(collection.last_error(), None);
}

#[tokio::test]
async fn loaded_records_show_their_parse_status() {
    let server = seeded().await;
    let collection = loaded(&server).await;

    let record = collection.records()[0].read().await;
    let status = record.revision_status().unwrap();
    assert_eq!(status.revision(), Some("4926940143a238fefb7566141ba24a96"));
    assert!(status.success());
}

#[tokio::test]
async fn create_appends_the_server_copy() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;

    collection.enter_add_mode(MaterialKind::Git);
    fill_git_draft(&mut collection, "new-repo", "https://example.com/new.git");
    let handle = collection.create().await.unwrap();

    assert!(collection.mode().is_idle());
    assert_eq!(collection.records().len(), 3);
    assert!(collection.records()[2].same_record(&handle));

    let record = handle.read().await;
    assert_eq!(record.id(), "new-repo");
    assert_eq!(record.concurrency_token(), server.etag_of("new-repo").await.as_deref());
    assert_eq!(record.can_administer(), Some(true));
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_server() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;

    collection.enter_add_mode(MaterialKind::Perforce);
    let err = collection.create().await.unwrap_err();

    let errors = err.field_errors().unwrap();
    assert_eq!(errors.fields(), vec!["id", "pluginId", "port", "view"]);
    assert_eq!(errors.first("port"), Some("Host and port must be present."));
    assert_eq!(server.calls(MockOperation::Create).await, 0);
    assert!(matches!(collection.mode(), Mode::Adding { .. }));
}

#[tokio::test]
async fn duplicate_id_is_caught_locally() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;

    collection.enter_add_mode(MaterialKind::Git);
    fill_git_draft(&mut collection, "other", "https://example.com/dup.git");
    let err = collection.create().await.unwrap_err();

    assert_eq!(
        err.field_errors().unwrap().first("id"),
        Some("Config repo id 'other' is already in use.")
    );
    assert_eq!(server.calls(MockOperation::Create).await, 0);
}

#[tokio::test]
async fn server_rejection_keeps_add_mode() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    // appears on the server after our load
    server.seed([git_repo_json("late", "https://example.com/late.git")]).await;

    collection.enter_add_mode(MaterialKind::Git);
    fill_git_draft(&mut collection, "late", "https://example.com/late.git");
    let err = collection.create().await.unwrap_err();

    match &err {
        OperationError::ServerValidation { errors, .. } => {
            assert_eq!(errors.first("id"), Some("ConfigRepo with id 'late' already exists."));
        }
        other => panic!("expected server validation, got {other:?}"),
    }
    assert_eq!(collection.draft().unwrap().id(), "late");
    assert_eq!(collection.records().len(), 2);
}

#[tokio::test]
async fn edit_refetch_keeps_local_data_when_unchanged() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    let handle = collection.find_by_id("other").await.unwrap();

    collection.enter_edit_mode(&handle).await.unwrap();
    let token = handle.read().await.concurrency_token().map(str::to_string);
    assert_eq!(token, server.etag_of("other").await);
    collection.exit_mode();

    // token is current now, so the server answers "not modified"
    handle.write().await.set_plugin_id("locally-changed");
    collection.enter_edit_mode(&handle).await.unwrap();
    assert_eq!(collection.draft().unwrap().plugin_id(), "locally-changed");
}

#[tokio::test]
async fn edit_refetch_adopts_newer_server_data() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    let handle = collection.find_by_id("other").await.unwrap();

    let mut newer = git_repo_json("other", "https://example.com/other.git");
    newer.plugin_id = YAML_PLUGIN.to_string();
    server.replace(newer).await;

    collection.enter_edit_mode(&handle).await.unwrap();
    assert_eq!(handle.read().await.plugin_id(), YAML_PLUGIN);
    assert_eq!(collection.draft().unwrap().plugin_id(), YAML_PLUGIN);
}

#[tokio::test]
async fn update_adopts_the_response() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    let handle = collection.find_by_id("other").await.unwrap();

    collection.enter_edit_mode(&handle).await.unwrap();
    collection.draft_mut().unwrap().set_plugin_id(YAML_PLUGIN);
    collection.update().await.unwrap();

    assert!(collection.mode().is_idle());
    let record = handle.read().await;
    assert_eq!(record.plugin_id(), YAML_PLUGIN);
    assert_eq!(record.concurrency_token(), server.etag_of("other").await.as_deref());
    assert_eq!(server.repo("other").await.unwrap().plugin_id, YAML_PLUGIN);
}

#[tokio::test]
async fn stale_token_is_a_conflict_not_a_validation_error() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    let handle = collection.find_by_id("other").await.unwrap();

    collection.enter_edit_mode(&handle).await.unwrap();
    let before = handle.snapshot().await;
    server.touch("other").await;

    collection.draft_mut().unwrap().set_plugin_id(YAML_PLUGIN);
    let err = collection.update().await.unwrap_err();

    assert!(err.is_stale_copy());
    assert_eq!(err.field_errors(), None);
    assert_eq!(handle.snapshot().await, before);
    assert!(matches!(collection.mode(), Mode::Editing { .. }));
}

#[tokio::test]
async fn update_without_token_is_stale_without_a_request() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    let handle = collection.find_by_id("other").await.unwrap();

    collection.enter_edit_mode(&handle).await.unwrap();
    handle.write().await.set_concurrency_token(None);

    let err = collection.update().await.unwrap_err();
    assert!(err.is_stale_copy());
    assert_eq!(server.calls(MockOperation::Update).await, 0);
}

#[tokio::test]
async fn update_validation_failure_keeps_edit_mode() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    let handle = collection.find_by_id("other").await.unwrap();

    collection.enter_edit_mode(&handle).await.unwrap();
    collection.draft_mut().unwrap().set_plugin_id("");
    let err = collection.update().await.unwrap_err();

    assert!(matches!(err, OperationError::ClientValidation(_)));
    assert_eq!(server.calls(MockOperation::Update).await, 0);
    assert!(matches!(collection.mode(), Mode::Editing { .. }));
}

#[tokio::test]
async fn update_outside_edit_mode_is_refused() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    collection.enter_add_mode(MaterialKind::Git);

    assert_eq!(
        collection.update().await,
        Err(OperationError::WrongMode { expected: "edit" })
    );
}

#[tokio::test]
async fn discarded_add_draft_is_never_submitted() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;

    collection.enter_add_mode(MaterialKind::Git);
    fill_git_draft(&mut collection, "abandoned", "https://example.com/abandoned.git");
    let handle = collection.find_by_id("other").await.unwrap();
    collection.enter_edit_mode(&handle).await.unwrap();
    collection.update().await.unwrap();

    assert!(collection.create().await.is_err());
    assert!(!server.repo_ids().await.contains(&"abandoned".to_string()));
    assert_eq!(server.calls(MockOperation::Create).await, 0);
}

#[tokio::test]
async fn remove_by_identity() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    let handle = collection.find_by_id("other").await.unwrap();
    collection.enter_edit_mode(&handle).await.unwrap();

    collection.remove(&handle).await.unwrap();

    assert_eq!(collection.records().len(), 1);
    assert!(!collection.contains(&handle));
    assert!(collection.mode().is_idle());
    assert_eq!(server.repo_ids().await, vec!["All_Test_Pipelines".to_string()]);
}

#[tokio::test]
async fn failed_remove_leaves_the_list() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    let handle = collection.find_by_id("other").await.unwrap();
    server
        .fail(
            MockOperation::Delete,
            ClientApiError::Server {
                status: 500,
                message: "database is read-only".into(),
            },
        )
        .await;

    assert!(collection.remove(&handle).await.is_err());
    assert_eq!(collection.records().len(), 2);
    assert!(collection.last_error().is_some());
}

#[tokio::test]
async fn search_preserves_list_order() {
    let server = seeded().await;
    let collection = loaded(&server).await;

    let ids = |handles: Vec<cr_core::RecordHandle>| async move {
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.id().await);
        }
        ids
    };

    assert_eq!(ids(collection.find_matching("").await).await, vec!["All_Test_Pipelines", "other"]);
    assert_eq!(ids(collection.find_matching("all_test").await).await, vec!["All_Test_Pipelines"]);
    assert_eq!(ids(collection.find_matching("4926").await).await, vec!["All_Test_Pipelines"]);
    assert_eq!(ids(collection.find_matching("example.com").await).await, vec!["other"]);
    assert!(collection.find_matching("nothing-like-this").await.is_empty());
}

#[tokio::test]
async fn trigger_through_the_collection() {
    let server = seeded().await;
    let mut collection = loaded(&server).await;
    let handle = collection.find_by_id("other").await.unwrap();
    server
        .set_parse_outcome(
            "other",
            ParseResultJson {
                revision: Some("feedbeef".into()),
                success: true,
                error: None,
            },
        )
        .await;

    let tracker = collection.trigger_update(&handle).await.unwrap();
    assert!(Arc::ptr_eq(&tracker, &collection.tracker_for(&handle).unwrap()));

    tokio::time::timeout(Duration::from_secs(5), async {
        while tracker.state() != TrackerState::Idle {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();

    let record = handle.read().await;
    assert_eq!(record.revision_status().unwrap().revision(), Some("feedbeef"));
    assert!(!record.material_update_in_progress());
}

#[tokio::test]
async fn reload_and_remove_stop_trackers() {
    let server = MockConfigRepoServer::new().polls_until_done(1000);
    server.seed([git_repo_json("slow", "https://example.com/slow.git")]).await;
    let mut collection = loaded(&server).await;

    let handle = collection.records()[0].clone();
    let tracker = collection.trigger_update(&handle).await.unwrap();
    collection.load().await.unwrap();
    assert!(tracker.is_stopped());
    assert!(collection.tracker_for(&handle).is_none());

    let handle = collection.records()[0].clone();
    let tracker = collection.trigger_update(&handle).await.unwrap();
    collection.remove(&handle).await.unwrap();
    assert!(tracker.is_stopped());
}
