// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The config repo list and its add/edit workflow

use std::sync::Arc;
use std::time::Duration;

use cr_client_api::{Conditional, ConfigRepoApi};
use cr_domain_types::{ConfigRepoRecord, MaterialKind};
use tracing::{debug, info, warn};

use crate::error::{OperationError, OperationResult};
use crate::record::RecordHandle;
use crate::revision_tracker::{DEFAULT_POLL_INTERVAL, RevisionTracker};

const NOT_FETCHED_MESSAGE: &str =
    "This config repo has not been fetched from the server yet. Reload it and try again.";

/// The single active form, if any. Holding the draft inside the variant
/// makes "adding and editing at once" unrepresentable.
#[derive(Debug, Default)]
pub enum Mode {
    #[default]
    Idle,
    Adding {
        draft: ConfigRepoRecord,
    },
    Editing {
        target: RecordHandle,
        draft: ConfigRepoRecord,
    },
}

impl Mode {
    pub fn is_idle(&self) -> bool {
        matches!(self, Mode::Idle)
    }

    pub fn draft(&self) -> Option<&ConfigRepoRecord> {
        match self {
            Mode::Idle => None,
            Mode::Adding { draft } | Mode::Editing { draft, .. } => Some(draft),
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut ConfigRepoRecord> {
        match self {
            Mode::Idle => None,
            Mode::Adding { draft } | Mode::Editing { draft, .. } => Some(draft),
        }
    }

    /// The record being edited
    pub fn target(&self) -> Option<&RecordHandle> {
        match self {
            Mode::Editing { target, .. } => Some(target),
            _ => None,
        }
    }
}

pub struct RepositoryCollection {
    client: Arc<dyn ConfigRepoApi>,
    records: Vec<RecordHandle>,
    mode: Mode,
    trackers: Vec<Arc<RevisionTracker>>,
    last_error: Option<OperationError>,
    poll_interval: Duration,
}

impl RepositoryCollection {
    pub fn new(client: Arc<dyn ConfigRepoApi>) -> Self {
        Self {
            client,
            records: Vec::new(),
            mode: Mode::Idle,
            trackers: Vec::new(),
            last_error: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Poll interval handed to trackers created from now on
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn records(&self) -> &[RecordHandle] {
        &self.records
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn draft(&self) -> Option<&ConfigRepoRecord> {
        self.mode.draft()
    }

    pub fn draft_mut(&mut self) -> Option<&mut ConfigRepoRecord> {
        self.mode.draft_mut()
    }

    /// Error of the most recent failed operation, kept until one succeeds
    pub fn last_error(&self) -> Option<&OperationError> {
        self.last_error.as_ref()
    }

    pub fn contains(&self, handle: &RecordHandle) -> bool {
        self.records.iter().any(|record| record.same_record(handle))
    }

    /// Replace the list with the server's. On failure the previous list stays.
    pub async fn load(&mut self) -> OperationResult<()> {
        let repos = match self.client.list_repos().await {
            Ok(repos) => repos,
            Err(err) => return Err(self.fail(err.into())),
        };

        for tracker in std::mem::take(&mut self.trackers) {
            tracker.shutdown().await;
        }
        if matches!(self.mode, Mode::Editing { .. }) {
            debug!("edit target replaced by reload; leaving edit mode");
            self.mode = Mode::Idle;
        }

        self.records = repos
            .iter()
            .map(|json| RecordHandle::new(ConfigRepoRecord::from_wire(json)))
            .collect();
        self.last_error = None;
        info!(count = self.records.len(), "loaded config repos");
        Ok(())
    }

    pub fn enter_add_mode(&mut self, kind: MaterialKind) {
        self.exit_mode();
        debug!(material = %kind, "entering add mode");
        self.mode = Mode::Adding {
            draft: ConfigRepoRecord::empty(kind),
        };
    }

    /// Refresh the record from the server, then edit a copy of it.
    ///
    /// Any active form is cancelled first, so an earlier draft is never
    /// carried into the new one.
    pub async fn enter_edit_mode(&mut self, handle: &RecordHandle) -> OperationResult<()> {
        self.exit_mode();
        if !self.contains(handle) {
            return Err(self.fail(OperationError::NotFound(format!(
                "Config repo '{}' is not in the list.",
                handle.id().await
            ))));
        }

        let (id, token) = {
            let record = handle.read().await;
            (record.id().to_string(), record.concurrency_token().map(str::to_string))
        };
        match self.client.get_repo(&id, token.as_deref()).await {
            Ok(Conditional::NotModified) => {
                debug!(repo_id = %id, "local copy is current");
            }
            Ok(Conditional::Fetched(fresh)) => {
                debug!(repo_id = %id, "adopting server copy before edit");
                handle.write().await.adopt_server_copy(&fresh.value, fresh.etag);
            }
            Err(err) => return Err(self.fail(err.into())),
        }

        self.mode = Mode::Editing {
            target: handle.clone(),
            draft: handle.snapshot().await,
        };
        self.last_error = None;
        Ok(())
    }

    /// Discard the draft. No network call.
    pub fn exit_mode(&mut self) {
        if !self.mode.is_idle() {
            debug!("discarding draft");
        }
        self.mode = Mode::Idle;
    }

    /// Submit the add-mode draft. On failure the form stays open.
    pub async fn create(&mut self) -> OperationResult<RecordHandle> {
        let Mode::Adding { draft } = &self.mode else {
            return Err(OperationError::WrongMode { expected: "add" });
        };
        let mut errors = draft.validate();
        let payload = draft.to_wire();

        if self.find_by_id(&payload.id).await.is_some() {
            errors.add("id", format!("Config repo id '{}' is already in use.", payload.id));
        }
        if !errors.is_empty() {
            return Err(self.fail(OperationError::ClientValidation(errors)));
        }

        match self.client.create_repo(&payload).await {
            Ok(created) => {
                let record = ConfigRepoRecord::from_wire(&created.value).with_token(created.etag);
                let handle = RecordHandle::new(record);
                self.records.push(handle.clone());
                self.mode = Mode::Idle;
                self.last_error = None;
                info!(repo_id = %payload.id, "created config repo");
                Ok(handle)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Submit the edit-mode draft against the target's concurrency token.
    ///
    /// A stale token fails with [`OperationError::StaleCopy`] and leaves the
    /// target untouched; validation failures keep the form open.
    pub async fn update(&mut self) -> OperationResult<()> {
        let Mode::Editing { target, draft } = &self.mode else {
            return Err(OperationError::WrongMode { expected: "edit" });
        };
        let target = target.clone();
        let errors = draft.validate();
        let payload = draft.to_wire();
        if !errors.is_empty() {
            return Err(self.fail(OperationError::ClientValidation(errors)));
        }

        let (id, token) = {
            let record = target.read().await;
            (record.id().to_string(), record.concurrency_token().map(str::to_string))
        };
        let Some(token) = token else {
            return Err(self.fail(OperationError::StaleCopy {
                message: NOT_FETCHED_MESSAGE.to_string(),
            }));
        };

        match self.client.update_repo(&id, &token, &payload).await {
            Ok(updated) => {
                target.write().await.adopt_server_copy(&updated.value, updated.etag);
                self.mode = Mode::Idle;
                self.last_error = None;
                info!(repo_id = %id, "updated config repo");
                Ok(())
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Delete on the server, then drop the record by identity
    pub async fn remove(&mut self, handle: &RecordHandle) -> OperationResult<()> {
        let id = handle.id().await;
        if !self.contains(handle) {
            return Err(self.fail(OperationError::NotFound(format!(
                "Config repo '{id}' is not in the list."
            ))));
        }
        if let Err(err) = self.client.delete_repo(&id).await {
            return Err(self.fail(err.into()));
        }

        self.records.retain(|record| !record.same_record(handle));
        if let Some(index) = self.tracker_index(handle) {
            self.trackers.swap_remove(index).shutdown().await;
        }
        if self.mode.target().is_some_and(|target| target.same_record(handle)) {
            self.mode = Mode::Idle;
        }
        self.last_error = None;
        info!(repo_id = %id, "deleted config repo");
        Ok(())
    }

    /// Records matching `search_text`, in list order
    pub async fn find_matching(&self, search_text: &str) -> Vec<RecordHandle> {
        let mut matching = Vec::new();
        for handle in &self.records {
            if handle.read().await.matches(search_text) {
                matching.push(handle.clone());
            }
        }
        matching
    }

    pub async fn find_by_id(&self, id: &str) -> Option<RecordHandle> {
        for handle in &self.records {
            if handle.read().await.id() == id {
                return Some(handle.clone());
            }
        }
        None
    }

    /// Start a material update for the record, creating its tracker on first use
    pub async fn trigger_update(
        &mut self,
        handle: &RecordHandle,
    ) -> OperationResult<Arc<RevisionTracker>> {
        if !self.contains(handle) {
            return Err(self.fail(OperationError::NotFound(format!(
                "Config repo '{}' is not in the list.",
                handle.id().await
            ))));
        }

        let tracker = match self.tracker_for(handle) {
            Some(tracker) => tracker,
            None => {
                let tracker = Arc::new(
                    RevisionTracker::new(self.client.clone(), handle.clone())
                        .with_poll_interval(self.poll_interval),
                );
                self.trackers.push(tracker.clone());
                tracker
            }
        };

        match tracker.trigger_update().await {
            Ok(()) => {
                self.last_error = None;
                Ok(tracker)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub fn tracker_for(&self, handle: &RecordHandle) -> Option<Arc<RevisionTracker>> {
        self.tracker_index(handle).map(|index| self.trackers[index].clone())
    }

    fn tracker_index(&self, handle: &RecordHandle) -> Option<usize> {
        self.trackers.iter().position(|tracker| tracker.record().same_record(handle))
    }

    fn fail(&mut self, err: OperationError) -> OperationError {
        warn!(error = %err, "config repo operation failed");
        self.last_error = Some(err.clone());
        err
    }
}
