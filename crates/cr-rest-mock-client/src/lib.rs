// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Mock config repo server implementing ConfigRepoApi for testing
//!
//! Repos live in memory with a version number each; the ETag handed out is
//! `"<id>-<version>"`. Material updates are simulated as jobs that report
//! "in progress" for a configurable number of status polls and then publish a
//! parse outcome. Failures, latency and concurrent edits can be injected, and
//! every call is counted so tests can assert on network traffic.

use async_trait::async_trait;
use cr_api_contract::*;
use cr_client_api::{ClientApiError, ClientApiResult, Conditional, ConfigRepoApi, Versioned};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tracing::debug;

/// Operations of [`ConfigRepoApi`], for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    List,
    Get,
    Create,
    Update,
    Delete,
    TriggerUpdate,
    UpdateStatus,
    LastParseResult,
}

#[derive(Debug, Clone)]
struct StoredRepo {
    repo: ConfigRepoJson,
    version: u64,
}

#[derive(Debug, Default)]
struct MockState {
    repos: Vec<StoredRepo>,
    failures: HashMap<MockOperation, ClientApiError>,
    calls: HashMap<MockOperation, usize>,
    /// Remaining "in progress" status answers per running job
    jobs: HashMap<String, usize>,
    /// Outcome published when a repo's job finishes
    outcomes: HashMap<String, ParseResultJson>,
    status_gate: Option<StatusGate>,
}

impl MockState {
    fn find(&self, id: &str) -> Option<&StoredRepo> {
        self.repos.iter().find(|stored| stored.repo.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut StoredRepo> {
        self.repos.iter_mut().find(|stored| stored.repo.id == id)
    }
}

/// Holds status responses until released, so a test can act while a poll
/// is in flight.
#[derive(Debug, Clone, Default)]
pub struct StatusGate {
    arrived: Arc<Notify>,
    release: Arc<Notify>,
}

impl StatusGate {
    /// Wait until a status request is parked at the gate
    pub async fn wait_for_request(&self) {
        self.arrived.notified().await;
    }

    /// Let one parked status request answer
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// In-memory config repo server
#[derive(Debug, Clone)]
pub struct MockConfigRepoServer {
    state: Arc<RwLock<MockState>>,
    /// Configurable delay for operations (in milliseconds)
    delay_ms: u64,
    /// Status polls answered with "in progress" after each trigger
    polls_until_done: usize,
    /// Whether every operation fails
    simulate_failures: bool,
}

impl Default for MockConfigRepoServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConfigRepoServer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockState::default())),
            delay_ms: 0,
            polls_until_done: 1,
            simulate_failures: false,
        }
    }

    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::new()
        }
    }

    pub fn with_failures(simulate_failures: bool) -> Self {
        Self {
            simulate_failures,
            ..Self::new()
        }
    }

    pub fn polls_until_done(mut self, polls: usize) -> Self {
        self.polls_until_done = polls;
        self
    }

    /// Store repos as they would exist on the server, each at version 1
    pub async fn seed(&self, repos: impl IntoIterator<Item = ConfigRepoJson>) {
        let mut state = self.state.write().await;
        for repo in repos {
            state.repos.retain(|stored| stored.repo.id != repo.id);
            state.repos.push(StoredRepo { repo, version: 1 });
        }
    }

    /// Simulate another client editing the repo: its ETag changes
    pub async fn touch(&self, id: &str) {
        if let Some(stored) = self.state.write().await.find_mut(id) {
            stored.version += 1;
        }
    }

    /// Replace the server copy of a repo, bumping its version
    pub async fn replace(&self, repo: ConfigRepoJson) {
        let mut state = self.state.write().await;
        match state.repos.iter().position(|stored| stored.repo.id == repo.id) {
            Some(index) => {
                let stored = &mut state.repos[index];
                stored.repo = repo;
                stored.version += 1;
            }
            None => state.repos.push(StoredRepo { repo, version: 1 }),
        }
    }

    /// Outcome to publish when the repo's next material update finishes
    pub async fn set_parse_outcome(&self, id: &str, outcome: ParseResultJson) {
        self.state.write().await.outcomes.insert(id.to_string(), outcome);
    }

    /// Make an operation fail with `error` until cleared
    pub async fn fail(&self, operation: MockOperation, error: ClientApiError) {
        self.state.write().await.failures.insert(operation, error);
    }

    pub async fn clear_failure(&self, operation: MockOperation) {
        self.state.write().await.failures.remove(&operation);
    }

    /// Park every status request at a gate until released
    pub async fn gate_status(&self) -> StatusGate {
        let gate = StatusGate::default();
        self.state.write().await.status_gate = Some(gate.clone());
        gate
    }

    pub async fn calls(&self, operation: MockOperation) -> usize {
        self.state.read().await.calls.get(&operation).copied().unwrap_or(0)
    }

    pub async fn total_calls(&self) -> usize {
        self.state.read().await.calls.values().sum()
    }

    pub async fn etag_of(&self, id: &str) -> Option<String> {
        self.state.read().await.find(id).map(|stored| etag(id, stored.version))
    }

    pub async fn repo(&self, id: &str) -> Option<ConfigRepoJson> {
        self.state.read().await.find(id).map(|stored| stored.repo.clone())
    }

    pub async fn repo_ids(&self) -> Vec<String> {
        self.state.read().await.repos.iter().map(|stored| stored.repo.id.clone()).collect()
    }

    /// Count the call, apply latency and injected failures
    async fn begin(&self, operation: MockOperation) -> ClientApiResult<()> {
        {
            let mut state = self.state.write().await;
            *state.calls.entry(operation).or_default() += 1;
        }
        if self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.simulate_failures {
            return Err(ClientApiError::Server {
                status: 500,
                message: "Simulated failure".to_string(),
            });
        }
        match self.state.read().await.failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

fn etag(id: &str, version: u64) -> String {
    format!("\"{id}-{version}\"")
}

fn not_found(id: &str) -> ClientApiError {
    ClientApiError::NotFound(format!("Config repo '{id}' was not found!"))
}

/// Server-side checks on an incoming body, keyed by wire field name
fn server_errors(repo: &ConfigRepoJson) -> BTreeMap<String, Vec<String>> {
    let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if repo.id.trim().is_empty() {
        errors.entry("id".into()).or_default().push("Id must be present.".into());
    }
    if repo.plugin_id.trim().is_empty() {
        errors.entry("plugin_id".into()).or_default().push("Plugin id must be present.".into());
    }
    errors
}

fn validation_failure(repo: &ConfigRepoJson, errors: BTreeMap<String, Vec<String>>) -> ClientApiError {
    ClientApiError::Validation {
        message: format!("Validations failed for config repo '{}'. Error(s): [{}].", repo.id, {
            let all: Vec<&str> = errors.values().flatten().map(String::as_str).collect();
            all.join(", ")
        }),
        errors,
    }
}

fn apply_outcome(repo: &mut ConfigRepoJson, outcome: &ParseResultJson) {
    let info = repo.parse_info.get_or_insert_with(ParseInfoJson::default);
    let modification = ModificationJson {
        revision: outcome.revision.clone(),
        ..Default::default()
    };
    info.latest_parsed_modification = Some(modification.clone());
    if outcome.success {
        info.good_modification = Some(modification);
        info.error = None;
    } else {
        info.error = outcome.error.clone();
    }
}

#[async_trait]
impl ConfigRepoApi for MockConfigRepoServer {
    async fn list_repos(&self) -> ClientApiResult<Vec<ConfigRepoJson>> {
        self.begin(MockOperation::List).await?;
        let state = self.state.read().await;
        Ok(state.repos.iter().map(|stored| stored.repo.clone()).collect())
    }

    async fn get_repo(
        &self,
        id: &str,
        etag_in: Option<&str>,
    ) -> ClientApiResult<Conditional<ConfigRepoJson>> {
        self.begin(MockOperation::Get).await?;
        let state = self.state.read().await;
        let stored = state.find(id).ok_or_else(|| not_found(id))?;
        let current = etag(id, stored.version);
        if etag_in == Some(current.as_str()) {
            return Ok(Conditional::NotModified);
        }
        Ok(Conditional::Fetched(Versioned::new(stored.repo.clone(), Some(current))))
    }

    async fn create_repo(&self, repo: &ConfigRepoJson) -> ClientApiResult<Versioned<ConfigRepoJson>> {
        self.begin(MockOperation::Create).await?;
        let mut state = self.state.write().await;

        let mut errors = server_errors(repo);
        if state.find(&repo.id).is_some() {
            errors
                .entry("id".into())
                .or_default()
                .push(format!("ConfigRepo with id '{}' already exists.", repo.id));
        }
        if !errors.is_empty() {
            return Err(validation_failure(repo, errors));
        }

        let mut stored = repo.clone();
        stored.material_update_in_progress = Some(false);
        stored.can_administer = Some(true);
        stored.parse_info.get_or_insert_with(ParseInfoJson::default);
        state.repos.push(StoredRepo {
            repo: stored.clone(),
            version: 1,
        });
        debug!(repo_id = %repo.id, "mock created config repo");
        Ok(Versioned::new(stored, Some(etag(&repo.id, 1))))
    }

    async fn update_repo(
        &self,
        id: &str,
        etag_in: &str,
        repo: &ConfigRepoJson,
    ) -> ClientApiResult<Versioned<ConfigRepoJson>> {
        self.begin(MockOperation::Update).await?;
        let mut state = self.state.write().await;
        let stored = state.find_mut(id).ok_or_else(|| not_found(id))?;

        if etag(id, stored.version) != etag_in {
            return Err(ClientApiError::Conflict {
                message: format!(
                    "Someone has modified the configuration for config repo '{id}'. \
                     Please update your copy of the config with the changes and try again."
                ),
            });
        }
        let errors = server_errors(repo);
        if !errors.is_empty() {
            return Err(validation_failure(repo, errors));
        }

        let mut updated = repo.clone();
        // server-owned fields are never taken from the request
        updated.id = id.to_string();
        updated.parse_info = stored.repo.parse_info.clone();
        updated.material_update_in_progress = stored.repo.material_update_in_progress;
        updated.can_administer = stored.repo.can_administer;
        stored.repo = updated.clone();
        stored.version += 1;
        Ok(Versioned::new(updated, Some(etag(id, stored.version))))
    }

    async fn delete_repo(&self, id: &str) -> ClientApiResult<()> {
        self.begin(MockOperation::Delete).await?;
        let mut state = self.state.write().await;
        let before = state.repos.len();
        state.repos.retain(|stored| stored.repo.id != id);
        if state.repos.len() == before {
            return Err(not_found(id));
        }
        state.jobs.remove(id);
        Ok(())
    }

    async fn trigger_update(&self, id: &str) -> ClientApiResult<()> {
        self.begin(MockOperation::TriggerUpdate).await?;
        let polls = self.polls_until_done;
        let mut state = self.state.write().await;
        let stored = state.find_mut(id).ok_or_else(|| not_found(id))?;
        stored.repo.material_update_in_progress = Some(true);
        state.jobs.entry(id.to_string()).or_insert(polls);
        Ok(())
    }

    async fn update_status(&self, id: &str) -> ClientApiResult<UpdateStatusJson> {
        self.begin(MockOperation::UpdateStatus).await?;

        let gate = self.state.read().await.status_gate.clone();
        if let Some(gate) = gate {
            gate.arrived.notify_one();
            gate.release.notified().await;
        }

        let mut state = self.state.write().await;
        if state.find(id).is_none() {
            return Err(not_found(id));
        }
        let in_progress = match state.jobs.get(id).copied() {
            Some(remaining) if remaining > 0 => {
                state.jobs.insert(id.to_string(), remaining - 1);
                true
            }
            Some(_) => {
                state.jobs.remove(id);
                let outcome = state.outcomes.remove(id);
                if let Some(stored) = state.find_mut(id) {
                    stored.repo.material_update_in_progress = Some(false);
                    if let Some(outcome) = outcome {
                        apply_outcome(&mut stored.repo, &outcome);
                    }
                }
                false
            }
            None => false,
        };
        Ok(UpdateStatusJson { in_progress })
    }

    async fn last_parse_result(&self, id: &str) -> ClientApiResult<ParseResultJson> {
        self.begin(MockOperation::LastParseResult).await?;
        let state = self.state.read().await;
        let stored = state.find(id).ok_or_else(|| not_found(id))?;
        Ok(stored.repo.parse_info.clone().unwrap_or_default().parse_result())
    }
}
