// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Material update tracking for one config repo.
//!
//! A trigger asks the server to re-fetch and re-parse the repo, then a
//! background task polls the job status on a fixed interval. When the job
//! finishes the last parse result is published onto the record.
//!
//! Every trigger takes a new generation number. The poll task re-checks its
//! generation and the shutdown token after each awaited response, so answers
//! that arrive after [`RevisionTracker::stop`] are dropped unapplied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cr_client_api::ConfigRepoApi;
use cr_domain_types::RevisionStatus;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{OperationError, OperationResult};
use crate::record::RecordHandle;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Triggering,
    Polling,
    Reconciling,
    Failed,
}

#[derive(Debug)]
struct TrackerStatus {
    state: TrackerState,
    last_error: Option<OperationError>,
}

/// Everything the poll task needs, cloned out of the tracker
struct PollContext {
    client: Arc<dyn ConfigRepoApi>,
    record: RecordHandle,
    repo_id: String,
    poll_interval: Duration,
    status: Arc<Mutex<TrackerStatus>>,
    generation: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

pub struct RevisionTracker {
    client: Arc<dyn ConfigRepoApi>,
    record: RecordHandle,
    poll_interval: Duration,
    status: Arc<Mutex<TrackerStatus>>,
    generation: Arc<AtomicU64>,
    shutdown: CancellationToken,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for RevisionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionTracker")
            .field("state", &self.state())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl RevisionTracker {
    pub fn new(client: Arc<dyn ConfigRepoApi>, record: RecordHandle) -> Self {
        Self {
            client,
            record,
            poll_interval: DEFAULT_POLL_INTERVAL,
            status: Arc::new(Mutex::new(TrackerStatus {
                state: TrackerState::Idle,
                last_error: None,
            })),
            generation: Arc::new(AtomicU64::new(0)),
            shutdown: CancellationToken::new(),
            poller: Mutex::new(None),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn record(&self) -> &RecordHandle {
        &self.record
    }

    pub fn state(&self) -> TrackerState {
        lock(&self.status).state
    }

    /// True while a trigger or the status polling is outstanding
    pub fn busy(&self) -> bool {
        matches!(self.state(), TrackerState::Triggering | TrackerState::Polling)
    }

    pub fn last_error(&self) -> Option<OperationError> {
        lock(&self.status).last_error.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Ask the server to update the material and start polling.
    ///
    /// Returns once the trigger request is answered; polling continues in
    /// the background.
    pub async fn trigger_update(&self) -> OperationResult<()> {
        {
            let mut status = lock(&self.status);
            if self.shutdown.is_cancelled() {
                return Err(OperationError::TrackerStopped);
            }
            if matches!(status.state, TrackerState::Triggering | TrackerState::Polling) {
                return Err(OperationError::TrackerBusy);
            }
            status.state = TrackerState::Triggering;
            status.last_error = None;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let repo_id = {
            let mut record = self.record.write().await;
            record.set_material_update_in_progress(true);
            if let Some(started) = record.revision_status().map(RevisionStatus::started) {
                record.set_revision_status(started);
            }
            record.id().to_string()
        };

        let ctx = PollContext {
            client: self.client.clone(),
            record: self.record.clone(),
            repo_id,
            poll_interval: self.poll_interval,
            status: self.status.clone(),
            generation: self.generation.clone(),
            shutdown: self.shutdown.clone(),
        };

        debug!(repo_id = %ctx.repo_id, generation, "triggering material update");
        let result = ctx.client.trigger_update(&ctx.repo_id).await;
        if !ctx.is_current(generation) {
            debug!(repo_id = %ctx.repo_id, "tracker stopped while triggering");
            return Err(OperationError::TrackerStopped);
        }

        if let Err(err) = result {
            let err = OperationError::from(err);
            ctx.fail(err.clone()).await;
            return Err(err);
        }

        ctx.set_state(TrackerState::Polling);
        let handle = tokio::spawn(poll_loop(ctx, generation));
        if let Some(previous) = lock(&self.poller).replace(handle) {
            // the previous loop has usually finished; after a trigger during
            // Reconciling it is still running and this stops it
            previous.abort();
        }
        Ok(())
    }

    /// Stop polling for good. Idempotent; responses still in flight are
    /// discarded when they arrive.
    pub fn stop(&self) {
        if !self.shutdown.is_cancelled() {
            debug!("stopping revision tracker");
        }
        self.shutdown.cancel();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Stop and wait for the poll task to wind down
    pub async fn shutdown(&self) {
        self.stop();
        let handle = lock(&self.poller).take();
        if let Some(handle) = handle {
            if let Err(join_err) = handle.await {
                if !join_err.is_cancelled() {
                    error!(error = %join_err, "revision poll task panicked");
                }
            }
        }
    }
}

impl Drop for RevisionTracker {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl PollContext {
    fn is_current(&self, generation: u64) -> bool {
        !self.shutdown.is_cancelled() && self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_state(&self, state: TrackerState) {
        lock(&self.status).state = state;
    }

    async fn fail(&self, err: OperationError) {
        warn!(repo_id = %self.repo_id, error = %err, "material update failed");
        {
            let mut status = lock(&self.status);
            status.state = TrackerState::Failed;
            status.last_error = Some(err);
        }
        self.record.write().await.set_material_update_in_progress(false);
    }

    async fn reconcile(&self, generation: u64) {
        self.set_state(TrackerState::Reconciling);
        let result = self.client.last_parse_result(&self.repo_id).await;
        if !self.is_current(generation) {
            debug!(repo_id = %self.repo_id, "dropping late parse result");
            return;
        }

        match result {
            Ok(parse_result) => {
                {
                    let mut record = self.record.write().await;
                    record.set_revision_status(RevisionStatus::from_parse_result(&parse_result));
                    record.set_material_update_in_progress(false);
                }
                self.set_state(TrackerState::Idle);
                info!(
                    repo_id = %self.repo_id,
                    revision = ?parse_result.revision,
                    success = parse_result.success,
                    "material update finished"
                );
            }
            Err(err) => self.fail(err.into()).await,
        }
    }
}

async fn poll_loop(ctx: PollContext, generation: u64) {
    loop {
        if wait_interval(ctx.poll_interval, &ctx.shutdown).await {
            return;
        }

        let result = ctx.client.update_status(&ctx.repo_id).await;
        if !ctx.is_current(generation) {
            debug!(repo_id = %ctx.repo_id, "dropping late status response");
            return;
        }

        match result {
            Ok(status) if status.in_progress => {
                debug!(repo_id = %ctx.repo_id, "material update still running");
            }
            Ok(_) => {
                ctx.reconcile(generation).await;
                return;
            }
            Err(err) => {
                ctx.fail(err.into()).await;
                return;
            }
        }
    }
}

/// Sleep one interval; true when shutdown won the race
async fn wait_interval(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = sleep(delay) => false,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
