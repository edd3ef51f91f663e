// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Config repo commands
//!
//! Every command loads the list first, then works through
//! [`RepositoryCollection`] so the CLI follows the same add/edit flow,
//! validation and conflict handling as any other front end.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use cr_api_contract::ConfigRepoJson;
use cr_core::{OperationError, RecordHandle, RepositoryCollection, TrackerState};
use cr_domain_types::ConfigRepoRecord;
use tracing::{debug, info};

use crate::render;

/// How often `reparse` checks whether the tracker settled
const WAIT_TICK: Duration = Duration::from_millis(100);

fn to_anyhow(err: OperationError) -> anyhow::Error {
    anyhow!(render::operation_error(&err))
}

async fn load(collection: &mut RepositoryCollection) -> Result<()> {
    collection.load().await.map_err(to_anyhow)
}

async fn find(collection: &RepositoryCollection, id: &str) -> Result<RecordHandle> {
    collection
        .find_by_id(id)
        .await
        .ok_or_else(|| anyhow!("Config repo '{id}' not found"))
}

/// Read a record in the admin API's JSON format
pub fn read_record_file(path: &Path) -> Result<ConfigRepoRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let json: ConfigRepoJson = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid config repo definition", path.display()))?;
    Ok(ConfigRepoRecord::from_wire(&json))
}

pub async fn list(
    collection: &mut RepositoryCollection,
    search: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    load(collection).await?;
    let handles = match search {
        Some(text) => collection.find_matching(text).await,
        None => collection.records().to_vec(),
    };

    if handles.is_empty() {
        writeln!(out, "No config repos found")?;
        return Ok(());
    }
    for handle in handles {
        writeln!(out, "{}", render::record_row(&*handle.read().await))?;
    }
    Ok(())
}

pub async fn show(collection: &mut RepositoryCollection, id: &str, out: &mut impl Write) -> Result<()> {
    load(collection).await?;
    let handle = find(collection, id).await?;
    // edit mode re-fetches the record when the server copy changed
    collection.enter_edit_mode(&handle).await.map_err(to_anyhow)?;
    collection.exit_mode();
    writeln!(out, "{}", render::record_details(&*handle.read().await))?;
    Ok(())
}

pub async fn create(
    collection: &mut RepositoryCollection,
    file: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let record = read_record_file(file)?;
    load(collection).await?;

    collection.enter_add_mode(record.material().kind());
    let draft = collection.draft_mut().context("add mode has no draft")?;
    *draft = record;

    let handle = collection.create().await.map_err(to_anyhow)?;
    let id = handle.id().await;
    info!(id = %id, "created config repo");
    writeln!(out, "Created config repo '{id}'")?;
    Ok(())
}

pub async fn update(
    collection: &mut RepositoryCollection,
    id: &str,
    file: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let mut record = read_record_file(file)?;
    if record.id().is_empty() {
        record.set_id(id);
    } else if record.id() != id {
        bail!("{} defines config repo '{}', not '{id}'", file.display(), record.id());
    }

    load(collection).await?;
    let handle = find(collection, id).await?;
    collection.enter_edit_mode(&handle).await.map_err(to_anyhow)?;

    let draft = collection.draft_mut().context("edit mode has no draft")?;
    // the file replaces the definition; the fetched token guards the write
    let token = draft.concurrency_token().map(str::to_string);
    *draft = record.with_token(token);

    let result = collection.update().await;
    collection.exit_mode();
    result.map_err(to_anyhow)?;

    info!(id, "updated config repo");
    writeln!(out, "Updated config repo '{id}'")?;
    Ok(())
}

pub async fn delete(collection: &mut RepositoryCollection, id: &str, out: &mut impl Write) -> Result<()> {
    load(collection).await?;
    let handle = find(collection, id).await?;
    collection.remove(&handle).await.map_err(to_anyhow)?;
    writeln!(out, "Deleted config repo '{id}'")?;
    Ok(())
}

/// Trigger a material update; unless `no_wait`, block until the parse
/// result is in and print it.
pub async fn reparse(
    collection: &mut RepositoryCollection,
    id: &str,
    no_wait: bool,
    out: &mut impl Write,
) -> Result<()> {
    load(collection).await?;
    let handle = find(collection, id).await?;
    let tracker = collection.trigger_update(&handle).await.map_err(to_anyhow)?;

    if no_wait {
        writeln!(out, "Triggered an update of config repo '{id}'")?;
        return Ok(());
    }

    loop {
        match tracker.state() {
            TrackerState::Idle => break,
            TrackerState::Failed => {
                let err = tracker
                    .last_error()
                    .map(|err| render::operation_error(&err))
                    .unwrap_or_else(|| "unknown error".to_string());
                bail!("Update of config repo '{id}' failed: {err}");
            }
            state => {
                debug!(id, ?state, "waiting for material update");
                tokio::time::sleep(WAIT_TICK).await;
            }
        }
    }
    tracker.shutdown().await;

    let record = handle.read().await;
    writeln!(out, "{}: {}", record.id(), render::status_line(record.revision_status()))?;
    if let Some(error) = record.revision_status().and_then(|status| status.error_message()) {
        writeln!(out, "{error}")?;
    }
    Ok(())
}
