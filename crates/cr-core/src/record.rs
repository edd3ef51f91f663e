// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::sync::Arc;

use cr_domain_types::ConfigRepoRecord;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared handle to a record in the collection.
///
/// Two handles are the same record only if they point at the same
/// allocation; ids can repeat across reloads, identity cannot.
#[derive(Debug, Clone)]
pub struct RecordHandle(Arc<RwLock<ConfigRepoRecord>>);

impl RecordHandle {
    pub fn new(record: ConfigRepoRecord) -> Self {
        Self(Arc::new(RwLock::new(record)))
    }

    pub fn same_record(&self, other: &RecordHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, ConfigRepoRecord> {
        self.0.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, ConfigRepoRecord> {
        self.0.write().await
    }

    /// Deep copy of the current state
    pub async fn snapshot(&self) -> ConfigRepoRecord {
        self.0.read().await.clone()
    }

    pub async fn id(&self) -> String {
        self.0.read().await.id().to_string()
    }
}
