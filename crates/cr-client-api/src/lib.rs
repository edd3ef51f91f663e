// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Client interface for the config repository admin API
//!
//! [`ConfigRepoApi`] is the seam between the synchronization layer and the
//! server. The REST client implements it over HTTP and the mock client
//! implements it in memory; callers hold it as `Arc<dyn ConfigRepoApi>`.

use async_trait::async_trait;
use cr_api_contract::{ConfigRepoJson, ParseResultJson, UpdateStatusJson};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub type ClientApiResult<T> = Result<T, ClientApiError>;

/// A server entity paired with its concurrency token (ETag)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub value: T,
    pub etag: Option<String>,
}

impl<T> Versioned<T> {
    pub fn new(value: T, etag: Option<String>) -> Self {
        Self { value, etag }
    }
}

/// Result of a conditional fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditional<T> {
    /// The supplied token still matches the server copy
    NotModified,
    Fetched(Versioned<T>),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientApiError {
    /// The concurrency token no longer matches the server copy
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The server rejected the entity; keys are wire field names
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[async_trait]
pub trait ConfigRepoApi: Send + Sync {
    /// List every config repo visible to the caller
    async fn list_repos(&self) -> ClientApiResult<Vec<ConfigRepoJson>>;

    /// Fetch one repo; with `etag`, returns [`Conditional::NotModified`] when
    /// the server copy is unchanged.
    async fn get_repo(
        &self,
        id: &str,
        etag: Option<&str>,
    ) -> ClientApiResult<Conditional<ConfigRepoJson>>;

    async fn create_repo(&self, repo: &ConfigRepoJson) -> ClientApiResult<Versioned<ConfigRepoJson>>;

    /// Conditional update; a stale `etag` yields [`ClientApiError::Conflict`]
    async fn update_repo(
        &self,
        id: &str,
        etag: &str,
        repo: &ConfigRepoJson,
    ) -> ClientApiResult<Versioned<ConfigRepoJson>>;

    async fn delete_repo(&self, id: &str) -> ClientApiResult<()>;

    /// Ask the server to fetch and parse the repo's latest revision
    async fn trigger_update(&self, id: &str) -> ClientApiResult<()>;

    async fn update_status(&self, id: &str) -> ClientApiResult<UpdateStatusJson>;

    async fn last_parse_result(&self, id: &str) -> ClientApiResult<ParseResultJson>;
}
