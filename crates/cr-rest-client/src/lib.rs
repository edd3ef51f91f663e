// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! HTTP client for the config repository admin API
//!
//! [`RestClient`] speaks the server's JSON admin endpoints, carrying ETags for
//! conditional fetches and updates, and implements [`ConfigRepoApi`] so the
//! synchronization layer can use it interchangeably with the mock client.

pub mod auth;
pub mod client;
pub mod error;

pub use auth::*;
pub use client::*;
pub use error::*;

use cr_api_contract::{ConfigRepoJson, ParseResultJson, UpdateStatusJson};
use cr_client_api::{ClientApiResult, Conditional, ConfigRepoApi, Versioned};
use async_trait::async_trait;

#[async_trait]
impl ConfigRepoApi for client::RestClient {
    async fn list_repos(&self) -> ClientApiResult<Vec<ConfigRepoJson>> {
        self.list_config_repos().await.map_err(Into::into)
    }

    async fn get_repo(
        &self,
        id: &str,
        etag: Option<&str>,
    ) -> ClientApiResult<Conditional<ConfigRepoJson>> {
        self.get_config_repo(id, etag).await.map_err(Into::into)
    }

    async fn create_repo(&self, repo: &ConfigRepoJson) -> ClientApiResult<Versioned<ConfigRepoJson>> {
        self.create_config_repo(repo).await.map_err(Into::into)
    }

    async fn update_repo(
        &self,
        id: &str,
        etag: &str,
        repo: &ConfigRepoJson,
    ) -> ClientApiResult<Versioned<ConfigRepoJson>> {
        self.update_config_repo(id, etag, repo).await.map_err(Into::into)
    }

    async fn delete_repo(&self, id: &str) -> ClientApiResult<()> {
        self.delete_config_repo(id).await.map_err(Into::into)
    }

    async fn trigger_update(&self, id: &str) -> ClientApiResult<()> {
        self.trigger_material_update(id).await.map_err(Into::into)
    }

    async fn update_status(&self, id: &str) -> ClientApiResult<UpdateStatusJson> {
        self.material_update_status(id).await.map_err(Into::into)
    }

    async fn last_parse_result(&self, id: &str) -> ClientApiResult<ParseResultJson> {
        self.get_last_parse_result(id).await.map_err(Into::into)
    }
}
