// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Main REST API client implementation

use cr_api_contract::validation::validate_config_repo_payload;
use cr_api_contract::*;
use cr_client_api::{Conditional, Versioned};
use reqwest::header::{ACCEPT, ETAG, HeaderMap, HeaderValue, IF_MATCH, IF_NONE_MATCH};
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::AuthConfig;
use crate::error::{RestClientError, RestClientResult};

const CONFIG_REPOS_PATH: [&str; 3] = ["api", "admin", "config_repos"];
const CONFIRM_HEADER: &str = "x-gocd-confirm";

/// REST API client for the config repository admin endpoints
#[derive(Debug, Clone)]
pub struct RestClient {
    http_client: HttpClient,
    base_url: Url,
    auth: AuthConfig,
}

impl RestClient {
    /// Create a new REST client. The base URL is treated as a directory, so
    /// `https://ci.example.com/go` and `https://ci.example.com/go/` are equivalent.
    pub fn new(mut base_url: Url, auth: AuthConfig) -> RestClientResult<Self> {
        if base_url.cannot_be_a_base() {
            return Err(RestClientError::InvalidBaseUrl(base_url.to_string()));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = HttpClient::builder()
            .user_agent(concat!("cr/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            auth,
        })
    }

    /// Create a client from a base URL string
    pub fn from_url(base_url: &str, auth: AuthConfig) -> RestClientResult<Self> {
        let base_url = Url::parse(base_url)?;
        Self::new(base_url, auth)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    pub async fn list_config_repos(&self) -> RestClientResult<Vec<ConfigRepoJson>> {
        let url = self.repos_url(&[])?;
        let response = self.send(Method::GET, url, None::<&()>, HeaderMap::new()).await?;
        let list: Versioned<ConfigReposListJson> = self.read_versioned(response).await?;
        Ok(list.value.into_repos())
    }

    /// Fetch a repo, sending `If-None-Match` when an ETag is known
    pub async fn get_config_repo(
        &self,
        id: &str,
        etag: Option<&str>,
    ) -> RestClientResult<Conditional<ConfigRepoJson>> {
        let url = self.repos_url(&[id])?;
        let mut headers = HeaderMap::new();
        if let Some(etag) = etag {
            headers.insert(IF_NONE_MATCH, header_value(etag)?);
        }

        let response = self.send(Method::GET, url, None::<&()>, headers).await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            debug!(repo_id = %id, "config repo not modified");
            return Ok(Conditional::NotModified);
        }
        Ok(Conditional::Fetched(self.read_versioned(response).await?))
    }

    pub async fn create_config_repo(
        &self,
        repo: &ConfigRepoJson,
    ) -> RestClientResult<Versioned<ConfigRepoJson>> {
        validate_config_repo_payload(repo)?;
        let url = self.repos_url(&[])?;
        let response = self.send(Method::POST, url, Some(repo), HeaderMap::new()).await?;
        self.read_versioned(response).await
    }

    /// Update a repo with `If-Match`; a stale ETag comes back as 412
    pub async fn update_config_repo(
        &self,
        id: &str,
        etag: &str,
        repo: &ConfigRepoJson,
    ) -> RestClientResult<Versioned<ConfigRepoJson>> {
        validate_config_repo_payload(repo)?;
        let url = self.repos_url(&[id])?;
        let mut headers = HeaderMap::new();
        headers.insert(IF_MATCH, header_value(etag)?);
        let response = self.send(Method::PUT, url, Some(repo), headers).await?;
        self.read_versioned(response).await
    }

    pub async fn delete_config_repo(&self, id: &str) -> RestClientResult<()> {
        let url = self.repos_url(&[id])?;
        let response = self.send(Method::DELETE, url, None::<&()>, HeaderMap::new()).await?;
        self.expect_success(response).await
    }

    /// Start a material update. A 409 means one is already running, which is
    /// as good as a successful trigger for a caller about to poll.
    pub async fn trigger_material_update(&self, id: &str) -> RestClientResult<()> {
        let url = self.repos_url(&[id, "trigger_update"])?;
        let mut headers = HeaderMap::new();
        headers.insert(CONFIRM_HEADER, HeaderValue::from_static("true"));
        let response = self.send(Method::POST, url, None::<&()>, headers).await?;
        if response.status() == StatusCode::CONFLICT {
            debug!(repo_id = %id, "material update already in progress");
            return Ok(());
        }
        self.expect_success(response).await
    }

    pub async fn material_update_status(&self, id: &str) -> RestClientResult<UpdateStatusJson> {
        let url = self.repos_url(&[id, "status"])?;
        let response = self.send(Method::GET, url, None::<&()>, HeaderMap::new()).await?;
        let status: Versioned<UpdateStatusJson> = self.read_versioned(response).await?;
        Ok(status.value)
    }

    /// Parse outcome derived from the repo's stored parse info
    pub async fn get_last_parse_result(&self, id: &str) -> RestClientResult<ParseResultJson> {
        let url = self.repos_url(&[id])?;
        let response = self.send(Method::GET, url, None::<&()>, HeaderMap::new()).await?;
        let repo: Versioned<ConfigRepoJson> = self.read_versioned(response).await?;
        Ok(repo.value.parse_info.unwrap_or_default().parse_result())
    }

    // Private helper methods

    fn repos_url(&self, segments: &[&str]) -> RestClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RestClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(CONFIG_REPOS_PATH)
            .extend(segments);
        Ok(url)
    }

    async fn send<B: serde::Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        headers: HeaderMap,
    ) -> RestClientResult<Response> {
        debug!(%method, %url, "config repo request");
        let auth_headers = self.auth.headers().map_err(|e| RestClientError::Auth(e.to_string()))?;

        let mut request = self
            .http_client
            .request(method, url)
            .header(ACCEPT, CONFIG_REPO_MEDIA_TYPE)
            .headers(auth_headers)
            .headers(headers);

        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    async fn read_versioned<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> RestClientResult<Versioned<T>> {
        if !response.status().is_success() {
            return Err(self.error_from(response).await);
        }
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await?;
        let value = serde_json::from_str(&text)?;
        Ok(Versioned::new(value, etag))
    }

    async fn expect_success(&self, response: Response) -> RestClientResult<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.error_from(response).await)
        }
    }

    async fn error_from(&self, response: Response) -> RestClientError {
        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return RestClientError::Http(e),
        };
        match serde_json::from_str::<ApiMessageJson>(&text) {
            Ok(details) => RestClientError::ServerError { status, details },
            Err(_) => RestClientError::UnexpectedResponse { status, body: text },
        }
    }
}

fn header_value(value: &str) -> RestClientResult<HeaderValue> {
    Ok(HeaderValue::from_str(value)?)
}
