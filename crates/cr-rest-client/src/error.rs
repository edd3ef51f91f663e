// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the REST client

use cr_api_contract::{ApiContractError, ApiMessageJson};
use cr_client_api::ClientApiError;
use reqwest::StatusCode;
use thiserror::Error;

pub type RestClientResult<T> = Result<T, RestClientError>;

#[derive(Debug, Error)]
pub enum RestClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid request body: {0}")]
    Contract(#[from] ApiContractError),

    #[error("Server error {status}: {}", details.message)]
    ServerError {
        status: StatusCode,
        details: ApiMessageJson,
    },

    #[error("Unexpected response {status}: {body}")]
    UnexpectedResponse { status: StatusCode, body: String },
}

impl RestClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RestClientError::ServerError { status, .. }
            | RestClientError::UnexpectedResponse { status, .. } => Some(*status),
            RestClientError::Http(e) => e.status(),
            _ => None,
        }
    }

    fn message(&self) -> String {
        match self {
            RestClientError::ServerError { details, .. } => details.message.clone(),
            RestClientError::UnexpectedResponse { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

impl From<RestClientError> for ClientApiError {
    fn from(err: RestClientError) -> Self {
        let message = err.message();
        match (&err, err.status()) {
            (RestClientError::Contract(_), _)
            | (RestClientError::Auth(_), _)
            | (RestClientError::InvalidHeader(_), _) => {
                ClientApiError::InvalidRequest(message)
            }
            (_, Some(StatusCode::PRECONDITION_FAILED)) => ClientApiError::Conflict { message },
            (_, Some(StatusCode::NOT_FOUND)) => ClientApiError::NotFound(message),
            (
                RestClientError::ServerError { details, .. },
                Some(StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST),
            ) => ClientApiError::Validation {
                message,
                errors: details.field_errors(),
            },
            (_, Some(status)) => ClientApiError::Server {
                status: status.as_u16(),
                message,
            },
            (_, None) => ClientApiError::Transport(message),
        }
    }
}
