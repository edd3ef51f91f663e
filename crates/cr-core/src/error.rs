// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use cr_client_api::ClientApiError;
use cr_domain_types::FieldErrors;
use thiserror::Error;

pub type OperationResult<T> = std::result::Result<T, OperationError>;

/// Outcome of a failed collection or tracker operation, returned as data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("not in {expected} mode")]
    WrongMode { expected: &'static str },

    /// Local checks failed; nothing was sent
    #[error("invalid config repo: {0}")]
    ClientValidation(FieldErrors),

    #[error("{message}")]
    ServerValidation { message: String, errors: FieldErrors },

    /// The local copy is older than the server's; reload before retrying
    #[error("{message}")]
    StaleCopy { message: String },

    #[error("{0}")]
    NotFound(String),

    /// Transport failures and unexpected server answers
    #[error("request failed: {0}")]
    Request(String),

    #[error("a material update is already running for this config repo")]
    TrackerBusy,

    #[error("revision tracker has been stopped")]
    TrackerStopped,
}

impl OperationError {
    /// Field errors to show next to the form, from either side of the wire
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::ClientValidation(errors) | Self::ServerValidation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    pub fn is_stale_copy(&self) -> bool {
        matches!(self, Self::StaleCopy { .. })
    }
}

impl From<ClientApiError> for OperationError {
    fn from(err: ClientApiError) -> Self {
        match err {
            ClientApiError::Conflict { message } => Self::StaleCopy { message },
            ClientApiError::Validation { message, errors } => Self::ServerValidation {
                message,
                errors: FieldErrors::from_server(errors),
            },
            ClientApiError::NotFound(message) => Self::NotFound(message),
            ClientApiError::Server { status, message } => {
                Self::Request(format!("server answered {status}: {message}"))
            }
            ClientApiError::Transport(message) | ClientApiError::InvalidRequest(message) => {
                Self::Request(message)
            }
        }
    }
}
