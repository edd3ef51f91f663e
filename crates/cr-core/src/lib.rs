// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Client-side state for the config repositories page.
//!
//! [`RepositoryCollection`] owns the loaded records and the single add/edit
//! [`Mode`]; each record can get a [`RevisionTracker`] that triggers a
//! material update on the server and polls until the parse job finishes.

pub mod collection;
pub mod error;
pub mod record;
pub mod revision_tracker;

pub use collection::{Mode, RepositoryCollection};
pub use error::{OperationError, OperationResult};
pub use record::RecordHandle;
pub use revision_tracker::{DEFAULT_POLL_INTERVAL, RevisionTracker, TrackerState};
