// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Validation helpers for API contract types

use crate::error::ApiContractError;
use crate::types::*;
use validator::Validate;

/// Validate a config repo body before it is sent to the server
pub fn validate_config_repo_payload(repo: &ConfigRepoJson) -> Result<(), ApiContractError> {
    repo.validate()?;
    Ok(())
}

/// Validate a single configuration entry
pub fn validate_configuration_property(
    property: &ConfigurationPropertyJson,
) -> Result<(), ApiContractError> {
    property.validate()?;
    Ok(())
}

/// Validate a material type discriminator
pub fn validate_material_type(type_name: &str) -> Result<(), ApiContractError> {
    if MATERIAL_TYPES.contains(&type_name) {
        Ok(())
    } else {
        Err(ApiContractError::InvalidMaterialType(type_name.to_string()))
    }
}
