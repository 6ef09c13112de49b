//! JSON payloads exchanged with the sandbox backend.

use serde::{Deserialize, Serialize};

use crate::domain::model::{Dir, ErrorCoordinate, Variable};

/// Body of `GET /sandbox/sources`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesPayload {
    #[serde(default)]
    pub dirs: Vec<Dir>,
}

/// Body of `PUT /sandbox/sources`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub dirs: Vec<Dir>,
    pub update_builds: bool,
}

/// Body of `POST /sandbox/sources/build`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub content: String,
    pub vars: Vec<Variable>,
}

/// Response of a build-check. A missing or empty `errors` list means success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<WireBuildError>>,
}

impl BuildResponse {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn with_errors(errors: Vec<WireBuildError>) -> Self {
        Self {
            errors: Some(errors),
        }
    }

    pub fn into_errors(self) -> Vec<WireBuildError> {
        self.errors.unwrap_or_default()
    }
}

/// Diagnostic as reported by the validator. Coordinates may be omitted, in which case
/// they are derived from the offsets and the checked text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBuildError {
    pub start_offset: usize,
    pub end_offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_coordinates: Option<ErrorCoordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_coordinates: Option<ErrorCoordinate>,
    pub message: String,
}
