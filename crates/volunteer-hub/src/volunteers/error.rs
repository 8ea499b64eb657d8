use serde::Serialize;

use super::opportunity::LookupError;
use super::repository::RepositoryError;
use super::resumes::ResumeStoreError;

/// Structured validation failure for one request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Error raised by the volunteer service and lifecycle engine.
///
/// `Internal` keeps the collaborator detail for logging only; its `Display`
/// output stays generic.
#[derive(Debug, thiserror::Error)]
pub enum VolunteerError {
    #[error("not authorized")]
    Unauthorized,
    #[error("invalid volunteer attributes")]
    Validation(Vec<FieldError>),
    #[error("volunteer not found")]
    NotFound,
    #[error("volunteer was modified concurrently; retry with fresh data")]
    Conflict,
    #[error("task {task_state:?} is not accepting placements")]
    TaskNotActive { task_state: String },
    #[error("internal error")]
    Internal(String),
}

impl From<RepositoryError> for VolunteerError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => Self::Conflict,
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Unavailable(detail) => Self::Internal(detail),
        }
    }
}

impl From<LookupError> for VolunteerError {
    fn from(value: LookupError) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<ResumeStoreError> for VolunteerError {
    fn from(value: ResumeStoreError) -> Self {
        Self::Internal(value.to_string())
    }
}
