use thiserror::Error;

use crate::common::error::SchedulerError::GenericError;
use crate::common::validation::ValidationErrors;
use crate::server::allocation::AllocationConflict;
use crate::server::job::JobId;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Validation failed: {0}")]
    ValidationError(ValidationErrors),
    #[error(transparent)]
    AllocationConflict(#[from] AllocationConflict),
    #[error("Job {0} is not an array job")]
    NotAnArrayJob(JobId),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<serde_json::error::Error> for SchedulerError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::DeserializationError(e.to_string())
    }
}

impl From<toml::de::Error> for SchedulerError {
    fn from(error: toml::de::Error) -> Self {
        Self::DeserializationError(error.to_string())
    }
}

impl From<anyhow::Error> for SchedulerError {
    fn from(error: anyhow::Error) -> Self {
        Self::GenericError(error.to_string())
    }
}

impl From<ValidationErrors> for SchedulerError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationError(errors)
    }
}

pub fn error<T>(message: String) -> crate::Result<T> {
    Err(GenericError(message))
}

impl From<String> for SchedulerError {
    fn from(e: String) -> Self {
        GenericError(e)
    }
}
