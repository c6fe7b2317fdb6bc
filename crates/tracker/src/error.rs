//! Errors for inbound telemetry messages.

use domain::DomainError;
use thiserror::Error;

/// Why one inbound message was rejected.
///
/// Rejections are per message; the pipeline logs them and keeps reading.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown vehicle: {0}")]
    UnknownVehicle(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl PipelineError {
    /// Stable code for logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Malformed(_) => "MESSAGE_MALFORMED",
            PipelineError::Validation(_) => "MESSAGE_INVALID",
            PipelineError::UnknownVehicle(_) => "VEHICLE_NOT_FOUND",
            PipelineError::Domain(e) => e.code(),
        }
    }
}

impl From<validator::ValidationErrors> for PipelineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    let message = e.message.clone().map(|m| m.to_string()).unwrap_or_default();
                    format!("{}: {}", field, message)
                })
            })
            .collect();
        details.sort();

        let message = if details.len() == 1 {
            details.remove(0)
        } else {
            format!("{} validation errors ({})", details.len(), details.join("; "))
        };

        PipelineError::Validation(message)
    }
}
