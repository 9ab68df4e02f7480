use thiserror::Error;

use crate::{
    domain::session::SessionId, flows::Field, flows::FlowTransitionError,
    validators::ValidationFailure,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("session {session_id} is closed and its record is frozen")]
    RecordFrozen { session_id: SessionId },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Problems a single conversation can run into. None of them ends the process.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("{field} rejected: {failure}")]
    ValidationFailure { field: Field, failure: ValidationFailure },
    #[error("unresolved technologies: {}", tokens.join(", "))]
    UnresolvedTechnology { tokens: Vec<String> },
    #[error("llm completion timed out after {timeout_secs}s")]
    LlmTimeout { timeout_secs: u64 },
    #[error("llm output unusable: {reason}")]
    LlmMalformedOutput { reason: String },
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl IntakeError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationFailure { .. } => "validation_failure",
            Self::UnresolvedTechnology { .. } => "unresolved_technology",
            Self::LlmTimeout { .. } => "llm_timeout",
            Self::LlmMalformedOutput { .. } => "llm_malformed_output",
            Self::PersistenceFailure(_) => "persistence_failure",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ValidationFailure { .. } | Self::UnresolvedTechnology { .. } => {
                "That answer could not be used. Please try again."
            }
            Self::LlmTimeout { .. } | Self::LlmMalformedOutput { .. } => {
                "Tailored questions were unavailable, so standard questions were used."
            }
            Self::PersistenceFailure(_) => {
                "We're sorry, something went wrong while saving your information. \
                 Our recruitment team has been notified."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{DomainError, IntakeError};
    use crate::flows::{Field, FlowEvent, FlowTransitionError, Phase};
    use crate::validators::ValidationFailure;

    #[test]
    fn flow_errors_convert_into_domain_errors() {
        let error = DomainError::from(FlowTransitionError::InvalidTransition {
            state: Phase::Closed,
            event: FlowEvent::Confirmed,
        });
        assert!(matches!(error, DomainError::FlowTransition(_)));
    }

    #[test]
    fn validation_failure_names_field_and_reason() {
        let error = IntakeError::ValidationFailure {
            field: Field::Email,
            failure: ValidationFailure::InvalidEmailFormat,
        };
        assert_eq!(error.kind(), "validation_failure");
        assert!(error.to_string().starts_with("email rejected"));
    }

    #[test]
    fn persistence_failure_has_user_safe_message() {
        let error = IntakeError::PersistenceFailure("database is locked".to_owned());
        assert!(!error.user_message().contains("database"));
        assert_eq!(
            IntakeError::UnresolvedTechnology { tokens: vec!["cobolx".to_owned()] }.to_string(),
            "unresolved technologies: cobolx"
        );
    }
}
