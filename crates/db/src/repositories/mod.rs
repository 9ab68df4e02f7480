use talentscout_core::handoff::PersistenceError;
use thiserror::Error;

use crate::vault::VaultError;

pub mod candidate;
pub mod memory;

pub use candidate::{
    ActivityKind, CandidateExport, DataActivity, PrivacyReport, SqlCandidateRepository,
    StoredCandidate, ACTIVITY_LOG_CAPACITY,
};
pub use memory::InMemoryDataHandler;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl From<RepositoryError> for PersistenceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(error) => Self::Unavailable(error.to_string()),
            RepositoryError::Decode(message) | RepositoryError::Encode(message) => {
                Self::Encoding(message)
            }
            RepositoryError::Vault(error) => Self::Encryption(error.to_string()),
        }
    }
}
