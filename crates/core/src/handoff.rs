use async_trait::async_trait;
use thiserror::Error;

use crate::domain::candidate::CandidateRecord;
use crate::domain::session::SessionId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("record could not be encoded: {0}")]
    Encoding(String),
    #[error("record could not be encrypted: {0}")]
    Encryption(String),
}

/// Receives the finished record once, when a session closes. Hashing,
/// encryption, and retention are the handler's business.
#[async_trait]
pub trait DataHandler: Send + Sync {
    async fn persist(
        &self,
        session_id: &SessionId,
        record: &CandidateRecord,
    ) -> Result<(), PersistenceError>;
}

/// Drops records on the floor. Used when persistence is switched off.
#[derive(Clone, Debug, Default)]
pub struct DiscardingDataHandler;

#[async_trait]
impl DataHandler for DiscardingDataHandler {
    async fn persist(
        &self,
        session_id: &SessionId,
        _record: &CandidateRecord,
    ) -> Result<(), PersistenceError> {
        tracing::debug!(
            event_name = "handoff.discarded",
            session_id = %session_id,
            "persistence disabled; record discarded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DataHandler, DiscardingDataHandler};
    use crate::domain::candidate::CandidateRecord;
    use crate::domain::session::SessionId;

    #[tokio::test]
    async fn discarding_handler_always_succeeds() {
        let handler = DiscardingDataHandler;
        let result = handler.persist(&SessionId::new(), &CandidateRecord::default()).await;
        assert!(result.is_ok());
    }
}
