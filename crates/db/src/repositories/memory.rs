use std::collections::HashMap;

use tokio::sync::RwLock;

use talentscout_core::domain::candidate::CandidateRecord;
use talentscout_core::domain::session::SessionId;
use talentscout_core::handoff::{DataHandler, PersistenceError};

/// Keeps handed-off records in process memory, keyed by session id.
#[derive(Default)]
pub struct InMemoryDataHandler {
    records: RwLock<HashMap<String, CandidateRecord>>,
}

impl InMemoryDataHandler {
    pub async fn get(&self, session_id: &SessionId) -> Option<CandidateRecord> {
        self.records.read().await.get(session_id.as_str()).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl DataHandler for InMemoryDataHandler {
    async fn persist(
        &self,
        session_id: &SessionId,
        record: &CandidateRecord,
    ) -> Result<(), PersistenceError> {
        let mut records = self.records.write().await;
        records.insert(session_id.as_str().to_owned(), record.clone());
        Ok(())
    }
}
