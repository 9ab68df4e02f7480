use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::candidate::{CandidateRecord, ConversationEntry, Speaker};
use crate::domain::question::QuestionSet;
use crate::errors::DomainError;
use crate::flows::Phase;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One conversation: a phase plus the record being filled in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    phase: Phase,
    record: CandidateRecord,
    questions: Option<QuestionSet>,
    pending_technologies: Vec<String>,
    turns: u64,
    started_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(initial_phase: Phase) -> Self {
        Self::with_id(SessionId::new(), initial_phase)
    }

    pub fn with_id(id: SessionId, initial_phase: Phase) -> Self {
        Self {
            id,
            phase: initial_phase,
            record: CandidateRecord::default(),
            questions: None,
            pending_technologies: Vec::new(),
            turns: 0,
            started_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn record(&self) -> &CandidateRecord {
        &self.record
    }

    pub fn questions(&self) -> Option<&QuestionSet> {
        self.questions.as_ref()
    }

    pub fn question_count(&self) -> usize {
        self.questions.as_ref().map_or(0, QuestionSet::len)
    }

    /// Technology tokens the candidate still has to re-enter.
    pub fn pending_technologies(&self) -> &[String] {
        &self.pending_technologies
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn is_closed(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn begin_turn(&mut self) -> Result<u64, DomainError> {
        self.ensure_open()?;
        self.turns += 1;
        Ok(self.turns)
    }

    pub fn replace_record(&mut self, record: CandidateRecord) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.record = record;
        Ok(())
    }

    /// Appends one message to the record's transcript. A closed session keeps
    /// the transcript it was handed off with.
    pub fn note_message(&mut self, speaker: Speaker, content: &str) {
        if self.is_closed() {
            return;
        }
        self.record.conversation.push(ConversationEntry {
            speaker,
            content: content.to_owned(),
            sent_at: Utc::now(),
        });
    }

    /// Starts collection over: fresh record, no questions, nothing pending.
    /// The transcript is kept.
    pub fn reset_record(&mut self) -> Result<(), DomainError> {
        self.ensure_open()?;
        let conversation = std::mem::take(&mut self.record.conversation);
        self.record = CandidateRecord { conversation, ..CandidateRecord::default() };
        self.questions = None;
        self.pending_technologies.clear();
        Ok(())
    }

    pub fn set_pending_technologies(&mut self, tokens: Vec<String>) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.pending_technologies = tokens;
        Ok(())
    }

    pub fn install_questions(&mut self, questions: QuestionSet) -> Result<(), DomainError> {
        self.ensure_open()?;
        if self.questions.is_some() {
            return Err(DomainError::InvariantViolation(
                "question set already generated for this session".to_owned(),
            ));
        }
        self.questions = Some(questions);
        Ok(())
    }

    pub fn enter_phase(&mut self, phase: Phase) -> Result<(), DomainError> {
        self.ensure_open()?;
        if phase.is_terminal() {
            self.closed_at = Some(Utc::now());
        }
        self.phase = phase;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.is_closed() {
            return Err(DomainError::RecordFrozen { session_id: self.id.clone() });
        }
        Ok(())
    }
}
