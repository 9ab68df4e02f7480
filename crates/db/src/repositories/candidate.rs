use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use talentscout_core::domain::candidate::{
    AnsweredQuestion, CandidateRecord, CompletionStatus, ConversationEntry,
};
use talentscout_core::domain::session::SessionId;
use talentscout_core::handoff::{DataHandler, PersistenceError};

use super::RepositoryError;
use crate::vault::{hash_email, hash_phone, RecordVault};
use crate::DbPool;

pub const DATA_VERSION: &str = "1.0";
/// The activity log keeps only this many newest rows.
pub const ACTIVITY_LOG_CAPACITY: i64 = 1000;
const RECENT_ACTIVITY_IN_REPORT: i64 = 10;
const DATA_CONTROLLER: &str = "TalentScout Recruitment Agency";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Save,
    Load,
    Export,
    Delete,
    AutoDelete,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Save => "SAVE",
            Self::Load => "LOAD",
            Self::Export => "EXPORT",
            Self::Delete => "DELETE",
            Self::AutoDelete => "AUTO_DELETE",
        }
    }

    fn parse(raw: &str) -> Result<Self, RepositoryError> {
        match raw {
            "SAVE" => Ok(Self::Save),
            "LOAD" => Ok(Self::Load),
            "EXPORT" => Ok(Self::Export),
            "DELETE" => Ok(Self::Delete),
            "AUTO_DELETE" => Ok(Self::AutoDelete),
            other => Err(RepositoryError::Decode(format!("unknown activity `{other}`"))),
        }
    }
}

/// One data-access log entry. Metadata never carries personal fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataActivity {
    pub occurred_at: DateTime<Utc>,
    pub activity: ActivityKind,
    pub session_id: String,
    pub metadata: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredCandidate {
    pub session_id: SessionId,
    pub stored_at: DateTime<Utc>,
    pub data_version: String,
    pub encrypted: bool,
    pub email_hash: Option<String>,
    pub phone_hash: Option<String>,
    pub completion_status: CompletionStatus,
    pub record: CandidateRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateExport {
    pub export_info: ExportInfo,
    pub personal_information: PersonalInformation,
    pub answers_summary: AnswersSummary,
    pub conversation_summary: ConversationSummary,
    pub privacy_notice: PrivacyNotice,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportInfo {
    pub exported_at: DateTime<Utc>,
    pub session_id: String,
    pub stored_at: DateTime<Utc>,
    pub data_version: String,
    pub format: &'static str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PersonalInformation {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub years_experience: Option<f64>,
    pub desired_positions: Vec<String>,
    pub tech_stack: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnswersSummary {
    pub total_answers: usize,
    pub technologies_covered: Vec<String>,
    pub completion_status: CompletionStatus,
    pub answers: Vec<AnsweredQuestion>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub total_messages: usize,
    pub messages: Vec<ConversationEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrivacyNotice {
    pub data_controller: &'static str,
    pub purpose: &'static str,
    pub retention_period: String,
    pub rights: &'static str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrivacyReport {
    pub generated_at: DateTime<Utc>,
    pub data_summary: DataSummary,
    pub compliance_status: ComplianceStatus,
    pub recent_activities: Vec<DataActivity>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_records: i64,
    pub encrypted_records: i64,
    pub oldest_record: Option<DateTime<Utc>>,
    pub newest_record: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComplianceStatus {
    pub encryption_enabled: bool,
    pub retention_policy_active: bool,
    pub retention_days: u32,
    pub audit_logging_enabled: bool,
}

/// SQLite-backed candidate store. Personal fields, answers, and the transcript
/// go through the vault; hashes, experience, roles, and tech stack are stored in the clear.
pub struct SqlCandidateRepository {
    pool: DbPool,
    vault: RecordVault,
    retention_days: u32,
}

impl SqlCandidateRepository {
    pub fn new(pool: DbPool, vault: RecordVault, retention_days: u32) -> Self {
        Self { pool, vault, retention_days }
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Inserts or replaces the row for `session_id`.
    pub async fn save(
        &self,
        session_id: &SessionId,
        record: &CandidateRecord,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let seal = |value: &Option<String>| -> Result<Option<String>, RepositoryError> {
            value.as_deref().map(|value| self.vault.seal(value)).transpose().map_err(Into::into)
        };
        let name_value = seal(&record.name)?;
        let email_value = seal(&record.email)?;
        let phone_value = seal(&record.phone)?;
        let answers_json = serde_json::to_string(&record.answers)
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;
        let answers_value = self.vault.seal(&answers_json)?;
        let conversation_json = serde_json::to_string(&record.conversation)
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;
        let conversation_value = self.vault.seal(&conversation_json)?;
        let desired_roles_json = serde_json::to_string(&record.desired_roles)
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;
        let tech_stack_json = serde_json::to_string(&record.tech_stack)
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;
        let completion_status = record.completion_status();

        sqlx::query(
            "INSERT INTO candidate_record (session_id, stored_at, data_version, encrypted,
                                           name_value, email_value, phone_value, email_hash,
                                           phone_hash, years_experience, desired_roles_json,
                                           tech_stack_json, answers_value, answer_count,
                                           conversation_value, completion_status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(session_id) DO UPDATE SET
                 stored_at = excluded.stored_at,
                 data_version = excluded.data_version,
                 encrypted = excluded.encrypted,
                 name_value = excluded.name_value,
                 email_value = excluded.email_value,
                 phone_value = excluded.phone_value,
                 email_hash = excluded.email_hash,
                 phone_hash = excluded.phone_hash,
                 years_experience = excluded.years_experience,
                 desired_roles_json = excluded.desired_roles_json,
                 tech_stack_json = excluded.tech_stack_json,
                 answers_value = excluded.answers_value,
                 answer_count = excluded.answer_count,
                 conversation_value = excluded.conversation_value,
                 completion_status = excluded.completion_status",
        )
        .bind(session_id.as_str())
        .bind(timestamp(now))
        .bind(DATA_VERSION)
        .bind(self.vault.is_encrypting())
        .bind(&name_value)
        .bind(&email_value)
        .bind(&phone_value)
        .bind(record.email.as_deref().map(hash_email))
        .bind(record.phone.as_deref().map(hash_phone))
        .bind(record.years_experience)
        .bind(&desired_roles_json)
        .bind(&tech_stack_json)
        .bind(&answers_value)
        .bind(i64::try_from(record.answers.len()).unwrap_or(i64::MAX))
        .bind(&conversation_value)
        .bind(completion_status.as_str())
        .execute(&self.pool)
        .await?;

        self.log_activity(
            ActivityKind::Save,
            session_id.as_str(),
            serde_json::json!({
                "encrypted": self.vault.is_encrypting(),
                "completion_status": completion_status.as_str(),
                "has_personal_info": record.name.is_some(),
                "has_contact_info": record.email.is_some(),
                "tech_stack_count": record.tech_stack.len(),
                "message_count": record.conversation.len(),
            }),
            now,
        )
        .await?;

        tracing::info!(
            event_name = "candidate.saved",
            session_id = %session_id,
            completion_status = completion_status.as_str(),
            encrypted = self.vault.is_encrypting(),
            "candidate record stored"
        );
        Ok(())
    }

    pub async fn load(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<StoredCandidate>, RepositoryError> {
        let stored = self.fetch(session_id).await?;
        if stored.is_some() {
            self.log_activity(
                ActivityKind::Load,
                session_id.as_str(),
                serde_json::json!({}),
                Utc::now(),
            )
            .await?;
        }
        Ok(stored)
    }

    /// Data-portability document for one candidate.
    pub async fn export(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<CandidateExport>, RepositoryError> {
        let Some(stored) = self.fetch(session_id).await? else {
            return Ok(None);
        };
        let record = stored.record;
        let technologies_covered =
            record.answered_technologies().into_iter().map(str::to_owned).collect();

        let export = CandidateExport {
            export_info: ExportInfo {
                exported_at: now,
                session_id: stored.session_id.0.clone(),
                stored_at: stored.stored_at,
                data_version: stored.data_version,
                format: "json",
            },
            answers_summary: AnswersSummary {
                total_answers: record.answers.len(),
                technologies_covered,
                completion_status: stored.completion_status,
                answers: record.answers.clone(),
            },
            conversation_summary: ConversationSummary {
                total_messages: record.conversation.len(),
                messages: record.conversation.clone(),
            },
            personal_information: PersonalInformation {
                name: record.name,
                email: record.email,
                phone: record.phone,
                years_experience: record.years_experience,
                desired_positions: record.desired_roles,
                tech_stack: record.tech_stack,
            },
            privacy_notice: PrivacyNotice {
                data_controller: DATA_CONTROLLER,
                purpose: "Initial candidate screening and recruitment",
                retention_period: format!("{} days from collection", self.retention_days),
                rights: "You have the right to access, rectify, erase, and port your data",
            },
        };

        self.log_activity(
            ActivityKind::Export,
            session_id.as_str(),
            serde_json::json!({ "format": "json" }),
            now,
        )
        .await?;
        Ok(Some(export))
    }

    /// Right to erasure. Returns whether a row existed.
    pub async fn delete(
        &self,
        session_id: &SessionId,
        reason: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM candidate_record WHERE session_id = ?")
            .bind(session_id.as_str())
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            self.log_activity(
                ActivityKind::Delete,
                session_id.as_str(),
                serde_json::json!({ "reason": reason }),
                Utc::now(),
            )
            .await?;
            tracing::info!(
                event_name = "candidate.deleted",
                session_id = %session_id,
                reason,
                "candidate record deleted"
            );
        }
        Ok(deleted)
    }

    /// Deletes records stored more than `retention_days` before `now`.
    pub async fn cleanup_expired(
        &self,
        retention_days: u32,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let cutoff = now - Duration::days(i64::from(retention_days));
        let rows = sqlx::query(
            "SELECT session_id, stored_at FROM candidate_record WHERE stored_at < ? ORDER BY stored_at",
        )
        .bind(timestamp(cutoff))
        .fetch_all(&self.pool)
        .await?;

        let mut removed = 0;
        for row in rows {
            let session_id: String =
                row.try_get("session_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let stored_at = parse_timestamp(
                &row.try_get::<String, _>("stored_at")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            )?;

            let result = sqlx::query("DELETE FROM candidate_record WHERE session_id = ?")
                .bind(&session_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                continue;
            }
            removed += 1;
            self.log_activity(
                ActivityKind::AutoDelete,
                &session_id,
                serde_json::json!({
                    "reason": "retention_policy",
                    "retention_days": retention_days,
                    "record_age_days": (now - stored_at).num_days(),
                }),
                now,
            )
            .await?;
        }

        tracing::info!(
            event_name = "candidate.retention_cleanup",
            retention_days,
            removed,
            "expired candidate records removed"
        );
        Ok(removed)
    }

    pub async fn privacy_report(&self, now: DateTime<Utc>) -> Result<PrivacyReport, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COALESCE(SUM(encrypted), 0) AS encrypted,
                    MIN(stored_at) AS oldest,
                    MAX(stored_at) AS newest
             FROM candidate_record",
        )
        .fetch_one(&self.pool)
        .await?;

        let total_records: i64 =
            row.try_get("total").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let encrypted_records: i64 =
            row.try_get("encrypted").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let oldest: Option<String> =
            row.try_get("oldest").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let newest: Option<String> =
            row.try_get("newest").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        Ok(PrivacyReport {
            generated_at: now,
            data_summary: DataSummary {
                total_records,
                encrypted_records,
                oldest_record: oldest.as_deref().map(parse_timestamp).transpose()?,
                newest_record: newest.as_deref().map(parse_timestamp).transpose()?,
            },
            compliance_status: ComplianceStatus {
                encryption_enabled: self.vault.is_encrypting(),
                retention_policy_active: self.retention_days > 0,
                retention_days: self.retention_days,
                audit_logging_enabled: true,
            },
            recent_activities: self.recent_activity(RECENT_ACTIVITY_IN_REPORT).await?,
        })
    }

    /// Newest first.
    pub async fn recent_activity(&self, limit: i64) -> Result<Vec<DataActivity>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT occurred_at, activity, session_id, metadata_json
             FROM data_activity ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_activity).collect()
    }

    async fn fetch(&self, session_id: &SessionId) -> Result<Option<StoredCandidate>, RepositoryError> {
        let row = sqlx::query(
            "SELECT session_id, stored_at, data_version, encrypted, name_value, email_value,
                    phone_value, email_hash, phone_hash, years_experience, desired_roles_json,
                    tech_stack_json, answers_value, conversation_value, completion_status
             FROM candidate_record WHERE session_id = ?",
        )
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(self.row_to_candidate(row)?)),
            None => Ok(None),
        }
    }

    fn row_to_candidate(&self, row: &sqlx::sqlite::SqliteRow) -> Result<StoredCandidate, RepositoryError> {
        let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
        let session_id: String = row.try_get("session_id").map_err(decode)?;
        let stored_at: String = row.try_get("stored_at").map_err(decode)?;
        let data_version: String = row.try_get("data_version").map_err(decode)?;
        let encrypted: bool = row.try_get("encrypted").map_err(decode)?;
        let name_value: Option<String> = row.try_get("name_value").map_err(decode)?;
        let email_value: Option<String> = row.try_get("email_value").map_err(decode)?;
        let phone_value: Option<String> = row.try_get("phone_value").map_err(decode)?;
        let email_hash: Option<String> = row.try_get("email_hash").map_err(decode)?;
        let phone_hash: Option<String> = row.try_get("phone_hash").map_err(decode)?;
        let years_experience: Option<f64> = row.try_get("years_experience").map_err(decode)?;
        let desired_roles_json: String = row.try_get("desired_roles_json").map_err(decode)?;
        let tech_stack_json: String = row.try_get("tech_stack_json").map_err(decode)?;
        let answers_value: String = row.try_get("answers_value").map_err(decode)?;
        let conversation_value: Option<String> =
            row.try_get("conversation_value").map_err(decode)?;
        let completion_status: String = row.try_get("completion_status").map_err(decode)?;

        let open = |value: Option<String>| -> Result<Option<String>, RepositoryError> {
            value.map(|value| self.vault.open(&value, encrypted)).transpose().map_err(Into::into)
        };
        let answers_json = self.vault.open(&answers_value, encrypted)?;
        let answers: Vec<AnsweredQuestion> = serde_json::from_str(&answers_json)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let conversation: Vec<ConversationEntry> = match open(conversation_value)? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|error| RepositoryError::Decode(error.to_string()))?,
            None => Vec::new(),
        };

        Ok(StoredCandidate {
            session_id: SessionId(session_id),
            stored_at: parse_timestamp(&stored_at)?,
            data_version,
            encrypted,
            email_hash,
            phone_hash,
            completion_status: parse_completion_status(&completion_status)?,
            record: CandidateRecord {
                name: open(name_value)?,
                email: open(email_value)?,
                phone: open(phone_value)?,
                years_experience,
                desired_roles: decode_json(&desired_roles_json)?,
                tech_stack: decode_json(&tech_stack_json)?,
                answers,
                conversation,
            },
        })
    }

    async fn log_activity(
        &self,
        activity: ActivityKind,
        session_id: &str,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO data_activity (occurred_at, activity, session_id, metadata_json)
             VALUES (?, ?, ?, ?)",
        )
        .bind(timestamp(now))
        .bind(activity.as_str())
        .bind(session_id)
        .bind(metadata.to_string())
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "DELETE FROM data_activity
             WHERE id NOT IN (SELECT id FROM data_activity ORDER BY id DESC LIMIT ?)",
        )
        .bind(ACTIVITY_LOG_CAPACITY)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DataHandler for SqlCandidateRepository {
    async fn persist(
        &self,
        session_id: &SessionId,
        record: &CandidateRecord,
    ) -> Result<(), PersistenceError> {
        self.save(session_id, record, Utc::now()).await.map_err(PersistenceError::from)
    }
}

fn row_to_activity(row: &sqlx::sqlite::SqliteRow) -> Result<DataActivity, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
    let occurred_at: String = row.try_get("occurred_at").map_err(decode)?;
    let activity: String = row.try_get("activity").map_err(decode)?;
    let session_id: String = row.try_get("session_id").map_err(decode)?;
    let metadata_json: String = row.try_get("metadata_json").map_err(decode)?;

    Ok(DataActivity {
        occurred_at: parse_timestamp(&occurred_at)?,
        activity: ActivityKind::parse(&activity)?,
        session_id,
        metadata: decode_json(&metadata_json)?,
    })
}

/// Fixed-width UTC timestamps so stored values compare correctly as text.
fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("bad timestamp `{raw}`: {error}")))
}

fn parse_completion_status(raw: &str) -> Result<CompletionStatus, RepositoryError> {
    match raw {
        "complete" => Ok(CompletionStatus::Complete),
        "incomplete" => Ok(CompletionStatus::Incomplete),
        other => Err(RepositoryError::Decode(format!("unknown completion status `{other}`"))),
    }
}

fn decode_json<T>(raw: &str) -> Result<T, RepositoryError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(raw).map_err(|error| RepositoryError::Decode(error.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use sqlx::Row;

    use talentscout_core::domain::candidate::{
        AnsweredQuestion, CandidateRecord, CompletionStatus, ConversationEntry, Speaker,
    };
    use talentscout_core::domain::session::SessionId;
    use talentscout_core::handoff::DataHandler;

    use super::{ActivityKind, SqlCandidateRepository, ACTIVITY_LOG_CAPACITY};
    use crate::vault::{hash_email, RecordVault};
    use crate::{connect_with_settings, migrations::run_pending, DbPool};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_record() -> CandidateRecord {
        CandidateRecord {
            name: Some("Ada Lovelace".to_owned()),
            email: Some("ada@example.com".to_owned()),
            phone: Some("15551234567".to_owned()),
            years_experience: Some(3.0),
            desired_roles: vec!["Backend Engineer".to_owned()],
            tech_stack: vec!["python".to_owned()],
            answers: vec![AnsweredQuestion {
                technology: "python".to_owned(),
                question: "What is a generator?".to_owned(),
                answer: "A lazy iterator.".to_owned(),
            }],
            conversation: vec![
                ConversationEntry {
                    speaker: Speaker::Assistant,
                    content: "What is your full name?".to_owned(),
                    sent_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
                },
                ConversationEntry {
                    speaker: Speaker::Candidate,
                    content: "Ada Lovelace".to_owned(),
                    sent_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 12).unwrap(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn encrypted_save_and_load_round_trip() {
        let pool = setup().await;
        let repo = SqlCandidateRepository::new(pool.clone(), RecordVault::ephemeral(), 30);
        let session_id = SessionId::from("session-1");

        repo.save(&session_id, &sample_record(), Utc::now()).await.expect("save");

        let row = sqlx::query("SELECT name_value, email_hash, conversation_value FROM candidate_record")
            .fetch_one(&pool)
            .await
            .expect("raw row");
        let stored_name: String = row.get("name_value");
        assert!(!stored_name.contains("Ada"));
        let stored_conversation: String = row.get("conversation_value");
        assert!(!stored_conversation.contains("Ada"));
        assert_eq!(row.get::<String, _>("email_hash"), hash_email("ada@example.com"));

        let loaded = repo.load(&session_id).await.expect("load").expect("stored");
        assert!(loaded.encrypted);
        assert_eq!(loaded.record, sample_record());
        assert_eq!(loaded.completion_status, CompletionStatus::Complete);
    }

    #[tokio::test]
    async fn persisting_twice_replaces_the_row() {
        let pool = setup().await;
        let repo = SqlCandidateRepository::new(pool.clone(), RecordVault::plaintext(), 30);
        let session_id = SessionId::from("session-2");

        repo.persist(&session_id, &CandidateRecord::default()).await.expect("first");
        repo.persist(&session_id, &sample_record()).await.expect("second");

        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM candidate_record")
            .fetch_one(&pool)
            .await
            .expect("count")
            .get("count");
        assert_eq!(count, 1);
        let loaded = repo.load(&session_id).await.expect("load").expect("stored");
        assert!(!loaded.encrypted);
        assert_eq!(loaded.record.name.as_deref(), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn export_carries_privacy_notice_and_answers() {
        let repo = SqlCandidateRepository::new(setup().await, RecordVault::ephemeral(), 45);
        let session_id = SessionId::from("session-3");
        repo.save(&session_id, &sample_record(), Utc::now()).await.expect("save");

        let export = repo.export(&session_id, Utc::now()).await.expect("export").expect("exists");
        assert_eq!(export.personal_information.email.as_deref(), Some("ada@example.com"));
        assert_eq!(export.answers_summary.total_answers, 1);
        assert_eq!(export.answers_summary.technologies_covered, vec!["python"]);
        assert_eq!(export.conversation_summary.total_messages, 2);
        assert_eq!(export.conversation_summary.messages[1].content, "Ada Lovelace");
        assert_eq!(export.privacy_notice.retention_period, "45 days from collection");

        let activities = repo.recent_activity(5).await.expect("activity");
        assert_eq!(activities[0].activity, ActivityKind::Export);
        assert!(repo.export(&SessionId::from("missing"), Utc::now()).await.expect("export").is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_record_existed() {
        let repo = SqlCandidateRepository::new(setup().await, RecordVault::plaintext(), 30);
        let session_id = SessionId::from("session-4");
        repo.save(&session_id, &sample_record(), Utc::now()).await.expect("save");

        assert!(repo.delete(&session_id, "user_request").await.expect("delete"));
        assert!(!repo.delete(&session_id, "user_request").await.expect("delete again"));
        assert!(repo.load(&session_id).await.expect("load").is_none());

        let activities = repo.recent_activity(1).await.expect("activity");
        assert_eq!(activities[0].activity, ActivityKind::Delete);
        assert_eq!(activities[0].metadata["reason"], "user_request");
    }

    #[tokio::test]
    async fn cleanup_removes_only_expired_records() {
        let repo = SqlCandidateRepository::new(setup().await, RecordVault::plaintext(), 30);
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("timestamp");

        repo.save(&SessionId::from("old"), &sample_record(), now - Duration::days(40))
            .await
            .expect("save old");
        repo.save(&SessionId::from("fresh"), &sample_record(), now - Duration::days(2))
            .await
            .expect("save fresh");

        assert_eq!(repo.cleanup_expired(30, now).await.expect("cleanup"), 1);
        assert!(repo.load(&SessionId::from("old")).await.expect("load").is_none());
        assert!(repo.load(&SessionId::from("fresh")).await.expect("load").is_some());

        let auto_deleted: Vec<_> = repo
            .recent_activity(20)
            .await
            .expect("activity")
            .into_iter()
            .filter(|activity| activity.activity == ActivityKind::AutoDelete)
            .collect();
        assert_eq!(auto_deleted.len(), 1);
        assert_eq!(auto_deleted[0].session_id, "old");
        assert_eq!(auto_deleted[0].metadata["record_age_days"], 40);
    }

    #[tokio::test]
    async fn privacy_report_summarises_store() {
        let repo = SqlCandidateRepository::new(setup().await, RecordVault::ephemeral(), 30);
        let early = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).single().expect("timestamp");
        let late = early + Duration::days(3);
        repo.save(&SessionId::from("a"), &sample_record(), early).await.expect("save a");
        repo.save(&SessionId::from("b"), &CandidateRecord::default(), late).await.expect("save b");

        let report = repo.privacy_report(late).await.expect("report");
        assert_eq!(report.data_summary.total_records, 2);
        assert_eq!(report.data_summary.encrypted_records, 2);
        assert_eq!(report.data_summary.oldest_record, Some(early));
        assert_eq!(report.data_summary.newest_record, Some(late));
        assert!(report.compliance_status.encryption_enabled);
        assert_eq!(report.recent_activities.len(), 2);
    }

    #[tokio::test]
    async fn activity_log_is_capped() {
        let pool = setup().await;
        let repo = SqlCandidateRepository::new(pool.clone(), RecordVault::plaintext(), 30);
        let session_id = SessionId::from("busy");
        repo.save(&session_id, &CandidateRecord::default(), Utc::now()).await.expect("save");
        for _ in 0..ACTIVITY_LOG_CAPACITY {
            repo.load(&session_id).await.expect("load");
        }

        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM data_activity")
            .fetch_one(&pool)
            .await
            .expect("count")
            .get("count");
        assert_eq!(count, ACTIVITY_LOG_CAPACITY);
        let oldest_kept: String =
            sqlx::query("SELECT activity FROM data_activity ORDER BY id ASC LIMIT 1")
                .fetch_one(&pool)
                .await
                .expect("oldest")
                .get("activity");
        assert_eq!(oldest_kept, "LOAD");
    }
}
