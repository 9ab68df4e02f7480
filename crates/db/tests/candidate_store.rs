use chrono::{TimeZone, Utc};
use serde_json::Value;

use talentscout_core::config::PrivacyConfig;
use talentscout_core::domain::candidate::{
    AnsweredQuestion, CandidateRecord, ConversationEntry, Speaker,
};
use talentscout_core::domain::session::SessionId;
use talentscout_core::handoff::DataHandler;
use talentscout_db::migrations::run_pending;
use talentscout_db::{connect_with_settings, RecordVault, SqlCandidateRepository};

type StoreTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

fn require_field<'a>(value: &'a Value, field_name: &str) -> StoreTestResult<&'a Value> {
    value.get(field_name).ok_or_else(|| format!("{field_name} should be present"))
}

fn candidate() -> CandidateRecord {
    CandidateRecord {
        name: Some("Grace Hopper".to_owned()),
        email: Some("grace@example.com".to_owned()),
        phone: Some("+1 555 987 6543".to_owned()),
        years_experience: Some(12.0),
        desired_roles: vec!["Staff Engineer".to_owned(), "Tech Lead".to_owned()],
        tech_stack: vec!["rust".to_owned(), "postgresql".to_owned()],
        answers: vec![
            AnsweredQuestion {
                technology: "rust".to_owned(),
                question: "How does the borrow checker prevent data races?".to_owned(),
                answer: "Only one mutable reference at a time.".to_owned(),
            },
            AnsweredQuestion {
                technology: "postgresql".to_owned(),
                question: "When would you add a partial index?".to_owned(),
                answer: "When queries filter on a narrow predicate.".to_owned(),
            },
        ],
        conversation: vec![ConversationEntry {
            speaker: Speaker::Candidate,
            content: "You can reach me at grace@example.com".to_owned(),
            sent_at: Utc.timestamp_opt(1_767_225_600, 0).single().unwrap_or_default(),
        }],
    }
}

async fn open_repository(dir: &std::path::Path) -> StoreTestResult<SqlCandidateRepository> {
    let database_url = format!("sqlite://{}", dir.join("talentscout.db").display());
    let pool = connect_with_settings(&database_url, 2, 5).await.map_err(|e| e.to_string())?;
    run_pending(&pool).await.map_err(|e| e.to_string())?;

    let privacy = PrivacyConfig {
        encrypt_data: true,
        data_retention_days: 30,
        identity_path: dir.join("identity.key"),
    };
    let vault = RecordVault::from_config(&privacy).map_err(|e| e.to_string())?;
    Ok(SqlCandidateRepository::new(pool, vault, privacy.data_retention_days))
}

#[tokio::test]
async fn encrypted_records_survive_a_restart() -> StoreTestResult {
    let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
    let session_id = SessionId::from("restart-session");

    {
        let repository = open_repository(dir.path()).await?;
        repository.persist(&session_id, &candidate()).await.map_err(|e| e.to_string())?;
    }

    let repository = open_repository(dir.path()).await?;
    let stored = repository
        .load(&session_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "record should be stored".to_owned())?;

    require!(stored.encrypted);
    require_eq!(stored.record, candidate());
    require!(stored.email_hash.as_deref().is_some_and(|hash| hash.len() == 16));
    Ok(())
}

#[tokio::test]
async fn export_document_has_portability_sections() -> StoreTestResult {
    let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
    let repository = open_repository(dir.path()).await?;
    let session_id = SessionId::from("export-session");
    repository.save(&session_id, &candidate(), Utc::now()).await.map_err(|e| e.to_string())?;

    let export = repository
        .export(&session_id, Utc::now())
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "export should exist".to_owned())?;
    let document = serde_json::to_value(&export).map_err(|e| e.to_string())?;

    let info = require_field(&document, "export_info")?;
    require_eq!(require_field(info, "session_id")?, "export-session");
    require_eq!(require_field(info, "format")?, "json");

    let personal = require_field(&document, "personal_information")?;
    require_eq!(require_field(personal, "email")?, "grace@example.com");
    require_eq!(require_field(personal, "years_experience")?, 12.0);

    let answers = require_field(&document, "answers_summary")?;
    require_eq!(require_field(answers, "total_answers")?, 2);
    require_eq!(require_field(answers, "completion_status")?, "complete");

    let conversation = require_field(&document, "conversation_summary")?;
    require_eq!(require_field(conversation, "total_messages")?, 1);
    let first = require_field(conversation, "messages")?.get(0).cloned().unwrap_or_default();
    require_eq!(require_field(&first, "speaker")?, "candidate");

    let notice = require_field(&document, "privacy_notice")?;
    require_eq!(require_field(notice, "data_controller")?, "TalentScout Recruitment Agency");
    require_eq!(require_field(notice, "retention_period")?, "30 days from collection");
    Ok(())
}
