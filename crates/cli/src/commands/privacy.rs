use chrono::Utc;
use clap::Subcommand;
use talentscout_core::config::{AppConfig, LoadOptions};
use talentscout_core::domain::session::SessionId;
use talentscout_db::SqlCandidateRepository;

use crate::bootstrap::open_repository;
use crate::commands::{command_runtime, CommandResult};

const COMMAND: &str = "privacy";

#[derive(Clone, Debug, Subcommand)]
pub enum PrivacyCommand {
    #[command(about = "Summarise stored records, compliance flags, and recent data activity")]
    Report,
    #[command(about = "Delete records older than the retention window")]
    Cleanup {
        #[arg(long, help = "Retention window in days (defaults to privacy.data_retention_days)")]
        days: Option<u32>,
    },
    #[command(about = "Export one candidate's data as a portability document")]
    Export { session_id: String },
    #[command(about = "Erase one candidate's record")]
    Delete {
        session_id: String,
        #[arg(long, default_value = "user_request")]
        reason: String,
    },
}

pub fn run(command: PrivacyCommand) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match command_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let repository = match open_repository(&config).await {
            Ok(repository) => repository,
            Err(error) => return CommandResult::from_bootstrap(COMMAND, &error),
        };
        execute(&repository, &config, command).await
    })
}

pub async fn execute(
    repository: &SqlCandidateRepository,
    config: &AppConfig,
    command: PrivacyCommand,
) -> CommandResult {
    let now = Utc::now();
    match command {
        PrivacyCommand::Report => match repository.privacy_report(now).await {
            Ok(report) => CommandResult::document(
                COMMAND,
                format!("{} stored record(s)", report.data_summary.total_records),
                &report,
            ),
            Err(error) => repository_failure(error),
        },
        PrivacyCommand::Cleanup { days } => {
            let retention_days = days.unwrap_or(config.privacy.data_retention_days);
            match repository.cleanup_expired(retention_days, now).await {
                Ok(removed) => CommandResult::success(
                    COMMAND,
                    format!("removed {removed} record(s) older than {retention_days} day(s)"),
                ),
                Err(error) => repository_failure(error),
            }
        }
        PrivacyCommand::Export { session_id } => {
            let session_id = SessionId(session_id);
            match repository.export(&session_id, now).await {
                Ok(Some(export)) => CommandResult::document(
                    COMMAND,
                    format!("exported record for session {session_id}"),
                    &export,
                ),
                Ok(None) => not_found(&session_id),
                Err(error) => repository_failure(error),
            }
        }
        PrivacyCommand::Delete { session_id, reason } => {
            let session_id = SessionId(session_id);
            match repository.delete(&session_id, &reason).await {
                Ok(true) => CommandResult::success(
                    COMMAND,
                    format!("deleted record for session {session_id}"),
                ),
                Ok(false) => not_found(&session_id),
                Err(error) => repository_failure(error),
            }
        }
    }
}

fn not_found(session_id: &SessionId) -> CommandResult {
    CommandResult::failure(COMMAND, "not_found", format!("no record for session {session_id}"), 8)
}

fn repository_failure(error: talentscout_db::RepositoryError) -> CommandResult {
    CommandResult::failure(COMMAND, "repository", error.to_string(), 10)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use talentscout_core::config::AppConfig;
    use talentscout_core::domain::candidate::CandidateRecord;
    use talentscout_core::domain::session::SessionId;
    use talentscout_db::migrations::run_pending;
    use talentscout_db::{connect_with_settings, RecordVault, SqlCandidateRepository};

    use super::{execute, PrivacyCommand};

    async fn repository() -> SqlCandidateRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        SqlCandidateRepository::new(pool, RecordVault::ephemeral(), 30)
    }

    fn payload(output: &str) -> Value {
        serde_json::from_str(output).expect("command output should be valid JSON")
    }

    #[tokio::test]
    async fn export_then_delete_then_not_found() {
        let repository = repository().await;
        let config = AppConfig::default();
        let record = CandidateRecord { name: Some("Ada Lovelace".to_owned()), ..Default::default() };
        repository
            .save(&SessionId::from("s-1"), &record, chrono::Utc::now())
            .await
            .expect("save");

        let export =
            execute(&repository, &config, PrivacyCommand::Export { session_id: "s-1".to_owned() })
                .await;
        assert_eq!(export.exit_code, 0);
        let export = payload(&export.output);
        assert_eq!(export["data"]["personal_information"]["name"], "Ada Lovelace");

        let delete = execute(
            &repository,
            &config,
            PrivacyCommand::Delete { session_id: "s-1".to_owned(), reason: "user_request".to_owned() },
        )
        .await;
        assert_eq!(delete.exit_code, 0);

        let missing =
            execute(&repository, &config, PrivacyCommand::Export { session_id: "s-1".to_owned() })
                .await;
        assert_eq!(missing.exit_code, 8);
        assert_eq!(payload(&missing.output)["error_class"], "not_found");
    }

    #[tokio::test]
    async fn report_lists_recent_activity() {
        let repository = repository().await;
        repository
            .save(&SessionId::from("s-2"), &CandidateRecord::default(), chrono::Utc::now())
            .await
            .expect("save");

        let result = execute(&repository, &AppConfig::default(), PrivacyCommand::Report).await;
        let report = payload(&result.output);
        assert_eq!(report["data"]["data_summary"]["total_records"], 1);
        assert_eq!(report["data"]["recent_activities"][0]["activity"], "SAVE");
        assert_eq!(report["data"]["compliance_status"]["encryption_enabled"], true);
    }
}
