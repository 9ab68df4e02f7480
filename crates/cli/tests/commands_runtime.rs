use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use talentscout_cli::commands::privacy::{self, PrivacyCommand};
use talentscout_cli::commands::{migrate, smoke, taxonomy};

#[test]
fn migrate_returns_success_with_in_memory_database() {
    with_env(&[("TALENTSCOUT_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_retention() {
    with_env(
        &[
            ("TALENTSCOUT_DATABASE_URL", "sqlite::memory:"),
            ("TALENTSCOUT_DATA_RETENTION_DAYS", "0"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 2, "expected config validation failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "config_validation");
        },
    );
}

#[test]
fn smoke_runs_scripted_conversation() {
    with_env(&[("TALENTSCOUT_DATABASE_URL", "sqlite::memory:")], || {
        let result = smoke::run();
        assert_eq!(result.exit_code, 0, "expected successful smoke report: {}", result.output);

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "smoke");
        assert_eq!(payload["status"], "pass");

        let checks = payload["checks"].as_array().cloned().unwrap_or_default();
        let conversation = checks
            .iter()
            .find(|check| check["name"] == "scripted_conversation")
            .expect("scripted conversation check should be reported");
        assert_eq!(conversation["status"], "pass");
        assert!(conversation["message"]
            .as_str()
            .unwrap_or_default()
            .starts_with("15 questions generated"));
    });
}

#[test]
fn smoke_returns_failure_when_config_invalid() {
    with_env(&[("TALENTSCOUT_LLM_PROVIDER", "mystery")], || {
        let result = smoke::run();
        assert_eq!(result.exit_code, 6, "expected smoke failure code");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
    });
}

#[test]
fn taxonomy_json_groups_by_category() {
    with_env(&[], || {
        let result = taxonomy::run(true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "taxonomy");
        let groups = payload["data"].as_array().cloned().unwrap_or_default();
        assert!(groups.iter().any(|group| group["category"] == "cloud"));
    });
}

#[test]
fn privacy_report_on_fresh_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let identity = dir.path().join("identity.key");
    let identity = identity.to_str().expect("utf8 path").to_owned();

    with_env(
        &[("TALENTSCOUT_DATABASE_URL", "sqlite::memory:"), ("TALENTSCOUT_IDENTITY_PATH", &identity)],
        || {
            let result = privacy::run(PrivacyCommand::Report);
            assert_eq!(result.exit_code, 0, "expected report: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["data"]["data_summary"]["total_records"], 0);
            assert_eq!(payload["data"]["compliance_status"]["retention_days"], 30);
        },
    );
    assert!(dir.path().join("identity.key").exists());
}

#[test]
fn privacy_delete_of_unknown_session_is_not_found() {
    with_env(
        &[("TALENTSCOUT_DATABASE_URL", "sqlite::memory:"), ("TALENTSCOUT_ENCRYPT_DATA", "false")],
        || {
            let result = privacy::run(PrivacyCommand::Delete {
                session_id: "missing".to_string(),
                reason: "user_request".to_string(),
            });
            assert_eq!(result.exit_code, 8);
            assert_eq!(parse_payload(&result.output)["error_class"], "not_found");
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TALENTSCOUT_APP_NAME",
        "TALENTSCOUT_DEBUG_MODE",
        "TALENTSCOUT_DATABASE_URL",
        "TALENTSCOUT_DATABASE_MAX_CONNECTIONS",
        "TALENTSCOUT_DATABASE_TIMEOUT_SECS",
        "TALENTSCOUT_LLM_PROVIDER",
        "TALENTSCOUT_LLM_API_KEY",
        "TALENTSCOUT_LLM_BASE_URL",
        "TALENTSCOUT_LLM_MODEL",
        "TALENTSCOUT_LLM_TIMEOUT_SECS",
        "TALENTSCOUT_INTERVIEW_MAX_PER_TECHNOLOGY",
        "TALENTSCOUT_INTERVIEW_MAX_TOTAL",
        "TALENTSCOUT_TAXONOMY_PATH",
        "TALENTSCOUT_ENCRYPT_DATA",
        "TALENTSCOUT_DATA_RETENTION_DAYS",
        "TALENTSCOUT_IDENTITY_PATH",
        "TALENTSCOUT_LOGGING_LEVEL",
        "TALENTSCOUT_LOGGING_FORMAT",
        "TALENTSCOUT_LOG_LEVEL",
        "TALENTSCOUT_LOG_FORMAT",
        "OPENAI_API_KEY",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
