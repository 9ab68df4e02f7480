use serde::Serialize;
use talentscout_agent::build_llm_client;
use talentscout_core::config::{AppConfig, LoadOptions};
use talentscout_db::connect_from_config;

use crate::bootstrap::load_taxonomy;
use crate::commands::escape_json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 4] =
    ["taxonomy_load", "database_connectivity", "llm_readiness", "identity_readiness"];

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(pass("config_validation", "configuration loaded and validated"));
            checks.push(check_taxonomy(&config));
            checks.push(check_database_connectivity(&config));
            checks.push(check_llm(&config));
            checks.push(check_identity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn pass(name: &'static str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Pass, details: details.into() }
}

fn fail(name: &'static str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Fail, details: details.into() }
}

fn check_taxonomy(config: &AppConfig) -> DoctorCheck {
    match load_taxonomy(config) {
        Ok(taxonomy) => pass(
            "taxonomy_load",
            format!(
                "{} technologies from {}",
                taxonomy.len(),
                config
                    .taxonomy
                    .path
                    .as_ref()
                    .map(|path| format!("`{}`", path.display()))
                    .unwrap_or_else(|| "the builtin document".to_string())
            ),
        ),
        Err(error) => fail("taxonomy_load", error.to_string()),
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return fail(
                "database_connectivity",
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;
        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => pass("database_connectivity", format!("connected using `{}`", config.database.url)),
        Err(error) => fail("database_connectivity", error),
    }
}

/// Builds the client without calling the provider.
fn check_llm(config: &AppConfig) -> DoctorCheck {
    if !config.llm_enabled() {
        return pass("llm_readiness", "llm disabled; questions come from static templates");
    }
    match build_llm_client(&config.llm) {
        Ok(client) => pass(
            "llm_readiness",
            format!("{} client configured for model `{}`", client.provider(), config.llm.model),
        ),
        Err(error) => fail("llm_readiness", error.to_string()),
    }
}

fn check_identity(config: &AppConfig) -> DoctorCheck {
    let path = &config.privacy.identity_path;
    if !config.privacy.encrypt_data {
        return pass("identity_readiness", "encryption disabled; records are stored in plaintext");
    }
    if path.exists() {
        return pass("identity_readiness", format!("identity present at `{}`", path.display()));
    }
    pass(
        "identity_readiness",
        format!("identity will be generated at `{}` on first save", path.display()),
    )
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
