use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use talentscout_agent::{IntakeRuntime, QuestionGenerator, QuestionPolicy};
use talentscout_core::config::{AppConfig, LoadOptions};
use talentscout_core::domain::candidate::CompletionStatus;
use talentscout_core::taxonomy::TechTaxonomy;
use talentscout_db::{connect_from_config, migrations, InMemoryDataHandler};

use crate::bootstrap::load_taxonomy;
use crate::commands::{escape_json, CommandResult};

const SCRIPTED_PROFILE: [&str; 8] = [
    "ready",
    "Ada Lovelace",
    "ada@example.com",
    "+1 555 123 4567",
    "3",
    "Backend Engineer",
    "Python, Django, PostgreSQL",
    "yes",
];
const SCRIPTED_ANSWER: &str = "I have used it in production and can walk through an example.";
const MAX_SCRIPTED_TURNS: usize = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            checks.push(passed("config_validation", elapsed_ms, "configuration loaded and validated"));
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(failed("config_validation", elapsed_ms, error.to_string()));
            checks.extend(
                ["taxonomy_load", "db_connectivity", "migration_visibility", "scripted_conversation"]
                    .into_iter()
                    .map(skipped),
            );
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let taxonomy = match timed_check(|| load_taxonomy(&config)) {
        Ok((elapsed_ms, taxonomy)) => {
            checks.push(passed(
                "taxonomy_load",
                elapsed_ms,
                format!("{} technologies loaded", taxonomy.len()),
            ));
            Some(taxonomy)
        }
        Err((elapsed_ms, error)) => {
            checks.push(failed("taxonomy_load", elapsed_ms, error.to_string()));
            None
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(failed("db_connectivity", 0, format!("failed to initialize async runtime: {error}")));
            checks.extend(["migration_visibility", "scripted_conversation"].into_iter().map(skipped));
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let db_started = Instant::now();
    match runtime.block_on(connect_from_config(&config.database)) {
        Ok(pool) => {
            checks.push(passed(
                "db_connectivity",
                elapsed_since(db_started),
                format!("connected using `{}`", config.database.url),
            ));

            let migration_started = Instant::now();
            let migration_result = runtime.block_on(migrations::run_pending(&pool));
            runtime.block_on(pool.close());
            checks.push(match migration_result {
                Ok(()) => passed(
                    "migration_visibility",
                    elapsed_since(migration_started),
                    "migrations are visible and executable",
                ),
                Err(error) => failed(
                    "migration_visibility",
                    elapsed_since(migration_started),
                    format!("migration execution failed: {error}"),
                ),
            });
        }
        Err(error) => {
            checks.push(failed(
                "db_connectivity",
                elapsed_since(db_started),
                format!("failed to connect: {error}"),
            ));
            checks.push(skipped("migration_visibility"));
        }
    }

    match taxonomy {
        Some(taxonomy) => {
            let conversation_started = Instant::now();
            let outcome = runtime.block_on(scripted_conversation(&config, taxonomy));
            let elapsed_ms = elapsed_since(conversation_started);
            checks.push(match outcome {
                Ok(message) => passed("scripted_conversation", elapsed_ms, message),
                Err(message) => failed("scripted_conversation", elapsed_ms, message),
            });
        }
        None => checks.push(skipped("scripted_conversation")),
    }

    finalize_report(checks, elapsed_since(started))
}

/// Drives a full deterministic intake against an in-memory handler. The LLM is
/// never consulted so the run does not depend on the network.
async fn scripted_conversation(
    config: &AppConfig,
    taxonomy: Arc<TechTaxonomy>,
) -> Result<String, String> {
    let handler = Arc::new(InMemoryDataHandler::default());
    let generator =
        QuestionGenerator::new(Arc::clone(&taxonomy), QuestionPolicy::from_config(&config.interview));
    let intake = IntakeRuntime::new(taxonomy, generator, handler.clone());

    let mut session = intake.start().session;
    for line in SCRIPTED_PROFILE {
        session = intake.advance(session, line).await.session;
    }
    let question_count = session.question_count();

    let mut turns = 0;
    while !session.is_closed() {
        if turns == MAX_SCRIPTED_TURNS {
            return Err(format!(
                "session still in phase `{}` after {MAX_SCRIPTED_TURNS} answers",
                session.phase().name()
            ));
        }
        session = intake.advance(session, SCRIPTED_ANSWER).await.session;
        turns += 1;
    }

    let stored = handler
        .get(session.id())
        .await
        .ok_or_else(|| "closed session was not handed off".to_string())?;
    if stored.completion_status() != CompletionStatus::Complete {
        return Err(format!(
            "handed-off record is incomplete: {} answer(s) over {} technologies",
            stored.answers.len(),
            stored.tech_stack.len()
        ));
    }

    Ok(format!(
        "{question_count} questions generated and answered; record handed off as complete"
    ))
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((elapsed_since(started), value)),
        Err(error) => Err((elapsed_since(started), error)),
    }
}

fn elapsed_since(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn passed(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Pass, elapsed_ms, message: message.into() }
}

fn failed(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Fail, elapsed_ms, message: message.into() }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due to previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            escape_json(&error.to_string())
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
