use std::io::{self, BufRead, Write};

use anyhow::Context;
use talentscout_agent::{IntakeRuntime, Turn};
use talentscout_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use talentscout_core::domain::session::Session;
use tokio::runtime::Runtime;

use crate::bootstrap::{bootstrap_with_config, Persistence};
use crate::commands::{command_runtime, CommandResult};

/// Sent on end of input so an abandoned chat still hands off its partial record.
const END_OF_INPUT: &str = "exit";

#[derive(Clone, Debug, Default)]
pub struct ChatOptions {
    pub database_url: Option<String>,
    pub no_persist: bool,
}

pub fn run(options: ChatOptions) -> CommandResult {
    let load = LoadOptions {
        overrides: ConfigOverrides { database_url: options.database_url, ..Default::default() },
        ..Default::default()
    };
    let config = match AppConfig::load(load) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match command_runtime("chat") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let persistence = if options.no_persist { Persistence::Discard } else { Persistence::Database };
    let app = match runtime.block_on(bootstrap_with_config(config, persistence)) {
        Ok(app) => app,
        Err(error) => return CommandResult::from_bootstrap("chat", &error),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    match converse(&runtime, &app.runtime, stdin.lock(), stdout.lock()) {
        Ok(session) => CommandResult::success(
            "chat",
            format!(
                "session {} closed after {} turn(s); record is {}",
                session.id(),
                session.turns(),
                session.record().completion_status().as_str()
            ),
        ),
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), 9),
    }
}

/// Runs one conversation over line-oriented input until the session closes.
pub fn converse<R, W>(
    runtime: &Runtime,
    intake: &IntakeRuntime,
    input: R,
    mut output: W,
) -> anyhow::Result<Session>
where
    R: BufRead,
    W: Write,
{
    let Turn { mut session, prompt } = intake.start();
    write_prompt(&mut output, &prompt)?;

    let mut lines = input.lines();
    let mut input_closed = false;
    while !session.is_closed() {
        write!(output, "> ").context("failed to write to output")?;
        output.flush().context("failed to flush output")?;

        let text = match lines.next() {
            Some(line) => line.context("failed to read input line")?,
            None if input_closed => break,
            None => {
                input_closed = true;
                writeln!(output).context("failed to write to output")?;
                END_OF_INPUT.to_owned()
            }
        };

        let turn = runtime.block_on(intake.advance(session, &text));
        session = turn.session;
        write_prompt(&mut output, &turn.prompt)?;
    }

    Ok(session)
}

fn write_prompt<W: Write>(output: &mut W, prompt: &str) -> anyhow::Result<()> {
    writeln!(output, "{prompt}\n").context("failed to write to output")
}
