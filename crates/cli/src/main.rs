use std::process::ExitCode;

fn main() -> ExitCode {
    talentscout_cli::run()
}
