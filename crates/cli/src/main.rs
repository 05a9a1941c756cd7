//! `minions` command line front-end.

mod cli;
mod commands;
mod errors;
mod tracing;

use crate::cli::parse;
use crate::commands::{Command, CommandExecutor};
use crate::errors::CliError;
use crate::tracing::{TracingConfig, TracingFormat};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(()) => 0,
        Err(error) => {
            let code = error.exit_code();
            report(error);
            code
        }
    };
    std::process::exit(code);
}

#[allow(clippy::print_stderr)]
fn report(error: CliError) {
    eprintln!("{:?}", miette::Report::new(error));
}

/// Write command output to stdout.
#[allow(clippy::print_stdout)]
pub(crate) fn print_output(output: &str) {
    if !output.is_empty() {
        println!("{output}");
    }
}

#[allow(clippy::print_stderr)]
async fn run_main() -> Result<(), CliError> {
    let cli = parse();

    let tracing_config = TracingConfig {
        format: if cli.json {
            TracingFormat::Json
        } else {
            cli.log_format
        },
        level: cli.level.into(),
        ..Default::default()
    };
    if let Err(e) = crate::tracing::init_tracing(tracing_config) {
        eprintln!("Failed to initialize tracing: {e:?}");
    }

    let executor = CommandExecutor::new(cli.file, cli.config, cli.format);
    let command: Command = cli.command.into();
    run_cli(&executor, command).await
}

async fn run_cli(executor: &CommandExecutor, command: Command) -> Result<(), CliError> {
    ::tracing::debug!(?command, "Executing command");
    let output = executor.execute(command).await?;
    print_output(&output);
    Ok(())
}
