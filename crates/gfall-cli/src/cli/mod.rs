mod commands;
mod helpers;

use clap::Parser;
use gfall_core::domain::GfallError;

pub fn run_from_env() -> i32 {
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let gfall_error = error.as_gfall_error();
            eprintln!("{}", gfall_error.diagnostic_line());
            if let Some(summary_line) = gfall_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            gfall_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("gfall-rs".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_tracing(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "gfall-rs", version, about = "Kurucz gfall line list ingestion")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Print per-ion level and line counts of a gfall file
    Inspect(commands::InspectArgs),
    /// Cull against ionization energies and build the final level/line tables
    Build(commands::BuildArgs),
    /// Upsert levels and lines into a JSON snapshot store
    Ingest(commands::IngestArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Inspect(args) => commands::run_inspect_command(args),
        CliCommand::Build(args) => commands::run_build_command(args),
        CliCommand::Ingest(args) => commands::run_ingest_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(GfallError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_gfall_error(&self) -> GfallError {
        match self {
            Self::Usage(message) => GfallError::format("CONFIG.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => GfallError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
