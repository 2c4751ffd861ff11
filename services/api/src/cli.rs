use crate::query::{run_query, QueryArgs};
use crate::server;
use crate::worker::{run_worker, WorkerArgs};
use clap::{Args, Parser, Subcommand};
use realty_insights::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Realty Insights",
    about = "Load, filter and summarize otodom land, house and apartment listings",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Load all domains once and print a filtered view of one of them
    Query(QueryArgs),
    /// Run a single domain pipeline and print its reply on stdout
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Load the default session before reporting ready
    #[arg(long)]
    pub(crate) preload: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Query(args) => run_query(args).await,
        Command::Worker(args) => run_worker(args).await,
    }
}
