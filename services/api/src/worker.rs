use clap::Args;
use realty_insights::config::AppConfig;
use realty_insights::error::AppError;
use realty_insights::listings::PropertyDomain;
use realty_insights::loader::worker;
use realty_insights::source;

#[derive(Args, Debug)]
pub(crate) struct WorkerArgs {
    /// Domain whose pipeline this worker runs
    #[arg(long)]
    pub(crate) domain: PropertyDomain,
}

/// Child side of the process backend. Telemetry is not initialised so that
/// stdout carries the reply and nothing else. Pipeline failures are part of
/// the reply; only setup errors end the process with a failure status.
pub(crate) async fn run_worker(args: WorkerArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let source = source::from_config(&config.loader, &config.database)?;
    worker::run_worker(source.as_ref(), args.domain, std::io::stdout()).await?;
    Ok(())
}
