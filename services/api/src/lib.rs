mod cli;
mod infra;
mod query;
mod routes;
mod server;
mod worker;

use realty_insights::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
