use std::process::ExitCode;

use log::{error, info};
use python_jobs_scraper::config::Config;
use python_jobs_scraper::{logger, pipeline};

#[tokio::main]
async fn main() -> ExitCode {
    logger::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    info!("Starting Python job scrape");
    let report = pipeline::run(&config).await;

    // The surrounding automation treats the presence of this file as the
    // signal that something went wrong, even when the run itself finished.
    if !report.errors.is_empty() {
        if let Err(err) = report.write_error_log(pipeline::ERROR_LOG_FILE) {
            error!("Failed to write {}: {err}", pipeline::ERROR_LOG_FILE);
        }
    }

    if report.failed {
        error!("Run failed with {} recorded error(s)", report.errors.len());
        ExitCode::FAILURE
    } else {
        info!(
            "Run finished: {} listings written, {} record(s) skipped",
            report.listings.len(),
            report.errors.len()
        );
        ExitCode::SUCCESS
    }
}
