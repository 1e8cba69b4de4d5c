use anyhow::Result;
use bidscraper::{
    postprocess::FilterOutcome,
    session::ChromiumDriver,
    ScrapeConfig,
};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bidscraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    match scrape().await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn scrape() -> Result<ExitCode> {
    // ─── 2) configuration ────────────────────────────────────────────
    let cfg = ScrapeConfig::from_env()?;
    info!(url = %cfg.url, out = %cfg.output_dir.display(), "configured");

    // ─── 3) launch browser & scrape ──────────────────────────────────
    let driver = ChromiumDriver::launch(&cfg).await?;
    let report = bidscraper::run(driver, &cfg).await?;

    // ─── 4) dumps for manual inspection ──────────────────────────────
    println!("Extracted table:\n{}", report.table);
    match &report.filter {
        FilterOutcome::Written { table, .. } => println!("Filtered bids:\n{}", table),
        FilterOutcome::NoMatches => println!("No bids found for '{}'.", cfg.target),
        FilterOutcome::ColumnMissing => {
            println!("Column '{}' not found in the table.", cfg.filter_column)
        }
    }

    // ─── 5) exit status ──────────────────────────────────────────────
    if report.is_partial() {
        warn!(pages = report.pages, "results are partial: {}", report.termination);
        return Ok(ExitCode::from(2));
    }
    info!("all done");
    Ok(ExitCode::SUCCESS)
}
