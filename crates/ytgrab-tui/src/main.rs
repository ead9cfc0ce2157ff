mod app;
mod download_manager;
mod flow;
mod selection;
mod theme;
mod ui;
mod widgets;

use anyhow::Context;

use ytgrab_core::config::Config;
use ytgrab_core::platform;
use ytgrab_core::runner::Runner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("ytgrab.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("ytgrab log: {}", log_path.display());

    tracing::info!("ytgrab starting…");

    let config = Config::load().unwrap_or_default();
    let runner = Runner::from_config(&config)
        .context("yt-dlp is required; place it in bin/ or set YT_DLP_PATH")?;

    let app = app::App::new(&config, runner);
    app.run().await?;

    Ok(())
}
