use clap::Parser;
use strategyd_bot::{AppConfig, AppResult, Application};
use tracing::info;

/// strategyd: automated on-chain strategy daemon
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via STRATEGYD_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = Args::parse();

    strategyd_telemetry::init_logging()?;

    info!("starting strategyd v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(args.config)?;
    info!(poll_interval_secs = config.poll_interval_secs, "configuration loaded");

    let app = Application::new(config).await?;
    app.run().await
}
