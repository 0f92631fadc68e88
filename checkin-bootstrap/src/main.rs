use anyhow::Result;
use clap::Parser;

use checkin_bootstrap::EventOverrides;
use checkin_infrastructure::CONFIG_PATH_ENV;

#[derive(Parser, Debug)]
#[command(name = "alfio-checkin")]
#[command(about = "Offline check-in for alf.io events", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    /// Event server base URL
    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    api_key: Option<String>,

    /// Event id
    #[arg(long)]
    event: Option<String>,

    /// Content of the event configuration QR code
    #[arg(long, conflicts_with_all = ["url", "api_key", "event"])]
    qr: Option<String>,

    /// Print counters in Prometheus text format on exit
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Some(config) = args.config {
        std::env::set_var(CONFIG_PATH_ENV, config);
    }

    let overrides = EventOverrides {
        url: args.url,
        api_key: args.api_key,
        event: args.event,
        qr: args.qr,
    };
    checkin_bootstrap::run_standalone(overrides, args.metrics).await
}
