use clap::Parser;
use log::{error, info};
use server::clock::SystemClock;
use server::config::TrackerConfig;
use server::network::Server;
use server::tracker::Tracker;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "1337")]
    port: u16,

    /// New accounts admitted per creation window
    #[arg(long, default_value = "1")]
    max_new_accounts: usize,

    /// Creation-rate window in seconds
    #[arg(long, default_value = "1.0")]
    creation_window: f64,

    /// Largest increment a single report may add, in seconds
    #[arg(long, default_value = "120.0")]
    max_increment: f64,

    /// Allowed drift between reported and real elapsed time, in seconds
    #[arg(long, default_value = "10.0")]
    drift_tolerance: f64,

    /// Seconds since the last report before an account shows as offline
    #[arg(long, default_value = "120.0")]
    online_window: f64,

    /// Seconds between stats log lines
    #[arg(long, default_value = "60")]
    stats_interval: u64,
}

impl Args {
    fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            max_new_accounts: self.max_new_accounts,
            creation_window: self.creation_window,
            max_increment: self.max_increment,
            drift_tolerance: self.drift_tolerance,
            online_window: self.online_window,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = args.tracker_config();
    config.validate()?;
    info!("Tracker config: {:?}", config);

    let tracker = Arc::new(Tracker::new(config, Arc::new(SystemClock::new())));

    let address = format!("{}:{}", args.host, args.port);
    let stats_interval = Duration::from_secs(args.stats_interval.max(1));
    let mut server = Server::new(&address, tracker, stats_interval).await?;
    let handle = server.handle();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                handle.shutdown();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    server.run().await?;

    Ok(())
}
