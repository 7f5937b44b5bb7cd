use clap::Parser;
use lastfm_recommend::config::{API_KEY_ENV, DEFAULT_PORT};
use lastfm_recommend::{ApiConfig, LastFmApiClient, Providers, ServerConfig, SessionServer};
use std::path::PathBuf;
use std::sync::Arc;

/// Music recommendation server speaking line-delimited JSON
#[derive(Parser)]
#[command(
    name = "recommend-server",
    about = "Music recommendation server speaking line-delimited JSON",
    long_about = None
)]
struct Cli {
    /// Interface to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Append every received request line to this file
    #[arg(long)]
    request_log: Option<PathBuf>,

    /// Show detailed debug information
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let api_config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {e}");
            eprintln!();
            eprintln!("Please set the following environment variable:");
            eprintln!("  {API_KEY_ENV}=your_lastfm_api_key");
            std::process::exit(1);
        }
    };
    let api = LastFmApiClient::new(
        Box::new(http_client::native::NativeClient::new()),
        api_config,
    );

    let mut config = ServerConfig::new().with_host(args.host).with_port(args.port);
    if let Some(path) = args.request_log {
        config = config.with_request_log(path);
    }

    let server = SessionServer::bind(config, Providers::from_shared(Arc::new(api))).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Received Ctrl-C");
            shutdown.shutdown();
        }
    });

    server.run().await?;
    Ok(())
}
