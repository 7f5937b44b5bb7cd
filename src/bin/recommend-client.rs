use clap::{Parser, Subcommand};
use lastfm_recommend::config::DEFAULT_PORT;
use lastfm_recommend::{Connector, ConnectorConfig, Track};

/// Client for the music recommendation server
#[derive(Parser)]
#[command(
    name = "recommend-client",
    about = "Client for the music recommendation server",
    long_about = None
)]
struct Cli {
    /// Server host
    #[arg(long, global = true, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(long, short, global = true, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Show detailed debug information
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog for tracks
    ///
    /// Usage examples:
    /// # Search for a song
    /// recommend-client search "Fireflies"
    ///
    /// # Show up to 5 results
    /// recommend-client search "Owl City" --limit 5
    Search {
        /// Search query (track name, artist, ...)
        query: String,

        /// Maximum number of results
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Get recommendations for a track
    ///
    /// Usage examples:
    /// # Similar tracks (the default strategy)
    /// recommend-client recommend "Fireflies" "Owl City"
    ///
    /// # Popularity-based picks
    /// recommend-client recommend "Fireflies" "Owl City" --strategy popularity
    Recommend {
        /// Seed track name
        track: String,

        /// Seed artist name
        artist: String,

        /// Number of recommendations
        #[arg(long, default_value = "10")]
        count: u32,

        /// Strategy to use: similarity, popularity or random
        #[arg(long)]
        strategy: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = ConnectorConfig::new().with_host(args.host).with_port(args.port);
    let mut connector = Connector::new(config);

    if let Err(e) = connector.connect().await {
        eprintln!("❌ Failed to connect to {}: {e}", connector.config().addr());
        std::process::exit(1);
    }

    if let Err(e) = execute_command(args.command, &mut connector).await {
        eprintln!("❌ Command failed: {e}");
        std::process::exit(1);
    }

    connector.disconnect();
}

async fn execute_command(
    command: Commands,
    connector: &mut Connector,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Search { query, limit } => {
            println!("🔍 Searching for '{query}'...");
            let tracks = connector.search_tracks(&query, limit).await?;
            print_tracks(&tracks);
        }
        Commands::Recommend {
            track,
            artist,
            count,
            strategy,
        } => {
            if let Some(strategy) = strategy {
                let confirmation = connector.set_strategy(&strategy).await?;
                println!("⚙️  {confirmation}");
            }
            println!("🎵 Recommendations for '{track}' by '{artist}'...");
            let tracks = connector.recommend(&track, &artist, count).await?;
            print_tracks(&tracks);
        }
    }
    Ok(())
}

fn print_tracks(tracks: &[Track]) {
    if tracks.is_empty() {
        println!("❌ No tracks found");
        return;
    }

    println!();
    for (i, track) in tracks.iter().enumerate() {
        println!("{:>3}. {track}", i + 1);
        if track.listeners > 0 {
            println!("     👥 {} listeners", track.formatted_listeners());
        }
        if let Some(url) = &track.url {
            println!("     🔗 {url}");
        }
    }
    println!();
    println!("Found {} tracks", tracks.len());
}
