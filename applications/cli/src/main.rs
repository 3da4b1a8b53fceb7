/// Vibe.FM - mood-driven music from the command line
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vibe_cli::watch::watch;
use vibe_cli::{CliConfig, WatchOptions};
use vibe_server_client::{ServerConfig, VibeServerClient};

#[derive(Parser)]
#[command(name = "vibe")]
#[command(about = "Vibe.FM mood-driven music client", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./vibe.toml when present)
    #[arg(short, long, global = true, env = "VIBE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask for a playlist matching a mood
    Chat {
        /// What you are in the mood for
        message: String,
    },
    /// Show the current playback queue
    Queue,
    /// Start playback at a queue position
    Play {
        /// Zero-based queue index
        index: usize,
    },
    /// Move playback to a device
    Transfer {
        /// Target device id
        device_id: String,
    },
    /// Follow a simulated playback device
    Watch {
        /// Seconds to follow playback for
        #[arg(short, long, default_value_t = 30)]
        seconds: u64,

        /// Forward queue refreshes and device transfers to the backend
        #[arg(long)]
        backend: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vibe_cli=info,vibe_playback=info,vibe_server_client=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Chat { message } => chat(&config, &message).await?,
        Commands::Queue => show_queue(&config).await?,
        Commands::Play { index } => {
            backend(&config)?.play_from_queue(index).await?;
            println!("Playing queue position {}", index);
        }
        Commands::Transfer { device_id } => {
            backend(&config)?.transfer_playback(&device_id).await?;
            println!("Playback moved to {}", device_id);
        }
        Commands::Watch { seconds, backend } => {
            let options = WatchOptions {
                duration: Duration::from_secs(seconds),
                backend,
            };
            watch(&config, &options, std::io::stdout()).await?;
        }
    }

    Ok(())
}

fn backend(config: &CliConfig) -> anyhow::Result<VibeServerClient> {
    if config.server.token.is_none() {
        tracing::warn!("No backend token configured (set VIBE_SERVER__TOKEN)");
    }
    Ok(VibeServerClient::new(ServerConfig {
        url: config.server.url.clone(),
        access_token: config.server.token.clone(),
    })?)
}

async fn chat(config: &CliConfig, message: &str) -> anyhow::Result<()> {
    let response = backend(config)?.chat(message).await?;

    println!("{}", response.message);
    if response.is_success() {
        for uri in &response.playlist_preview {
            println!("  {}", uri);
        }
        if let Some(total) = response.total_tracks {
            let shown = response.playlist_preview.len() as u32;
            if total > shown {
                println!("  ...and {} more", total - shown);
            }
        }
    }
    Ok(())
}

async fn show_queue(config: &CliConfig) -> anyhow::Result<()> {
    let queue = backend(config)?.queue().await?;

    match &queue.currently_playing {
        Some(track) => println!("Now playing: {} — {}", track.name, track.artist_names()),
        None => println!("Nothing playing"),
    }
    for (index, track) in queue.queue.iter().enumerate() {
        println!(
            "{:>3}. {} — {}  {}",
            index,
            track.name,
            track.artist_names(),
            vibe_playback::format_time(track.duration_ms)
        );
    }
    Ok(())
}
