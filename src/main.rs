use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use acars::config::AppConfig;
use acars::log_format::init_tracing;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "acars")]
#[command(version, about = "ACARS flight status bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the flight tracker, quote timer and announcement API until Ctrl+C
    Run {
        /// Interface for the API server
        #[arg(long, default_value = "0.0.0.0")]
        interface: String,
        /// Do not start the API server
        #[arg(long)]
        no_api: bool,
    },
    /// Post the current status of every active flight to the flight status channel
    TestFlight,
    /// Send an announcement embed to a channel
    Announce {
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
        /// Channel ID; defaults to ANNOUNCEMENT_CHANNEL_ID
        #[arg(long)]
        channel: Option<String>,
        /// Embed colour as 0xRRGGBB, #RRGGBB or RRGGBB
        #[arg(long)]
        color: Option<String>,
    },
    /// DM one inspirational quote to a user
    Quote {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let sentry_guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: std::env::var("ACARS_ENV").ok().map(Into::into),
                traces_sample_rate: 0.0,
                ..Default::default()
            },
        ))
    });
    init_tracing(sentry_guard.is_some());

    if let Err(e) = dispatch(cli.command, config).await {
        error!("{:#}", e);
        // Flush Sentry before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn dispatch(command: Commands, config: AppConfig) -> Result<()> {
    match command {
        Commands::Run { interface, no_api } => commands::handle_run(config, interface, no_api).await,
        Commands::TestFlight => commands::handle_test_flight(config).await,
        Commands::Announce {
            title,
            message,
            channel,
            color,
        } => commands::handle_announce(config, title, message, channel, color).await,
        Commands::Quote { user } => commands::handle_quote(config, user).await,
    }
}
