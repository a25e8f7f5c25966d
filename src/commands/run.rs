use acars::announcements::AnnouncementService;
use acars::api::{self, AppState, SupabaseAuth, TokenVerifier};
use acars::config::AppConfig;
use acars::discord::MessageSink;
use acars::flight_tracker::{FLIGHT_POLL_TIMER, FlightTracker};
use acars::metrics::{init_metrics, initialize_messaging_metrics, initialize_tracker_metrics};
use acars::notifier::DiscordNotifier;
use acars::quotes::{QUOTE_TIMER, QuoteJob, QuoteService};
use acars::scheduler::Scheduler;
use acars::telemetry_source::SupabaseFlightSource;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{discord_client, http_client};

pub async fn handle_run(config: AppConfig, interface: String, no_api: bool) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "run");
    });

    let prometheus = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {:#}", e);
            None
        }
    };
    initialize_tracker_metrics();
    initialize_messaging_metrics();

    let http = http_client()?;
    let discord: Arc<dyn MessageSink> = Arc::new(discord_client(&config, &http)?);
    let mut scheduler = Scheduler::new();

    match (&config.supabase, &config.flight_status_channel_id) {
        (Some(supabase), Some(channel_id)) => {
            let source = Arc::new(SupabaseFlightSource::new(http.clone(), supabase));
            let notifier = Arc::new(DiscordNotifier::new(discord.clone(), channel_id.clone()));
            let tracker = FlightTracker::new(source, notifier, config.tracker.clone());
            info!(
                "Flight tracking enabled: posting to channel {} every {}s",
                channel_id, config.tracker.poll_interval_secs
            );
            scheduler
                .start(FLIGHT_POLL_TIMER, config.tracker.poll_interval(), tracker)
                .await?;
        }
        _ => warn!(
            "Flight tracking disabled: SUPABASE_URL, SUPABASE_ANON_KEY and FLIGHT_STATUS_CHANNEL_ID are required"
        ),
    }

    if config.quote_user_ids.is_empty() {
        info!("No QUOTE_USER_IDS configured, quote timer not started");
    } else {
        let period = Duration::from_secs(config.quote_interval_secs);
        let job = QuoteJob::new(QuoteService::new(discord.clone()), config.quote_user_ids.clone());
        info!(
            "Sending quotes to {} users every {}s",
            config.quote_user_ids.len(),
            config.quote_interval_secs
        );
        scheduler.start_delayed(QUOTE_TIMER, period, period, job).await?;
    }

    let shutdown = CancellationToken::new();
    let mut api_task = if no_api {
        None
    } else {
        let verifier: Option<Arc<dyn TokenVerifier>> = config
            .supabase
            .as_ref()
            .map(|supabase| Arc::new(SupabaseAuth::new(http.clone(), supabase)) as Arc<dyn TokenVerifier>);
        if verifier.is_some() {
            info!("Supabase bearer authentication enabled for the API");
        }

        let state = AppState {
            announcements: AnnouncementService::new(discord.clone()),
            verifier,
            admin_password: config.admin_password.clone(),
            default_channel_id: config.announcement_channel_id.clone(),
            metrics: prometheus,
            started_at: Instant::now(),
        };
        let origins = config.allowed_origins.clone();
        let port = config.port;
        let token = shutdown.clone();
        Some(tokio::spawn(async move {
            api::serve(state, &interface, port, &origins, token).await
        }))
    };

    // Run until Ctrl+C, or until the API server dies on its own
    let early_api_exit = match api_task.as_mut() {
        Some(task) => tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for shutdown signal")?;
                None
            }
            result = task => Some(result),
        },
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            None
        }
    };

    match &early_api_exit {
        None => info!("Received shutdown signal (Ctrl+C), stopping timers..."),
        Some(_) => error!("API server exited unexpectedly, shutting down"),
    }

    // In-flight poll and quote cycles complete before this returns
    scheduler.stop_all().await;
    shutdown.cancel();

    let api_result = match (early_api_exit, api_task) {
        (Some(result), _) => Some(result),
        (None, Some(task)) => Some(task.await),
        (None, None) => None,
    };

    info!("Graceful shutdown complete");
    match api_result {
        Some(Ok(result)) => result,
        Some(Err(join_error)) => Err(join_error).context("API server task panicked"),
        None => Ok(()),
    }
}
