//! journey-sim - drive one journey through the live activity engine
//!
//! Runs the orchestrator over in-memory activity and alarm platforms, so a
//! whole journey (boarding, wake-up alarm, arrival) can be watched in the log.

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use journey_live_core::config::{ConfigOverrides, resolve_config};
use journey_live_core::{JourneyData, JourneyStation, Train, home, logging};
use journey_live_engine::memory::{
    MemoryActivityPlatform, MemoryAlarmPlatform, MemoryCoordinationClient, MemoryPreferences,
    StaticPushSupplier,
};
use journey_live_engine::platform::{
    ActivityPlatform, AnalyticsSink, CoordinationClient, JourneyCache, LogAnalytics,
};
use journey_live_engine::{
    Dependencies, EngineConfig, FileJourneyCache, HttpCoordinationClient, Orchestrator,
    StartRequest, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Simulate a train journey with a live activity and wake-up alarm
#[derive(Parser, Debug)]
#[command(name = "journey-sim")]
#[command(about = "Simulate a train journey with a live activity and wake-up alarm")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Train display name
    #[arg(long, default_value = "Express 101")]
    train: String,

    /// Operator train number
    #[arg(long, default_value = "101")]
    number: String,

    /// Boarding station name
    #[arg(long, default_value = "Taipei")]
    origin: String,

    /// Boarding station code
    #[arg(long, default_value = "1000")]
    origin_code: String,

    /// Destination station name
    #[arg(long, default_value = "Hsinchu")]
    destination: String,

    /// Destination station code
    #[arg(long, default_value = "1210")]
    destination_code: String,

    /// Minutes from now until departure (negative: already departed)
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    depart_in: i64,

    /// Minutes from now until arrival
    #[arg(long, default_value_t = 3)]
    arrive_in: i64,

    /// Alarm lead time in minutes (overrides configuration)
    #[arg(long, value_name = "MINUTES")]
    offset: Option<u32>,

    /// Coordination service base URL (overrides configuration)
    #[arg(long, value_name = "URL")]
    remote_url: Option<String>,

    /// Disable the wake-up alarm
    #[arg(long)]
    no_alarm: bool,

    /// Seconds between simulated foreground refreshes
    #[arg(long, default_value_t = 30)]
    refresh_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        logging::init_with_level(tracing::Level::DEBUG);
    } else {
        logging::init();
    }

    if args.arrive_in <= args.depart_in {
        anyhow::bail!("--arrive-in must be later than --depart-in");
    }

    let home_dir = home::get_home_dir().context("Failed to determine home directory")?;
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    let overrides = ConfigOverrides {
        config_path: args.config.clone(),
        alarm_enabled: args.no_alarm.then_some(false),
        alarm_offset_minutes: args.offset,
        remote_url: args.remote_url.clone(),
    };
    let config = resolve_config(&overrides, &current_dir, &home_dir)
        .context("Failed to resolve configuration")?;

    let cache_path = config
        .cache
        .path
        .clone()
        .unwrap_or_else(|| home::default_cache_path(&home_dir));
    info!("Journey cache: {}", cache_path.display());

    let remote: Arc<dyn CoordinationClient> =
        match HttpCoordinationClient::from_config(&config.remote)
            .context("Failed to build coordination client")?
        {
            Some(client) => {
                info!("Coordination service: {}", client.base_url());
                Arc::new(client)
            }
            None => {
                info!("No coordination service configured, recording remote calls locally");
                Arc::new(MemoryCoordinationClient::new())
            }
        };

    let analytics: Arc<dyn AnalyticsSink> = Arc::new(LogAnalytics);
    let activities = MemoryActivityPlatform::new();
    let alarms = MemoryAlarmPlatform::new();
    let cache = Arc::new(FileJourneyCache::new(cache_path));
    let preferences =
        MemoryPreferences::from_config(&config.alarm).with_analytics(Arc::clone(&analytics));

    let deps = Dependencies {
        activities: Arc::new(activities.clone()),
        alarms: Arc::new(alarms.clone()),
        remote,
        push: Arc::new(StaticPushSupplier::new(Some("journey-sim-device".to_string()))),
        analytics,
        cache: cache.clone(),
        preferences: Arc::new(preferences),
        clock: Arc::new(SystemClock),
    };
    let orchestrator = Orchestrator::new(deps, EngineConfig::from(&config));

    let now = Utc::now();
    let origin = JourneyStation::new(&args.origin, &args.origin_code)
        .with_estimated_time(now + ChronoDuration::minutes(args.depart_in));
    let destination = JourneyStation::new(&args.destination, &args.destination_code)
        .with_estimated_time(now + ChronoDuration::minutes(args.arrive_in));
    let arrival = now + ChronoDuration::minutes(args.arrive_in);

    let train = Train {
        name: args.train.clone(),
        number: args.number.clone(),
    };
    let journey = JourneyData {
        stations: vec![origin.clone(), destination.clone()],
        departure_code: origin.code.clone(),
        arrival_code: destination.code.clone(),
    };
    if let Err(e) = cache
        .store_selected_train(&train)
        .and_then(|()| cache.store_journey_data(&journey))
    {
        warn!("Failed to cache journey: {e}");
    }

    orchestrator.start_monitoring();
    let activity_id = orchestrator
        .start(StartRequest::new(args.train.clone(), origin, destination))
        .await
        .context("Failed to start live activity")?;
    info!("Tracking journey as activity {activity_id}");

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let mut refresh = tokio::time::interval(Duration::from_secs(args.refresh_secs.max(1)));
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    let ends_at = arrival + ChronoDuration::minutes(1);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Interrupted, leaving journey early");
                break;
            }
            _ = refresh.tick() => {
                orchestrator.refresh_in_foreground().await;
            }
            _ = tick.tick() => {
                let now = Utc::now();
                for fired in alarms.fire_due(now) {
                    info!("Alarm ringing for activity {fired}");
                }
                if now >= ends_at {
                    info!("Journey complete");
                    break;
                }
                if activities.live_activities().await.is_empty() {
                    info!("Activity no longer live");
                    break;
                }
            }
        }
    }

    orchestrator.end(&activity_id).await;
    orchestrator.shutdown(Duration::from_secs(5)).await;
    info!("journey-sim finished");
    Ok(())
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
                        _ = sigterm.recv() => info!("Received SIGTERM"),
                    }
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {e}");
                    let _ = ctrl_c.await;
                    info!("Received SIGINT (Ctrl+C)");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("Received Ctrl+C");
        }

        cancel.cancel();
    });
}
