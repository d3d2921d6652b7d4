//! surf-lamp: keeps surf conditions fresh and serves lamp brightness.
//!
//! Single-binary Tokio application that:
//! 1. Refreshes every configured location into the cache on a fixed interval
//! 2. Answers lamp device polls from the cache, fetching on a miss
//! 3. Logs a periodic heartbeat

mod config;

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use tracing::{error, info, warn};

use common::LampServerConfig;
use lamp_api::AppState;
use lamp_service::{
    CacheStore, LampConfigService, LampRegistry, MemoryCache, RefreshScheduler, StaticRegistry,
};
use surf_client::{HttpSurfFetcher, SurfFetcher};

/// Surf lamp data service
#[derive(Parser)]
#[command(name = "surf-lamp", about = "Surf data refresh and lamp configuration service")]
struct Cli {
    /// Path to a TOML config file (default: ./config.toml, or $SURF_LAMP_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single refresh cycle, log the cached readings, then exit.
    #[arg(long)]
    once: bool,

    /// Load and validate configuration, print a summary, then exit.
    #[arg(long)]
    check_config: bool,
}

fn log_summary(cfg: &LampServerConfig) {
    info!(
        "Locations: {:?}",
        cfg.locations.iter().map(|l| &l.name).collect::<Vec<_>>()
    );
    info!(
        "Lamps: {}, cache ttl={}s, refresh every {}s, fetch timeout {}s, {} req/min",
        cfg.lamps.len(),
        cfg.cache.ttl_secs,
        cfg.timing.refresh_interval_secs,
        cfg.timing.fetch_timeout_secs,
        cfg.providers.requests_per_minute,
    );
    info!(
        "Brightness: wave mid≥{}m high≥{}m, wind mid≥{}m/s high≥{}m/s, default={:?}",
        cfg.brightness.wave_height_m.mid,
        cfg.brightness.wave_height_m.high,
        cfg.brightness.wind_speed_mps.mid,
        cfg.brightness.wind_speed_mps.high,
        cfg.brightness.default_level,
    );
}

async fn log_cached_readings(cfg: &LampServerConfig, cache: &dyn CacheStore) {
    for location in &cfg.locations {
        match cache.get(&location.name).await {
            Ok(Some(r)) => info!(
                "{}: wave={:?}m period={:?}s wind={:?}m/s dir={:?}°",
                location.name, r.wave_height_m, r.wave_period_s, r.wind_speed_mps, r.wind_direction_deg
            ),
            Ok(None) => warn!("{}: no reading", location.name),
            Err(e) => error!("{}: cache read failed: {}", location.name, e),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "surf_lamp=info,surf_client=info,lamp_service=info,lamp_api=info,tower_http=info"
                    .into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("Surf lamp service starting up...");

    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    log_summary(&cfg);

    if cli.check_config {
        info!("Configuration OK");
        return;
    }

    let fetcher: Arc<dyn SurfFetcher> = match HttpSurfFetcher::from_config(&cfg) {
        Ok(f) => Arc::new(f),
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let ttl = Duration::from_secs(cfg.cache.ttl_secs);

    let scheduler = Arc::new(RefreshScheduler::new(
        fetcher.clone(),
        cache.clone(),
        cfg.locations.clone(),
        ttl,
        Duration::from_secs(cfg.timing.refresh_interval_secs),
    ));

    if cli.once {
        let summary = scheduler.run_cycle().await;
        log_cached_readings(&cfg, cache.as_ref()).await;
        if summary.updated == 0 {
            error!("No location could be refreshed");
            std::process::exit(1);
        }
        return;
    }

    let registry: Arc<dyn LampRegistry> = Arc::new(StaticRegistry::from_config(&cfg));
    let service = Arc::new(LampConfigService::from_config(
        &cfg,
        registry,
        cache.clone(),
        fetcher.clone(),
    ));
    let state = Arc::new(AppState::new(
        service,
        cache.clone(),
        fetcher.clone(),
        env!("CARGO_PKG_VERSION"),
    ));

    // Task 1: Refresh scheduler
    let scheduler_handle = scheduler.clone().spawn();

    // Task 2: Heartbeat
    let hb_scheduler = scheduler.clone();
    let hb_cache = cache.clone();
    let hb_interval = Duration::from_secs(cfg.timing.heartbeat_interval_secs);
    let heartbeat_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(hb_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            info!(
                "HEARTBEAT: cached={} scheduler={} refresh={}s",
                hb_cache.entry_count(),
                hb_scheduler.state().label(),
                hb_scheduler.interval().as_secs()
            );
        }
    });

    // Task 3: HTTP server (returns on Ctrl+C / SIGTERM)
    let app = lamp_api::router(state);
    let bind_addr = cfg.server.bind_addr.clone();
    let server_handle = tokio::spawn(async move { lamp_api::serve(&bind_addr, app).await });

    info!("Surf lamp service is running. Press Ctrl+C to stop.");

    let exit_code = tokio::select! {
        r = server_handle => match r {
            Ok(Ok(())) => 0,
            Ok(Err(e)) => {
                error!("HTTP server failed: {}", e);
                1
            }
            Err(e) => {
                error!("HTTP server task panicked: {:?}", e);
                1
            }
        },
        r = scheduler_handle => {
            error!("Scheduler task exited: {:?}", r);
            1
        }
        r = heartbeat_handle => {
            error!("Heartbeat task exited: {:?}", r);
            1
        }
    };

    info!("Surf lamp service shut down.");
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
