// # shushd - Shush Daemon
//
// Thin integration layer: all geofence and transition logic lives in
// shush-core.
//
// The shushd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring simulated platform collaborators into the engine
// 4. Feeding newline-delimited JSON platform events from stdin to the engine
// 5. Stopping the engine on SIGTERM/SIGINT or when stdin ends
//
// ## Configuration
//
// - `SHUSH_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `SHUSH_PLACES_FILE`: JSON array of places (default: no places)
// - `SHUSH_GEOFENCE_RADIUS_METERS`: Geofence radius (default: 75)
// - `SHUSH_GEOFENCE_EXPIRATION_MS`: Geofence lifetime (default: 86400000)
// - `SHUSH_GEOFENCING_ENABLED`: Register geofences at all (default: true)
// - `SHUSH_LOCATION_GRANTED`: Location access held at startup (default: false)
// - `SHUSH_AUDIO_POLICY_GRANTED`: Ringer changes permitted (default: true)
//
// ## Example
//
// ```bash
// export SHUSH_PLACES_FILE=/etc/shush/places.json
// export SHUSH_LOCATION_GRANTED=true
// printf '%s\n' \
//   '{"type":"connected"}' \
//   '{"type":"transition","transition":1,"region_ids":["home"]}' | shushd
// ```

mod simulated;

use anyhow::{Context, Result};
use shush_core::engine::{Collaborators, PlatformEvent, ShushEngine};
use shush_core::traits::{PlaceSource, StaticAudioPolicy};
use shush_core::{CallbackTarget, JsonFilePlaceSource, ShushConfig, StaticPlaceSource};
use simulated::{FlagLocationAuthorization, LoggingNotifier, LoggingRegionMonitor, LoggingRinger};
use std::env;
use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ShushExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<ShushExitCode> for ExitCode {
    fn from(code: ShushExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    log_level: String,
    places_file: Option<String>,
    location_granted: bool,
    audio_policy_granted: bool,
    shush: ShushConfig,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mut shush = ShushConfig::default();

        if let Ok(radius) = env::var("SHUSH_GEOFENCE_RADIUS_METERS") {
            shush.geofence.radius_meters = radius
                .parse()
                .with_context(|| format!("SHUSH_GEOFENCE_RADIUS_METERS is not a number: {}", radius))?;
        }
        if let Ok(expiration) = env::var("SHUSH_GEOFENCE_EXPIRATION_MS") {
            shush.geofence.expiration_ms = expiration.parse().with_context(|| {
                format!("SHUSH_GEOFENCE_EXPIRATION_MS is not an integer: {}", expiration)
            })?;
        }
        shush.engine.geofencing_enabled = env_flag("SHUSH_GEOFENCING_ENABLED", true)?;

        Ok(Self {
            log_level: env::var("SHUSH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            places_file: env::var("SHUSH_PLACES_FILE").ok().filter(|p| !p.is_empty()),
            location_granted: env_flag("SHUSH_LOCATION_GRANTED", false)?,
            audio_policy_granted: env_flag("SHUSH_AUDIO_POLICY_GRANTED", true)?,
            shush,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SHUSH_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        if let Some(ref path) = self.places_file
            && !std::path::Path::new(path).exists()
        {
            // Not fatal: a missing file means no places yet
            eprintln!("WARNING: SHUSH_PLACES_FILE does not exist yet: {}", path);
        }

        self.shush.validate()?;
        Ok(())
    }
}

/// Read a boolean environment variable
fn env_flag(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => parse_flag(name, &value),
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be a boolean (true/false). Got: {}", name, value),
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ShushExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ShushExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ShushExitCode::ConfigError.into();
    }

    info!("Starting shushd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ShushExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            ShushExitCode::RuntimeError
        } else {
            ShushExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let connected = Arc::new(AtomicBool::new(false));
    let location_granted = Arc::new(AtomicBool::new(config.location_granted));

    let places: Arc<dyn PlaceSource> = match &config.places_file {
        Some(path) => {
            info!("Reading places from {}", path);
            Arc::new(JsonFilePlaceSource::new(path))
        }
        None => {
            warn!("SHUSH_PLACES_FILE not set, no geofences will be registered");
            Arc::new(StaticPlaceSource::default())
        }
    };

    let collaborators = Collaborators {
        monitor: Arc::new(LoggingRegionMonitor::new(Arc::clone(&connected))),
        location: Arc::new(FlagLocationAuthorization::new(Arc::clone(&location_granted))),
        audio_policy: Arc::new(StaticAudioPolicy::new(config.audio_policy_granted)),
        ringer: Arc::new(LoggingRinger),
        notifier: Arc::new(LoggingNotifier),
        places,
    };

    let (mut engine, mut engine_events) =
        ShushEngine::new(collaborators, CallbackTarget::default(), config.shush)?;

    tokio::spawn(async move {
        while let Some(event) = engine_events.recv().await {
            info!("engine: {:?}", event);
        }
    });

    let signal = shutdown_signal()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let name = signal.await;
        info!("Received shutdown signal: {}", name);
        let _ = shutdown_tx.send(());
    });

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(read_platform_events(tx, connected, location_granted));

    info!("Reading platform events from stdin");
    engine
        .run_with_shutdown(ReceiverStream::new(rx), Some(shutdown_rx))
        .await?;

    info!("Shutting down shushd");
    Ok(())
}

/// Resolve with the name of the first shutdown signal (SIGTERM, SIGINT)
///
/// Handlers are installed before this returns, so a signal arriving while
/// the engine starts up is not missed.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str> + Send> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Resolve on Ctrl-C
///
/// Fallback for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str> + Send> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    })
}

/// Forward stdin events to the engine
///
/// Connection and authorization events also update the simulated platform
/// state the collaborators report, as a real platform would.
async fn read_platform_events(
    tx: mpsc::Sender<PlatformEvent>,
    connected: Arc<AtomicBool>,
    location_granted: Arc<AtomicBool>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let event: PlatformEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!("Ignoring malformed event {:?}: {}", line, e);
                continue;
            }
        };

        match &event {
            PlatformEvent::Connected => connected.store(true, Ordering::SeqCst),
            PlatformEvent::ConnectionSuspended { .. } | PlatformEvent::ConnectionFailed { .. } => {
                connected.store(false, Ordering::SeqCst)
            }
            PlatformEvent::AuthorizationResult { granted, .. } => {
                location_granted.store(*granted, Ordering::SeqCst)
            }
            _ => {}
        }

        if tx.send(event).await.is_err() {
            break;
        }
    }
}
