//! WSM Simulator - Main Entry Point
//!
//! Starts one publisher per enabled telemetry kind and runs until SIGINT or SIGTERM.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use wsm_simulator::config::SimulatorConfig;
use wsm_simulator::observability::{health::HealthServer, init_default_logging, metrics::metrics};
use wsm_simulator::publisher::{Publisher, PublisherHandle, PublisherSettings};
use wsm_simulator::store::{DocumentStore, EntitySampler, MemoryStore};
use wsm_simulator::telemetry::{source_for, TelemetryKind};
use wsm_simulator::transport::mqtt::MqttClient;

/// Simulated water and chemical management telemetry over MQTT
#[derive(Parser)]
#[command(name = "wsm-simulator")]
#[command(about = "Publishes simulated chemical, pump and water usage readings over MQTT")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the configured broker URL
    #[arg(long, env = "WSM_BROKER_URL", value_name = "URL")]
    broker_url: Option<String>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every enabled publisher
    Run,
    /// Validate configuration
    Config {
        /// Show the resolved configuration
        #[arg(long)]
        show: bool,
    },
    /// Build readings from the store and print them without a broker
    Preview {
        /// Telemetry kind (chemical_usage, water_pump_usage, water_usage)
        #[arg(long)]
        kind: TelemetryKind,
        /// Number of readings to build
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose > 0 && std::env::var("LOG_LEVEL").is_err() {
        let level = if cli.verbose > 1 { "trace" } else { "debug" };
        std::env::set_var("LOG_LEVEL", level);
    }
    init_default_logging();

    info!("Starting WSM Simulator v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config, cli.broker_url) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_simulator(config).await,
        Commands::Config { show } => handle_config_command(config, show),
        Commands::Preview { kind, count } => preview_readings(config, kind, count).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(
    config_path: &Option<PathBuf>,
    broker_url: Option<String>,
) -> Result<SimulatorConfig, Box<dyn std::error::Error>> {
    let path = match config_path {
        Some(path) => path.clone(),
        None => {
            let default_paths = ["simulator.toml", "config/simulator.toml"];

            match default_paths.iter().map(PathBuf::from).find(|p| p.exists()) {
                Some(path) => path,
                None => {
                    error!(
                        "No configuration file found. Please provide one with -c/--config or create simulator.toml"
                    );
                    process::exit(1);
                }
            }
        }
    };

    info!("Loading configuration from: {}", path.display());
    let mut config = SimulatorConfig::load_from_file(&path)?;

    if let Some(url) = broker_url {
        info!(broker_url = %url, "Overriding broker URL");
        config.mqtt.broker_url = url;
        config.validate()?;
    }

    Ok(config)
}

fn open_store(config: &SimulatorConfig) -> Result<Arc<dyn DocumentStore>, Box<dyn std::error::Error>> {
    info!("Loading document store from: {}", config.store.path.display());
    let store = MemoryStore::load_from_file(&config.store.path)?;
    for collection in [
        &config.store.chemical_collection,
        &config.store.equipment_collection,
        &config.store.user_collection,
    ] {
        info!(collection = %collection, documents = store.count(collection), "Collection loaded");
    }
    Ok(Arc::new(store))
}

async fn run_simulator(config: SimulatorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let kinds = config.enabled_kinds();
    if kinds.is_empty() {
        warn!("Every telemetry kind is disabled, nothing to publish");
        return Ok(());
    }

    let sampler = EntitySampler::new(open_store(&config)?);

    let mut handles: Vec<PublisherHandle> = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let transport = Arc::new(MqttClient::new(kind.client_id(), config.mqtt.clone())?);
        let source = source_for(
            kind,
            sampler.clone(),
            config.distribution(kind).clone(),
            &config.store,
        );
        let settings = PublisherSettings::from_config(kind, &config);
        handles.push(Publisher::new(settings, transport, source).start());
    }

    if let Some(http) = &config.http {
        let server = handles.iter().fold(HealthServer::new(http.port), |server, handle| {
            server.watch_publisher(handle.kind(), handle.state_receiver())
        });
        tokio::spawn(Arc::new(server).start());
    }

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    info!(publishers = handles.len(), "Simulator is running");

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }

    for handle in handles {
        let kind = handle.kind();
        if let Err(e) = handle.stop().await {
            error!(kind = %kind, "Error during shutdown: {}", e);
        }
    }

    let snapshot = metrics().get_metrics();
    info!(
        readings_published = snapshot.readings_published,
        publish_failures = snapshot.publish_failures,
        uptime_seconds = snapshot.uptime_seconds,
        "Publishers stopped"
    );
    Ok(())
}

fn handle_config_command(
    config: SimulatorConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!(
        enabled = ?config.enabled_kinds(),
        "Configuration validation complete"
    );
    Ok(())
}

async fn preview_readings(
    config: SimulatorConfig,
    kind: TelemetryKind,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let sampler = EntitySampler::new(open_store(&config)?);
    let mut source = source_for(kind, sampler, config.distribution(kind).clone(), &config.store);

    for _ in 0..count {
        match source.next_reading().await? {
            Some(reading) => {
                let payload = reading.to_payload()?;
                println!("{} {}", reading.topic(), String::from_utf8_lossy(&payload));
            }
            None => println!("{} <no matching entity>", kind.topic()),
        }
    }
    Ok(())
}
