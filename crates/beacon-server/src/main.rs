use anyhow::Result;
use beacon_alert::Scheduler;
use beacon_notify::plugin::ChannelRegistry;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use beacon_server::app;
use beacon_server::channel_seed;
use beacon_server::config::ServerConfig;
use beacon_server::rule_seed;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  beacon-server [config.toml]                              Start the alert engine");
    eprintln!("  beacon-server init-channels <config.toml> <seed.json>    Upsert notification channels from seed file");
    eprintln!("  beacon-server init-rules <config.toml> <seed.json>       Upsert alert rules from seed file");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("beacon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some(cmd @ ("init-channels" | "init-rules")) => {
            let (Some(config_path), Some(seed_path)) = (args.get(2), args.get(3)) else {
                print_usage();
                anyhow::bail!("{cmd} requires <config.toml> and <seed.json> arguments");
            };
            if cmd == "init-channels" {
                run_init_channels(config_path, seed_path).await
            } else {
                run_init_rules(config_path, seed_path).await
            }
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/beacon.toml");
            run_server(config_path).await
        }
    }
}

/// Loads the config and points the ID generator at its machine/node pair.
fn load_config(path: &str) -> Result<ServerConfig> {
    let config = ServerConfig::load(path)?;
    beacon_common::id::init(config.id.machine_id, config.id.node_id);
    Ok(config)
}

async fn run_init_channels(config_path: &str, seed_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let store = app::open_store(&config.database).await?;
    let seed = channel_seed::load_channels_seed(seed_path)?;
    let registry = ChannelRegistry::default();
    let written = channel_seed::init_channels(&store, &registry, &seed.channels).await?;
    tracing::info!(written, total = seed.channels.len(), "init-channels complete");
    Ok(())
}

async fn run_init_rules(config_path: &str, seed_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let store = app::open_store(&config.database).await?;
    let seed = rule_seed::load_rules_seed(seed_path)?;
    let written = rule_seed::init_rules_from_seed(&store, &seed).await?;
    tracing::info!(written, total = seed.rules.len(), "init-rules complete");
    Ok(())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    tracing::info!(
        config = %config_path,
        interval_secs = config.evaluation.interval_secs,
        "Starting beacon"
    );

    let app = app::build(&config).await?;
    let handle = Scheduler::start(app.engine.clone(), app.scheduler.clone()).await?;

    signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully");
    handle.stop().await;
    tracing::info!("Beacon stopped");
    Ok(())
}
