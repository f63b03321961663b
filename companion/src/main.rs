use anyhow::Context;
use app::config::{CompanionConfig, ConfigOverrides};
use app::services::CompanionServices;
use clap::Parser;
use log::{info, warn};
use std::net::IpAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use web_bridge::WebBridge;

mod app;
mod web_bridge;

#[derive(Parser)]
#[command(author, version, about = "Range test companion: live GPS and LXMF command relay over HTTP")]
struct Args {
    /// Load settings from YAML; command-line values take precedence
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<IpAddr>,
    #[arg(long)]
    port: Option<u16>,
    /// Directory shared with the LXMF-CLI range test plugin
    #[arg(long)]
    storage_dir: Option<PathBuf>,
    /// Where exported maps are copied
    #[arg(long)]
    downloads_dir: Option<PathBuf>,
    #[arg(long)]
    gps_interval_ms: Option<u64>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host,
            port: self.port,
            storage_dir: self.storage_dir.clone(),
            downloads_dir: self.downloads_dir.clone(),
            gps_interval_ms: self.gps_interval_ms,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CompanionConfig::load(path)?,
        None => CompanionConfig::default(),
    }
    .apply(args.overrides());

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: CompanionConfig) -> anyhow::Result<()> {
    log_startup(&config);

    let services = CompanionServices::from_config(&config);
    let poller = services.start_poller(&config);

    let bridge = WebBridge::new(services);
    let shutdown = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };
    bridge.serve(config.bind_address(), shutdown).await?;

    if let Some(handle) = poller {
        let stats = handle.shutdown().await;
        info!(
            "GPS ticks: {} fresh, {} unavailable, {} faulted",
            stats.fresh, stats.unavailable, stats.faulted
        );
    }
    info!("server stopped");
    Ok(())
}

fn log_startup(config: &CompanionConfig) {
    info!("rtcom - Range Test Companion");
    info!("binding http://{}", config.bind_address());
    info!("local access: http://localhost:{}", config.port);
    info!("data directory: {}", config.storage_dir.display());
    info!("GPS updates every {}ms", config.gps_interval_ms);
    info!("map refresh every {}s", config.points_refresh_secs);
    if !config.storage_dir.is_dir() {
        warn!(
            "storage directory not found: {} (is LXMF-CLI running from the expected directory?)",
            config.storage_dir.display()
        );
    }
    info!("endpoints:");
    info!("  /map                    static range test map");
    info!("  /api/current_gps        current GPS JSON");
    info!("  /api/logged_points      logged points JSON");
    info!("  /api/export_map         export map to downloads (POST)");
    info!("  /api/send_lxmf_command  relay a range test command (POST)");
}
