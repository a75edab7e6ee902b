use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visage_core::{LinkConfig, PresetCatalog, VisageConfig};
use visage_expression::FaceEngine;

#[derive(Parser, Debug)]
#[command(name = "visage", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "VISAGE_CONFIG", default_value = "visage.toml")]
    config: String,

    /// Event source WebSocket URL (overrides [link].ws_url)
    #[arg(long, env = "VISAGE_WS_URL")]
    ws_url: Option<String>,

    /// Gateway bind host
    #[arg(long, env = "VISAGE_GATEWAY_HOST")]
    host: Option<String>,

    /// Gateway bind port
    #[arg(short, long, env = "VISAGE_GATEWAY_PORT")]
    port: Option<u16>,

    /// Do not start the HTTP gateway
    #[arg(long)]
    no_gateway: bool,

    /// Seed for motion and liveness randomness
    #[arg(long, env = "VISAGE_SEED")]
    seed: Option<u64>,
}

impl Args {
    /// Command-line flags win over file and env config.
    fn apply(&self, config: &mut VisageConfig) {
        if let Some(url) = &self.ws_url {
            match config.link.as_mut() {
                Some(link) => link.ws_url = url.clone(),
                None => config.link = Some(LinkConfig::new(url.clone())),
            }
        }
        if let Some(host) = &self.host {
            config.gateway.host = host.clone();
        }
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if self.no_gateway {
            config.gateway.enabled = false;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_catalog(config: &VisageConfig) -> Result<PresetCatalog> {
    match &config.catalog_path {
        Some(path) => PresetCatalog::load(path)
            .with_context(|| format!("Failed to load preset catalog from {}", path)),
        None => PresetCatalog::builtin().context("Built-in preset catalog is invalid"),
    }
}

#[cfg(feature = "link")]
fn start_link(engine: &FaceEngine, config: &VisageConfig) -> Result<()> {
    use visage_link::{EventLink, WsSource};

    let Some(link_config) = &config.link else {
        info!("No event source configured; running on manual control only");
        return Ok(());
    };
    let source = WsSource::new(&link_config.ws_url)?;
    let link = EventLink::new(source, engine.handle(), link_config);
    engine.tasks().spawn("event-link", link.run());
    Ok(())
}

#[cfg(feature = "gateway")]
fn start_gateway(engine: &FaceEngine, config: &VisageConfig) {
    use visage_gateway::GatewayServer;

    if !config.gateway.enabled {
        info!("Gateway disabled");
        return;
    }
    let server = GatewayServer::new(engine.handle(), &config.gateway.host, config.gateway.port);
    engine.tasks().spawn("gateway", async move {
        if let Err(e) = server.serve().await {
            tracing::error!("{:#}", e);
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = VisageConfig::load_or_default(&args.config);
    args.apply(&mut config);

    let catalog = Arc::new(load_catalog(&config)?);
    info!("Initializing Visage with {} presets...", catalog.len());

    let mut engine = FaceEngine::new(catalog, &config);
    engine.start();

    #[cfg(feature = "link")]
    start_link(&engine, &config)?;

    #[cfg(feature = "gateway")]
    start_gateway(&engine, &config);

    info!("Visage online. Press Ctrl-C to exit.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    engine.shutdown();
    Ok(())
}
