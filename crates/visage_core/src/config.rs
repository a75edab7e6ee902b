use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VisageConfig {
    pub render: RenderConfig,
    pub impulse: ImpulseConfig,
    pub liveness: LivenessConfig,
    pub link: Option<LinkConfig>,
    pub gateway: GatewayConfig,
    /// JSON preset catalog to load instead of the built-in set.
    pub catalog_path: Option<String>,
    /// Seed for the motion/liveness random sources. Unset means entropy.
    pub seed: Option<u64>,
}

impl VisageConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: VisageConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("VISAGE_WS_URL") {
            match self.link.as_mut() {
                Some(link) => link.ws_url = url,
                None => self.link = Some(LinkConfig::new(url)),
            }
        }
        if let Ok(v) = std::env::var("VISAGE_GATEWAY_HOST") {
            self.gateway.host = v;
        }
        if let Ok(v) = std::env::var("VISAGE_GATEWAY_PORT") {
            if let Ok(n) = v.parse() {
                self.gateway.port = n;
            }
        }
        if let Ok(v) = std::env::var("VISAGE_CATALOG") {
            self.catalog_path = Some(v);
        }
        if let Ok(v) = std::env::var("VISAGE_SEED") {
            if let Ok(n) = v.parse() {
                self.seed = Some(n);
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Render ticks per second.
    pub fps: u32,
    /// Exponential smoothing rate: the visible pose moves `rate * dt` of the
    /// way to the target each tick.
    pub smoothing_rate: f64,
    /// Weight at which the selected preset's motion spec is always applied.
    pub selection_motion_weight: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            smoothing_rate: 5.0,
            selection_motion_weight: 0.5,
        }
    }
}

impl RenderConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImpulseConfig {
    pub default_weight: f64,
    pub default_duration_secs: f64,
}

impl Default for ImpulseConfig {
    fn default() -> Self {
        Self {
            default_weight: 1.0,
            default_duration_secs: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub interval_ms: u64,
    pub blink_probability: f64,
    pub blink_hold_ms: u64,
    /// Jitter is drawn uniformly from `[-jitter_range, jitter_range]`.
    pub jitter_range: f64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            blink_probability: 0.05,
            blink_hold_ms: 150,
            jitter_range: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub ws_url: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_ledger_capacity")]
    pub ledger_capacity: usize,
    #[serde(default = "default_ledger_retain")]
    pub ledger_retain: usize,
}

impl LinkConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            ledger_capacity: default_ledger_capacity(),
            ledger_retain: default_ledger_retain(),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_ledger_capacity() -> usize {
    200
}

fn default_ledger_retain() -> usize {
    50
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8765,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
