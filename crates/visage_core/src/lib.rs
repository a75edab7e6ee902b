//! # Visage Core
//!
//! Shared vocabulary for the face compositor: pose and motion trees, the
//! preset catalog, configuration, and the task registry every background
//! loop is spawned through.

pub mod config;
pub mod motion;
pub mod pose;
pub mod preset;
pub mod tasks;

pub use config::{
    GatewayConfig, ImpulseConfig, LinkConfig, LivenessConfig, RenderConfig, VisageConfig,
};
pub use motion::{MotionNode, MotionSpec, Wave, TREMOR_KEY};
pub use pose::{
    Pose, PoseError, PoseNode, GAZE_X, GAZE_Y, LEFT_EYE_OPENNESS, RIGHT_EYE_OPENNESS,
};
pub use preset::{CatalogError, ExpressionPreset, PresetCatalog, DEFAULT_ACCENT, NEUTRAL_ID};
pub use tasks::TaskRegistry;

use serde::{Deserialize, Serialize};

/// What happened to a pushed impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    /// A new impulse was started.
    Created,
    /// An impulse for the same preset was already running; its weight became
    /// the max of both and its decay restarted.
    Merged,
    /// The preset id is not in the catalog. Nothing changed.
    UnknownPreset,
    /// The weight was not a finite number. Nothing changed.
    Rejected,
}

impl PushOutcome {
    pub fn applied(self) -> bool {
        matches!(self, PushOutcome::Created | PushOutcome::Merged)
    }
}

/// Anything that accepts emotion impulses.
///
/// Event ingestion talks to the compositor only through this seam, so it can
/// enqueue impulses without ever reaching composited state.
pub trait ImpulseSink: Send + Sync {
    /// `None` for weight or duration means the configured default.
    fn push_impulse(&self, preset_id: &str, weight: Option<f64>, duration: Option<f64>)
        -> PushOutcome;
}

impl<T: ImpulseSink + ?Sized> ImpulseSink for std::sync::Arc<T> {
    fn push_impulse(
        &self,
        preset_id: &str,
        weight: Option<f64>,
        duration: Option<f64>,
    ) -> PushOutcome {
        (**self).push_impulse(preset_id, weight, duration)
    }
}
