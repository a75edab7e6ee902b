//! Emotion impulse scheduler
//!
//! Owns every piece of state the outside world may change: the set of active
//! impulses, the manual baseline and the selection marker. Network ingestion
//! and manual control only ever call into here; composing and publishing is
//! left to the render tick.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use visage_core::{ImpulseConfig, Pose, PoseError, PresetCatalog, PushOutcome};

/// Weights at or below this count as expired. Absorbs the rounding left over
/// after summing many small decay steps.
const EXPIRY_EPSILON: f64 = 1e-9;

/// Baseline path that carries the accent color instead of a number.
pub const COLOR_PATH: &str = "color";

/// A decaying emotional signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveImpulse {
    pub preset_id: String,
    /// In `[0, 1]`.
    pub weight: f64,
    /// Weight lost per second: `1 / duration`.
    pub decay_rate: f64,
    /// Scheduler clock (seconds) at creation or last merge.
    pub last_touched_at: f64,
}

impl ActiveImpulse {
    /// Seconds until the weight reaches zero at the current decay rate.
    pub fn remaining(&self) -> f64 {
        if self.decay_rate > 0.0 {
            self.weight / self.decay_rate
        } else {
            f64::INFINITY
        }
    }
}

/// A value written into the manual baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManualValue {
    Number(f64),
    Text(String),
}

impl From<f64> for ManualValue {
    fn from(v: f64) -> Self {
        ManualValue::Number(v)
    }
}

/// Everything the render tick needs, copied out under the lock.
#[derive(Debug, Clone)]
pub struct ControlSnapshot {
    pub baseline: Pose,
    pub impulses: Vec<ActiveImpulse>,
    pub selection: String,
    pub displayed: String,
}

pub struct ImpulseScheduler {
    catalog: Arc<PresetCatalog>,
    defaults: ImpulseConfig,
    /// Creation order; composition and color tie-breaks depend on it.
    impulses: Vec<ActiveImpulse>,
    baseline: Pose,
    selection: String,
    /// Most recent preset shown to observers, by push or by selection.
    displayed: String,
    clock: f64,
}

impl ImpulseScheduler {
    /// Starts at the catalog's resting preset with no impulses.
    pub fn new(catalog: Arc<PresetCatalog>, defaults: ImpulseConfig) -> Self {
        let resting = catalog.resting();
        let baseline = resting.pose();
        let selection = resting.id.clone();
        Self {
            catalog,
            defaults,
            impulses: Vec::new(),
            baseline,
            displayed: selection.clone(),
            selection,
            clock: 0.0,
        }
    }

    /// Start or refresh an impulse.
    ///
    /// A repeat push for a running preset keeps the larger of the two weights
    /// and restarts decay from the new duration; it never adds a second entry.
    pub fn push_impulse(
        &mut self,
        preset_id: &str,
        weight: Option<f64>,
        duration: Option<f64>,
    ) -> PushOutcome {
        if !self.catalog.contains(preset_id) {
            tracing::warn!("Unknown preset '{}', impulse ignored", preset_id);
            return PushOutcome::UnknownPreset;
        }

        let weight = weight.unwrap_or(self.defaults.default_weight);
        if !weight.is_finite() {
            tracing::warn!("Impulse '{}' has non-finite weight, ignored", preset_id);
            return PushOutcome::Rejected;
        }
        let weight = weight.clamp(0.0, 1.0);
        let decay_rate = 1.0 / self.resolve_duration(preset_id, duration);

        self.displayed = preset_id.to_string();

        if let Some(existing) = self.impulses.iter_mut().find(|i| i.preset_id == preset_id) {
            existing.weight = existing.weight.max(weight);
            existing.decay_rate = decay_rate;
            existing.last_touched_at = self.clock;
            tracing::debug!(
                "Merged impulse '{}' (w={:.2}, rate={:.3}/s)",
                preset_id,
                existing.weight,
                decay_rate
            );
            return PushOutcome::Merged;
        }

        tracing::debug!(
            "New impulse '{}' (w={:.2}, rate={:.3}/s)",
            preset_id,
            weight,
            decay_rate
        );
        self.impulses.push(ActiveImpulse {
            preset_id: preset_id.to_string(),
            weight,
            decay_rate,
            last_touched_at: self.clock,
        });
        PushOutcome::Created
    }

    fn resolve_duration(&self, preset_id: &str, duration: Option<f64>) -> f64 {
        let fallback = if self.defaults.default_duration_secs > 0.0 {
            self.defaults.default_duration_secs
        } else {
            ImpulseConfig::default().default_duration_secs
        };
        match duration {
            Some(d) if d.is_finite() && d > 0.0 => d,
            Some(d) => {
                tracing::warn!(
                    "Impulse '{}' has invalid duration {}, using {}s",
                    preset_id,
                    d,
                    fallback
                );
                fallback
            }
            None => fallback,
        }
    }

    /// Replace the baseline with a copy of the preset and drop every impulse.
    /// Returns false (and changes nothing) for an unknown id.
    pub fn select_preset(&mut self, preset_id: &str) -> bool {
        let Some(preset) = self.catalog.lookup(preset_id) else {
            tracing::warn!("Unknown preset '{}', selection ignored", preset_id);
            return false;
        };
        self.baseline = preset.pose();
        self.selection = preset.id.clone();
        self.displayed = preset.id.clone();
        self.impulses.clear();
        tracing::info!("Selected preset '{}'", preset_id);
        true
    }

    /// Write one value into the baseline. Impulses and selection are untouched.
    pub fn set_manual_parameter(&mut self, path: &str, value: ManualValue) -> Result<(), PoseError> {
        match (path, value) {
            (COLOR_PATH, ManualValue::Text(color)) => {
                self.baseline.color = Some(color);
                Ok(())
            }
            (COLOR_PATH, ManualValue::Number(_)) => Err(PoseError::ExpectedColor),
            (path, ManualValue::Number(v)) => self.baseline.tree.set(path, v),
            (path, ManualValue::Text(_)) => Err(PoseError::ExpectedNumber(path.to_string())),
        }
    }

    /// Decay every impulse by `dt` seconds and drop the expired ones.
    pub fn tick(&mut self, dt: f64) {
        let dt = dt.max(0.0);
        self.clock += dt;
        for impulse in &mut self.impulses {
            impulse.weight -= impulse.decay_rate * dt;
        }
        self.impulses.retain(|impulse| {
            let alive = impulse.weight > EXPIRY_EPSILON;
            if !alive {
                tracing::debug!("Impulse '{}' expired", impulse.preset_id);
            }
            alive
        });
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            baseline: self.baseline.clone(),
            impulses: self.impulses.clone(),
            selection: self.selection.clone(),
            displayed: self.displayed.clone(),
        }
    }

    pub fn impulses(&self) -> &[ActiveImpulse] {
        &self.impulses
    }

    pub fn impulse(&self, preset_id: &str) -> Option<&ActiveImpulse> {
        self.impulses.iter().find(|i| i.preset_id == preset_id)
    }

    pub fn baseline(&self) -> &Pose {
        &self.baseline
    }

    pub fn selection(&self) -> &str {
        &self.selection
    }

    pub fn displayed(&self) -> &str {
        &self.displayed
    }

    /// Seconds of decay applied so far.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn catalog(&self) -> &Arc<PresetCatalog> {
        &self.catalog
    }
}
