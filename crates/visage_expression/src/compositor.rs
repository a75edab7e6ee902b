//! Pose compositor
//!
//! Turns the manual baseline plus the active impulses into one target pose per
//! tick, resolves the accent color, and eases the visible pose toward the
//! target. The visible pose lives here and nowhere else; only the render tick
//! holds a `Compositor`.

use crate::scheduler::ActiveImpulse;
use visage_core::{Pose, PoseNode, PresetCatalog};

/// Weight left over for the baseline once impulses take their share.
pub fn base_weight(impulses: &[ActiveImpulse]) -> f64 {
    let total: f64 = impulses.iter().map(|i| i.weight).sum();
    1.0 - total.min(1.0)
}

/// Weighted linear blend of the baseline and every impulse's preset pose.
///
/// Impulses are summed in creation order; fields from simultaneous impulses
/// add up rather than override each other.
pub fn blend(catalog: &PresetCatalog, baseline: &Pose, impulses: &[ActiveImpulse]) -> PoseNode {
    let mut target = baseline.tree.scaled(base_weight(impulses));
    for impulse in impulses {
        if let Some(preset) = catalog.lookup(&impulse.preset_id) {
            target.add_scaled(&preset.base_pose, impulse.weight);
        }
    }
    target
}

/// Accent color for the frame.
///
/// The colored impulse with the strictly greatest weight wins, so on a tie the
/// earlier impulse keeps it. Without any colored impulse the baseline color is
/// used, then the catalog's neutral color.
pub fn resolve_color(catalog: &PresetCatalog, baseline: &Pose, impulses: &[ActiveImpulse]) -> String {
    let mut dominant: Option<(f64, &str)> = None;
    for impulse in impulses {
        let Some(color) = catalog
            .lookup(&impulse.preset_id)
            .and_then(|p| p.color.as_deref())
        else {
            continue;
        };
        match dominant {
            Some((weight, _)) if impulse.weight <= weight => {}
            _ => dominant = Some((impulse.weight, color)),
        }
    }

    match dominant {
        Some((_, color)) => color.to_string(),
        None => baseline
            .color
            .clone()
            .unwrap_or_else(|| catalog.neutral_color().to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct Compositor {
    smoothing_rate: f64,
    current: PoseNode,
}

impl Compositor {
    /// `initial` is the pose shown before the first smoothing step.
    pub fn new(smoothing_rate: f64, initial: PoseNode) -> Self {
        Self {
            smoothing_rate,
            current: initial,
        }
    }

    /// `current += (target - current) * smoothing_rate * dt`.
    ///
    /// The factor is not clamped: a `dt` longer than `1 / smoothing_rate`
    /// overshoots the target.
    pub fn smooth(&mut self, target: &PoseNode, dt: f64) -> &PoseNode {
        self.current.lerp_toward(target, self.smoothing_rate * dt);
        &self.current
    }

    pub fn current(&self) -> &PoseNode {
        &self.current
    }

    pub fn smoothing_rate(&self) -> f64 {
        self.smoothing_rate
    }
}
