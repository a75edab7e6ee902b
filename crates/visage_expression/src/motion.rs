//! Procedural motion overlay
//!
//! Offsets are rebuilt from scratch every tick from absolute elapsed time, so
//! wave phase does not drift with frame rate. They are added after smoothing
//! and may jump from one frame to the next.

use crate::scheduler::ActiveImpulse;
use rand::Rng;
use visage_core::{MotionSpec, PoseNode, PresetCatalog, GAZE_X, GAZE_Y};

/// Weight the selected preset's motion always contributes with.
pub const SELECTION_MOTION_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct MotionOverlay {
    selection_weight: f64,
}

impl Default for MotionOverlay {
    fn default() -> Self {
        Self::new(SELECTION_MOTION_WEIGHT)
    }
}

impl MotionOverlay {
    pub fn new(selection_weight: f64) -> Self {
        Self { selection_weight }
    }

    /// Offset tree for elapsed time `t`.
    ///
    /// The selected preset contributes at the fixed selection weight and
    /// every active impulse at its own weight. Each contributor with a tremor
    /// draws one fresh value and adds it to both gaze axes.
    pub fn offsets<R: Rng + ?Sized>(
        &self,
        catalog: &PresetCatalog,
        selection: &str,
        impulses: &[ActiveImpulse],
        t: f64,
        rng: &mut R,
    ) -> PoseNode {
        let mut out = PoseNode::group();

        let selected = catalog
            .lookup(selection)
            .map(|p| (&p.motion_spec, self.selection_weight));
        let active = impulses.iter().filter_map(|impulse| {
            catalog
                .lookup(&impulse.preset_id)
                .map(|p| (&p.motion_spec, impulse.weight))
        });

        for (spec, weight) in selected.into_iter().chain(active) {
            add_motion(&mut out, spec, t, weight, rng);
        }
        out
    }
}

fn add_motion<R: Rng + ?Sized>(
    out: &mut PoseNode,
    spec: &MotionSpec,
    t: f64,
    weight: f64,
    rng: &mut R,
) {
    spec.sample_into(out, t, weight);

    if let Some(tremor) = spec.tremor() {
        let shake = rng.gen_range(-0.5..=0.5) * tremor.amplitude * weight;
        for axis in [GAZE_X, GAZE_Y] {
            if let Err(e) = out.add_at(axis, shake) {
                tracing::debug!("tremor skipped on '{}': {}", axis, e);
            }
        }
    }
}
