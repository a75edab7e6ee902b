//! The liveness signal read by the frame publisher.

use serde::{Deserialize, Serialize};
use visage_core::{PoseNode, GAZE_X, GAZE_Y, LEFT_EYE_OPENNESS, RIGHT_EYE_OPENNESS};

/// Blink and micro-saccade state, held constant between maintenance ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LivenessState {
    /// 1.0 with eyes open, 0.0 for the duration of a blink
    pub blink_scale: f64,
    pub jitter_x: f64,
    pub jitter_y: f64,
}

impl Default for LivenessState {
    fn default() -> Self {
        Self {
            blink_scale: 1.0,
            jitter_x: 0.0,
            jitter_y: 0.0,
        }
    }
}

impl LivenessState {
    pub fn is_blinking(&self) -> bool {
        self.blink_scale == 0.0
    }

    /// Layer liveness onto a composed pose: jitter shifts the gaze, the blink
    /// scale multiplies both eyes' openness.
    pub fn apply(&self, pose: &mut PoseNode) {
        for (path, delta) in [(GAZE_X, self.jitter_x), (GAZE_Y, self.jitter_y)] {
            if let Err(e) = pose.add_at(path, delta) {
                tracing::trace!("liveness jitter skipped: {}", e);
            }
        }
        pose.scale_at(LEFT_EYE_OPENNESS, self.blink_scale);
        pose.scale_at(RIGHT_EYE_OPENNESS, self.blink_scale);
    }
}
