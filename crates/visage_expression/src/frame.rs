//! Render frames and their publisher
//!
//! A frame is built once per render tick and then shared read-only behind an
//! `Arc`. Readers either poll the latest frame or subscribe to the watch
//! channel and wake on every publish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use visage_core::PoseNode;
use visage_liveness::LivenessState;

/// Fully composed snapshot handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrame {
    /// 0 for the placeholder published before the first tick.
    pub sequence: u64,
    /// Seconds since the engine started.
    pub elapsed: f64,
    pub pose: PoseNode,
    pub color: String,
    /// Preset most recently pushed or selected.
    pub preset_id: String,
    pub published_at: DateTime<Utc>,
}

impl RenderFrame {
    /// Frame shown before the render loop has ticked.
    pub fn initial(pose: PoseNode, color: String, preset_id: String) -> Self {
        Self {
            sequence: 0,
            elapsed: 0.0,
            pose,
            color,
            preset_id,
            published_at: Utc::now(),
        }
    }
}

/// Sole writer of [`RenderFrame`]s.
#[derive(Debug)]
pub struct FramePublisher {
    tx: watch::Sender<Arc<RenderFrame>>,
    sequence: u64,
}

impl FramePublisher {
    pub fn new(initial: RenderFrame) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx, sequence: 0 }
    }

    /// Merge smoothed pose, motion offsets and liveness into a frame and
    /// publish it. Publishing never fails, even with no subscribers.
    pub fn emit(
        &mut self,
        smoothed: &PoseNode,
        offsets: &PoseNode,
        liveness: LivenessState,
        color: String,
        preset_id: String,
        elapsed: f64,
    ) -> Arc<RenderFrame> {
        let mut pose = smoothed.clone();
        pose.add_scaled(offsets, 1.0);
        liveness.apply(&mut pose);

        self.sequence += 1;
        let frame = Arc::new(RenderFrame {
            sequence: self.sequence,
            elapsed,
            pose,
            color,
            preset_id,
            published_at: Utc::now(),
        });
        self.tx.send_replace(Arc::clone(&frame));
        frame
    }

    pub fn latest(&self) -> Arc<RenderFrame> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RenderFrame>> {
        self.tx.subscribe()
    }

    /// Frames published so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}
