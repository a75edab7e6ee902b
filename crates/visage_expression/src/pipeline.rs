//! One render tick, start to finish.
//!
//! `step` is the only place a frame is composed. The control lock is held
//! just long enough to decay impulses and copy out what the tick needs;
//! blending, smoothing, motion and publishing all run on the copy.

use crate::compositor::{self, Compositor};
use crate::frame::{FramePublisher, RenderFrame};
use crate::motion::MotionOverlay;
use crate::scheduler::ImpulseScheduler;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use visage_core::PresetCatalog;
use visage_liveness::LivenessSystem;

pub struct FacePipeline {
    catalog: Arc<PresetCatalog>,
    control: Arc<Mutex<ImpulseScheduler>>,
    compositor: Compositor,
    overlay: MotionOverlay,
    liveness: LivenessSystem,
    publisher: FramePublisher,
    rng: StdRng,
}

impl FacePipeline {
    /// The visible pose starts at the scheduler's current baseline, and the
    /// placeholder frame shows it unsmoothed.
    pub fn new(
        control: Arc<Mutex<ImpulseScheduler>>,
        smoothing_rate: f64,
        overlay: MotionOverlay,
        liveness: LivenessSystem,
        rng: StdRng,
    ) -> Self {
        let (catalog, initial) = {
            let scheduler = lock(&control);
            let snapshot = scheduler.snapshot();
            let catalog = Arc::clone(scheduler.catalog());
            let color = compositor::resolve_color(&catalog, &snapshot.baseline, &[]);
            let frame = RenderFrame::initial(snapshot.baseline.tree, color, snapshot.displayed);
            (catalog, frame)
        };

        Self {
            catalog,
            control,
            compositor: Compositor::new(smoothing_rate, initial.pose.clone()),
            overlay,
            liveness,
            publisher: FramePublisher::new(initial),
            rng,
        }
    }

    /// Advance by `dt` seconds and publish the resulting frame. `elapsed` is
    /// the absolute engine time used for wave phase.
    pub fn step(&mut self, dt: f64, elapsed: f64) -> Arc<RenderFrame> {
        let snapshot = {
            let mut scheduler = lock(&self.control);
            scheduler.tick(dt);
            scheduler.snapshot()
        };

        let target = compositor::blend(&self.catalog, &snapshot.baseline, &snapshot.impulses);
        let color = compositor::resolve_color(&self.catalog, &snapshot.baseline, &snapshot.impulses);
        self.compositor.smooth(&target, dt);

        let offsets = self.overlay.offsets(
            &self.catalog,
            &snapshot.selection,
            &snapshot.impulses,
            elapsed,
            &mut self.rng,
        );

        self.publisher.emit(
            self.compositor.current(),
            &offsets,
            self.liveness.snapshot(),
            color,
            snapshot.displayed,
            elapsed,
        )
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RenderFrame>> {
        self.publisher.subscribe()
    }

    pub fn latest(&self) -> Arc<RenderFrame> {
        self.publisher.latest()
    }
}

pub(crate) fn lock(control: &Mutex<ImpulseScheduler>) -> MutexGuard<'_, ImpulseScheduler> {
    control.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use visage_core::ImpulseConfig;
    use visage_liveness::HeartbeatConfig;

    fn pipeline() -> (FacePipeline, Arc<Mutex<ImpulseScheduler>>) {
        let catalog = Arc::new(PresetCatalog::builtin().unwrap());
        let control = Arc::new(Mutex::new(ImpulseScheduler::new(
            catalog,
            ImpulseConfig::default(),
        )));
        let liveness = LivenessSystem::with_config(HeartbeatConfig::testing());
        let pipeline = FacePipeline::new(
            Arc::clone(&control),
            5.0,
            MotionOverlay::new(0.0),
            liveness,
            StdRng::seed_from_u64(3),
        );
        (pipeline, control)
    }

    #[test]
    fn test_initial_frame_is_resting_pose() {
        let (pipeline, control) = pipeline();
        let frame = pipeline.latest();
        assert_eq!(frame.sequence, 0);
        assert_eq!(frame.preset_id, "neutral");
        assert_eq!(frame.pose, lock(&control).baseline().tree);
    }

    #[test]
    fn test_step_decays_before_composing() {
        let (mut pipeline, control) = pipeline();
        lock(&control).push_impulse("happy", Some(1.0), Some(1.0));

        let frame = pipeline.step(1.0, 1.0);
        assert!(lock(&control).impulses().is_empty());
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.preset_id, "happy");
        // Expired on this very tick, so the color is already back.
        assert_eq!(frame.color, "#7dd3fc");
    }

    #[test]
    fn test_color_snaps_while_pose_eases() {
        let (mut pipeline, control) = pipeline();
        lock(&control).push_impulse("happy", Some(1.0), Some(3.0));

        let frame = pipeline.step(0.016, 0.016);
        assert_eq!(frame.color, "#facc15");

        let target = lock(&control)
            .catalog()
            .lookup("happy")
            .unwrap()
            .base_pose
            .value_at("mouth.curve")
            .unwrap();
        let shown = frame.pose.value_at("mouth.curve").unwrap();
        assert!(shown > 0.0 && shown < target, "{shown}");
    }
}
