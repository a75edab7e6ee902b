//! Face engine: owns the render loop and hands out control handles.
//!
//! Lifecycle is `new` → (optional manual `step`s) → `start` → `shutdown`.
//! After `start` the pipeline lives inside the render task; callers interact
//! through [`FaceHandle`], which can only enqueue changes and read frames.

use crate::frame::RenderFrame;
use crate::motion::MotionOverlay;
use crate::pipeline::{lock, FacePipeline};
use crate::scheduler::{ActiveImpulse, ImpulseScheduler, ManualValue};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use visage_core::{
    ImpulseSink, PoseError, PresetCatalog, PushOutcome, TaskRegistry, VisageConfig,
};
use visage_liveness::{HeartbeatConfig, LivenessSystem};

pub struct FaceEngine {
    handle: FaceHandle,
    tasks: Arc<TaskRegistry>,
    liveness: LivenessSystem,
    /// `None` once the render loop owns it.
    pipeline: Option<FacePipeline>,
    frame_interval: Duration,
    liveness_rng: StdRng,
}

impl FaceEngine {
    pub fn new(catalog: Arc<PresetCatalog>, config: &VisageConfig) -> Self {
        let mut seeds = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let motion_rng = StdRng::seed_from_u64(seeds.gen());
        let liveness_rng = StdRng::seed_from_u64(seeds.gen());

        let control = Arc::new(Mutex::new(ImpulseScheduler::new(
            Arc::clone(&catalog),
            config.impulse.clone(),
        )));
        let liveness = LivenessSystem::with_config(HeartbeatConfig::from(&config.liveness));
        let pipeline = FacePipeline::new(
            Arc::clone(&control),
            config.render.smoothing_rate,
            MotionOverlay::new(config.render.selection_motion_weight),
            liveness.clone(),
            motion_rng,
        );

        let handle = FaceHandle {
            catalog,
            control,
            frames: pipeline.subscribe(),
        };

        Self {
            handle,
            tasks: Arc::new(TaskRegistry::new()),
            liveness,
            pipeline: Some(pipeline),
            frame_interval: config.render.frame_interval(),
            liveness_rng,
        }
    }

    pub fn handle(&self) -> FaceHandle {
        self.handle.clone()
    }

    /// Registry every engine task runs under. Other subsystems (the event
    /// link) spawn here too so one shutdown stops everything.
    pub fn tasks(&self) -> &Arc<TaskRegistry> {
        &self.tasks
    }

    pub fn is_running(&self) -> bool {
        self.pipeline.is_none() && !self.tasks.is_shut_down()
    }

    /// Drive one tick by hand. Returns `None` once the render loop is running.
    pub fn step(&mut self, dt: f64, elapsed: f64) -> Option<Arc<RenderFrame>> {
        self.pipeline.as_mut().map(|p| p.step(dt, elapsed))
    }

    /// Spawn the render loop and the liveness heartbeat. Must be called from
    /// within a tokio runtime. A second call does nothing.
    pub fn start(&mut self) {
        let Some(mut pipeline) = self.pipeline.take() else {
            tracing::debug!("Face engine already started");
            return;
        };

        let rng = StdRng::seed_from_u64(self.liveness_rng.gen());
        self.liveness.start(&self.tasks, rng);

        let period = self.frame_interval;
        self.tasks.spawn("render-loop", async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let started = Instant::now();
            let mut last = started;
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f64();
                last = now;
                pipeline.step(dt, now.duration_since(started).as_secs_f64());
            }
        });

        tracing::info!(
            "Face engine started ({:.1} ms/frame)",
            period.as_secs_f64() * 1000.0
        );
    }

    /// Cancel the render loop, the heartbeat and every pending timer.
    pub fn shutdown(&self) {
        if !self.tasks.is_shut_down() {
            tracing::info!("Face engine shutting down");
        }
        self.tasks.shutdown();
    }
}

impl Drop for FaceEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cloneable control surface for the engine.
///
/// Every mutating call takes the control lock only for the mutation itself;
/// composing happens on the render loop.
#[derive(Clone)]
pub struct FaceHandle {
    catalog: Arc<PresetCatalog>,
    control: Arc<Mutex<ImpulseScheduler>>,
    frames: watch::Receiver<Arc<RenderFrame>>,
}

impl FaceHandle {
    pub fn push_impulse(
        &self,
        preset_id: &str,
        weight: Option<f64>,
        duration: Option<f64>,
    ) -> PushOutcome {
        lock(&self.control).push_impulse(preset_id, weight, duration)
    }

    pub fn select_preset(&self, preset_id: &str) -> bool {
        lock(&self.control).select_preset(preset_id)
    }

    pub fn set_manual_parameter(
        &self,
        path: &str,
        value: impl Into<ManualValue>,
    ) -> Result<(), PoseError> {
        lock(&self.control).set_manual_parameter(path, value.into())
    }

    /// Most recently published frame.
    pub fn current_frame(&self) -> Arc<RenderFrame> {
        self.frames.borrow().clone()
    }

    /// Receiver woken on every published frame.
    pub fn subscribe(&self) -> watch::Receiver<Arc<RenderFrame>> {
        self.frames.clone()
    }

    pub fn catalog(&self) -> &Arc<PresetCatalog> {
        &self.catalog
    }

    pub fn active_impulses(&self) -> Vec<ActiveImpulse> {
        lock(&self.control).impulses().to_vec()
    }

    pub fn selection(&self) -> String {
        lock(&self.control).selection().to_string()
    }

    pub fn displayed(&self) -> String {
        lock(&self.control).displayed().to_string()
    }
}

impl ImpulseSink for FaceHandle {
    fn push_impulse(
        &self,
        preset_id: &str,
        weight: Option<f64>,
        duration: Option<f64>,
    ) -> PushOutcome {
        FaceHandle::push_impulse(self, preset_id, weight, duration)
    }
}

impl std::fmt::Debug for FaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceHandle")
            .field("presets", &self.catalog.len())
            .finish_non_exhaustive()
    }
}
