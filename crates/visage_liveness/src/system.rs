//! Self-ticking liveness system
//!
//! The LivenessSystem owns the blink/jitter state and, once started, runs its
//! own heartbeat:
//! - rolls a blink on every maintenance tick and schedules the eyes to reopen
//!   after `blink_hold`, on a timer separate from the tick. A blink that
//!   starts while another is held supersedes it, so only the newest restore
//!   reopens the eyes.
//! - redraws gaze jitter every tick (step jitter, no interpolation)
//!
//! Nothing here reads expression state, and nothing here can fail.

use crate::heartbeat::HeartbeatConfig;
use crate::state::LivenessState;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::time::MissedTickBehavior;
use visage_core::TaskRegistry;

#[derive(Debug, Default)]
struct Shared {
    state: LivenessState,
    /// Bumped on every blink; a restore only applies to its own blink.
    blink_generation: u64,
}

#[derive(Debug, Clone)]
pub struct LivenessSystem {
    /// Shared with the render loop, which only reads it.
    shared: Arc<Mutex<Shared>>,
    config: HeartbeatConfig,
}

impl LivenessSystem {
    pub fn new() -> Self {
        Self::with_config(HeartbeatConfig::default())
    }

    pub fn with_config(config: HeartbeatConfig) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            config,
        }
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    /// Current blink/jitter values.
    pub fn snapshot(&self) -> LivenessState {
        lock(&self.shared).state
    }

    /// One maintenance tick: maybe start a blink, always redraw jitter.
    ///
    /// Returns true when a blink started. Reopening the eyes is the caller's
    /// job (see [`LivenessSystem::start`]), so this stays free of timers.
    pub fn maintenance_tick<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.roll(rng).is_some()
    }

    /// Tick and return the generation of the blink that started, if any.
    fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u64> {
        let blink = rng.gen_bool(self.config.blink_probability.clamp(0.0, 1.0));
        let range = self.config.jitter_range.abs();
        let (jitter_x, jitter_y) = if range > 0.0 {
            (rng.gen_range(-range..=range), rng.gen_range(-range..=range))
        } else {
            (0.0, 0.0)
        };

        let mut shared = lock(&self.shared);
        shared.state.jitter_x = jitter_x;
        shared.state.jitter_y = jitter_y;
        if !blink {
            return None;
        }
        shared.state.blink_scale = 0.0;
        shared.blink_generation += 1;
        Some(shared.blink_generation)
    }

    /// Reopen the eyes.
    pub fn end_blink(&self) {
        lock(&self.shared).state.blink_scale = 1.0;
    }

    /// Reopen the eyes unless a newer blink has started since `generation`.
    fn end_blink_if_current(&self, generation: u64) {
        let mut shared = lock(&self.shared);
        if shared.blink_generation == generation {
            shared.state.blink_scale = 1.0;
        }
    }

    /// Spawn the heartbeat on `tasks`. Blink-restore timers go through the
    /// same registry so shutdown cancels them too.
    pub fn start(&self, tasks: &Arc<TaskRegistry>, mut rng: StdRng) {
        let system = self.clone();
        let registry: Weak<TaskRegistry> = Arc::downgrade(tasks);
        let interval = self.config.interval;
        let hold = self.config.blink_hold;

        tasks.spawn("liveness-heartbeat", async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(generation) = system.roll(&mut rng) else {
                    continue;
                };
                tracing::trace!(generation, "blink");
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let restore = system.clone();
                registry.schedule("blink-restore", hold, move || {
                    restore.end_blink_if_current(generation)
                });
            }
        });
    }
}

impl Default for LivenessSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}
