//! # Visage Expression
//!
//! The render side of the face: everything between "an impulse arrived" and
//! "a frame was published".
//!
//! ## Per-tick order
//!
//! 1. `ImpulseScheduler::tick` decays and expires impulses (under the lock)
//! 2. the compositor blends baseline and impulses into a target pose
//! 3. the visible pose eases toward the target
//! 4. motion offsets are added on top
//! 5. liveness (blink, jitter) is applied
//! 6. the frame is published
//!
//! Only the render loop runs these steps. Network ingestion and manual control
//! go through [`FaceHandle`], which mutates scheduler state and nothing else.

pub mod compositor;
pub mod engine;
pub mod frame;
pub mod motion;
pub mod pipeline;
pub mod scheduler;

pub use compositor::Compositor;
pub use engine::{FaceEngine, FaceHandle};
pub use frame::{FramePublisher, RenderFrame};
pub use motion::{MotionOverlay, SELECTION_MOTION_WEIGHT};
pub use pipeline::FacePipeline;
pub use scheduler::{ActiveImpulse, ControlSnapshot, ImpulseScheduler, ManualValue, COLOR_PATH};
