//! # Visage Liveness
//!
//! Autonomous micro-behavior that keeps the face from looking frozen:
//!
//! - **Blink**: a short 0/1 pulse on eye openness, rolled on every
//!   maintenance tick and released on its own timer
//! - **Micro-saccades**: small step jitter on the gaze, redrawn every tick
//!
//! The system runs on its own heartbeat (10 Hz by default), entirely
//! decoupled from emotion impulses and from the render cadence. The render
//! loop only ever reads a [`LivenessState`] snapshot.

mod heartbeat;
mod state;
mod system;

pub use heartbeat::HeartbeatConfig;
pub use state::LivenessState;
pub use system::LivenessSystem;
