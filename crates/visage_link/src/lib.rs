//! # Visage Link
//!
//! Inbound side of the face: a single logical connection to the upstream
//! event broadcaster. Packets are parsed, de-duplicated against a bounded
//! ledger and turned into impulse pushes.
//!
//! Disconnects are not errors. The link waits a fixed delay and tries again,
//! with ledger and impulses intact.

pub mod client;
pub mod ingest;
pub mod ledger;
pub mod packet;

pub use client::{EventLink, EventSource, LinkError, MessageStream, WsSource};
pub use ingest::{EventIngestor, IngestReport, LinkState};
pub use ledger::ProcessedEventLedger;
pub use packet::{EmotionPulse, InboundEvent, InboundPacket, EMOTION_PULSE};
