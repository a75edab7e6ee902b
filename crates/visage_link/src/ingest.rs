//! Event ingestion: packets in, impulses out.
//!
//! The ingestor only ever calls [`ImpulseSink::push_impulse`]; it has no way
//! to reach composed state. Its ledger lives as long as the ingestor, so it
//! carries across reconnects.

use crate::ledger::ProcessedEventLedger;
use crate::packet::{InboundPacket, EMOTION_PULSE};
use serde::Serialize;
use tokio::sync::watch;
use visage_core::ImpulseSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// What one packet did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Pulses that created or merged an impulse.
    pub applied: usize,
    /// Events whose id was already in the ledger.
    pub duplicates: usize,
    /// New events that carried nothing to apply: other types, pulses without
    /// a preset, unknown presets.
    pub ignored: usize,
    /// Unusable entries, or 1 for a packet that could not be read at all.
    pub malformed: usize,
}

pub struct EventIngestor<S> {
    sink: S,
    ledger: ProcessedEventLedger,
    state: watch::Sender<LinkState>,
}

impl<S: ImpulseSink> EventIngestor<S> {
    pub fn new(sink: S, ledger: ProcessedEventLedger) -> Self {
        let (state, _) = watch::channel(LinkState::Disconnected);
        Self {
            sink,
            ledger,
            state,
        }
    }

    pub fn on_connecting(&self) {
        self.state.send_replace(LinkState::Connecting);
    }

    pub fn on_connect(&self) {
        tracing::info!("Event link connected");
        self.state.send_replace(LinkState::Connected);
    }

    /// Ledger and pushed impulses are kept; only the state changes.
    pub fn on_disconnect(&self) {
        let previous = self.state.send_replace(LinkState::Disconnected);
        if previous == LinkState::Connected {
            tracing::info!("Event link disconnected");
        }
    }

    /// Apply one raw text frame. Never fails; unreadable input is dropped.
    pub fn on_message(&mut self, text: &str) -> IngestReport {
        match InboundPacket::parse(text) {
            Some(packet) => self.on_packet(packet),
            None => {
                tracing::debug!("Dropped unreadable packet ({} bytes)", text.len());
                IngestReport {
                    malformed: 1,
                    ..IngestReport::default()
                }
            }
        }
    }

    pub fn on_packet(&mut self, packet: InboundPacket) -> IngestReport {
        let mut report = IngestReport {
            malformed: packet.malformed,
            ..IngestReport::default()
        };

        for event in packet.events {
            if !self.ledger.insert(&event.id) {
                report.duplicates += 1;
                continue;
            }
            if event.kind != EMOTION_PULSE {
                report.ignored += 1;
                continue;
            }
            let Some(pulse) = event.emotion_pulse() else {
                tracing::debug!("emotion_pulse {} has no usable payload", event.id);
                report.ignored += 1;
                continue;
            };
            if self
                .sink
                .push_impulse(&pulse.preset, pulse.weight, pulse.duration)
                .applied()
            {
                report.applied += 1;
            } else {
                report.ignored += 1;
            }
        }

        if report != IngestReport::default() {
            tracing::debug!(
                "Ingested packet: {} applied, {} duplicate, {} ignored, {} malformed",
                report.applied,
                report.duplicates,
                report.ignored,
                report.malformed
            );
        }
        report
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    pub fn ledger(&self) -> &ProcessedEventLedger {
        &self.ledger
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use visage_core::PushOutcome;

    #[derive(Default)]
    struct RecordingSink {
        pushes: Mutex<Vec<(String, Option<f64>, Option<f64>)>>,
    }

    impl ImpulseSink for RecordingSink {
        fn push_impulse(&self, id: &str, w: Option<f64>, d: Option<f64>) -> PushOutcome {
            if id == "nobody" {
                return PushOutcome::UnknownPreset;
            }
            self.pushes.lock().unwrap().push((id.to_string(), w, d));
            PushOutcome::Created
        }
    }

    fn ingestor() -> EventIngestor<RecordingSink> {
        EventIngestor::new(RecordingSink::default(), ProcessedEventLedger::default())
    }

    fn pulse(id: &str, preset: &str) -> String {
        format!(
            r#"{{"brain": {{"events": [{{"id": "{id}", "type": "emotion_pulse",
                "payload": {{"preset": "{preset}", "weight": 0.7}}}}]}}}}"#
        )
    }

    #[test]
    fn test_pulse_reaches_sink_with_defaults_left_open() {
        let mut ing = ingestor();
        let report = ing.on_message(&pulse("e1", "happy"));
        assert_eq!(report.applied, 1);
        assert_eq!(
            ing.sink().pushes.lock().unwrap()[0],
            ("happy".to_string(), Some(0.7), None)
        );
    }

    #[test]
    fn test_duplicate_ids_apply_once() {
        let mut ing = ingestor();
        ing.on_message(&pulse("e1", "happy"));
        let report = ing.on_message(&pulse("e1", "happy"));
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.applied, 0);
        assert_eq!(ing.sink().pushes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_non_pulse_and_unknown_are_recorded_but_ignored() {
        let mut ing = ingestor();
        let report = ing.on_message(
            r#"{"events": [
                {"id": "s1", "type": "speech", "payload": {"text": "hi"}},
                {"id": "p1", "type": "emotion_pulse", "payload": {}},
                {"id": "p2", "type": "emotion_pulse", "payload": {"preset": "nobody"}}
            ]}"#,
        );
        assert_eq!(report.ignored, 3);
        assert!(ing.ledger().contains("s1"));
        assert!(ing.ledger().contains("p1"));
        assert!(ing.ledger().contains("p2"));
    }

    #[test]
    fn test_garbage_is_dropped() {
        let mut ing = ingestor();
        assert_eq!(ing.on_message("{{{").malformed, 1);
        assert!(ing.ledger().is_empty());
    }

    #[test]
    fn test_state_transitions_keep_ledger() {
        let mut ing = ingestor();
        let rx = ing.subscribe_state();
        assert_eq!(ing.state(), LinkState::Disconnected);

        ing.on_connecting();
        ing.on_connect();
        assert_eq!(*rx.borrow(), LinkState::Connected);
        ing.on_message(&pulse("e9", "sad"));

        ing.on_disconnect();
        assert_eq!(ing.state(), LinkState::Disconnected);
        assert!(ing.ledger().contains("e9"));
    }
}
