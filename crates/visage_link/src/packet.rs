//! Inbound packet model.
//!
//! Upstream wraps its event list in whatever envelope it is currently
//! broadcasting (`{"brain": {"events": [...]}}` is typical), so the list is
//! looked up rather than expected at a fixed spot.

use serde::Deserialize;
use serde_json::Value;

/// Event type that carries an emotion impulse.
pub const EMOTION_PULSE: &str = "emotion_pulse";

/// How far below the packet root an `events` array may sit.
const MAX_ENVELOPE_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub payload: Value,
}

impl InboundEvent {
    /// The pulse carried by this event, if it is a well-formed `emotion_pulse`.
    pub fn emotion_pulse(&self) -> Option<EmotionPulse> {
        if self.kind != EMOTION_PULSE {
            return None;
        }
        EmotionPulse::deserialize(&self.payload).ok()
    }
}

/// Payload of an `emotion_pulse` event. Missing weight or duration means the
/// scheduler default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmotionPulse {
    pub preset: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// The ordered events of one packet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundPacket {
    pub events: Vec<InboundEvent>,
    /// Entries of the events array that were not valid events.
    pub malformed: usize,
}

impl InboundPacket {
    /// Parse a text frame. `None` when it is not JSON or has no events array.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let raw = find_events(value, 0)?;
        let mut packet = InboundPacket::default();
        for entry in raw {
            match InboundEvent::deserialize(entry) {
                Ok(event) => packet.events.push(event),
                Err(e) => {
                    tracing::trace!("skipping malformed event: {}", e);
                    packet.malformed += 1;
                }
            }
        }
        Some(packet)
    }
}

/// Depth-first search for the first `events` array.
fn find_events(value: &Value, depth: usize) -> Option<&Vec<Value>> {
    let object = value.as_object()?;
    if let Some(Value::Array(events)) = object.get("events") {
        return Some(events);
    }
    if depth >= MAX_ENVELOPE_DEPTH {
        return None;
    }
    object
        .values()
        .filter(|v| v.is_object())
        .find_map(|v| find_events(v, depth + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_root_events() {
        let packet = InboundPacket::parse(
            r#"{"events": [{"id": "a", "type": "emotion_pulse",
                "payload": {"preset": "happy", "weight": 0.8, "duration": 2}}]}"#,
        )
        .unwrap();
        assert_eq!(packet.events.len(), 1);
        let pulse = packet.events[0].emotion_pulse().unwrap();
        assert_eq!(pulse.preset, "happy");
        assert_eq!(pulse.weight, Some(0.8));
        assert_eq!(pulse.duration, Some(2.0));
    }

    #[test]
    fn test_parse_nested_envelope() {
        let value = json!({
            "timestamp": 1.0,
            "brain": {"status": {"mood": "ok"}, "events": [{"id": "x", "type": "tick"}]}
        });
        let packet = InboundPacket::from_value(&value).unwrap();
        assert_eq!(packet.events[0].id, "x");
        assert_eq!(packet.events[0].payload, Value::Null);
    }

    #[test]
    fn test_envelope_depth_is_bounded() {
        let deep = json!({"a": {"b": {"c": {"d": {"e": {"events": []}}}}}});
        assert!(InboundPacket::from_value(&deep).is_none());
        let ok = json!({"a": {"b": {"c": {"d": {"events": []}}}}});
        assert!(InboundPacket::from_value(&ok).is_some());
    }

    #[test]
    fn test_garbage_is_none() {
        assert!(InboundPacket::parse("not json").is_none());
        assert!(InboundPacket::parse("[1, 2]").is_none());
        assert!(InboundPacket::parse(r#"{"events": "nope"}"#).is_none());
        assert!(InboundPacket::parse(r#"{"status": {}}"#).is_none());
    }

    #[test]
    fn test_bad_entries_are_counted_not_fatal() {
        let packet = InboundPacket::parse(
            r#"{"events": [{"type": "emotion_pulse"}, 7, {"id": "ok", "type": "noop"}]}"#,
        )
        .unwrap();
        assert_eq!(packet.malformed, 2);
        assert_eq!(packet.events.len(), 1);
    }

    #[test]
    fn test_pulse_requires_preset() {
        let event = InboundEvent {
            id: "p".into(),
            kind: EMOTION_PULSE.into(),
            timestamp: None,
            payload: json!({"weight": 1.0}),
        };
        assert!(event.emotion_pulse().is_none());

        let other = InboundEvent {
            kind: "speech".into(),
            payload: json!({"preset": "happy"}),
            ..event
        };
        assert!(other.emotion_pulse().is_none());
    }
}
