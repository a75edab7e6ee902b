//! Motion specs: procedural waveforms layered over a pose
//!
//! A motion spec mirrors the pose tree, with each animated leaf replaced by a
//! `{amplitude, frequency}` wave. The reserved top-level key `"all"` is not a
//! field path: it declares a whole-face tremor, a uniform random offset shared
//! by `gazeX` and `gazeY`.

use crate::pose::PoseNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

/// Key reserved for the whole-face tremor.
pub const TREMOR_KEY: &str = "all";

/// A sine wave: `amplitude * sin(2π * frequency * t)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Wave {
    pub amplitude: f64,
    #[serde(default)]
    pub frequency: f64,
}

impl Wave {
    pub fn sample(&self, t: f64) -> f64 {
        self.amplitude * (TAU * self.frequency * t).sin()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MotionNode {
    Wave(Wave),
    Group(BTreeMap<String, MotionNode>),
}

impl MotionNode {
    fn sample_into(&self, out: &mut PoseNode, t: f64, weight: f64) {
        match (self, out) {
            (MotionNode::Wave(wave), PoseNode::Scalar(v)) => *v += wave.sample(t) * weight,
            (MotionNode::Group(children), PoseNode::Group(slots)) => {
                for (key, child) in children {
                    let slot = slots.entry(key.clone()).or_insert_with(|| child.zeroed());
                    child.sample_into(slot, t, weight);
                }
            }
            _ => tracing::trace!("motion spec shape does not match offset tree, skipped"),
        }
    }

    fn zeroed(&self) -> PoseNode {
        match self {
            MotionNode::Wave(_) => PoseNode::Scalar(0.0),
            MotionNode::Group(_) => PoseNode::group(),
        }
    }
}

/// Periodic waves plus an optional tremor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, MotionNode>",
    into = "BTreeMap<String, MotionNode>"
)]
pub struct MotionSpec {
    waves: BTreeMap<String, MotionNode>,
    tremor: Option<Wave>,
}

impl MotionSpec {
    pub fn new(waves: BTreeMap<String, MotionNode>, tremor: Option<Wave>) -> Self {
        Self { waves, tremor }
    }

    pub fn waves(&self) -> &BTreeMap<String, MotionNode> {
        &self.waves
    }

    /// Amplitude source for the whole-face tremor, if any.
    pub fn tremor(&self) -> Option<Wave> {
        self.tremor
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty() && self.tremor.is_none()
    }

    /// Add every periodic wave, sampled at `t` and scaled by `weight`, into
    /// the offset tree `out`. The tremor is not sampled here; it needs a
    /// random source.
    pub fn sample_into(&self, out: &mut PoseNode, t: f64, weight: f64) {
        let PoseNode::Group(slots) = out else {
            return;
        };
        for (key, node) in &self.waves {
            let slot = slots.entry(key.clone()).or_insert_with(|| node.zeroed());
            node.sample_into(slot, t, weight);
        }
    }
}

impl From<BTreeMap<String, MotionNode>> for MotionSpec {
    fn from(mut waves: BTreeMap<String, MotionNode>) -> Self {
        let tremor = match waves.remove(TREMOR_KEY) {
            Some(MotionNode::Wave(wave)) => Some(wave),
            Some(MotionNode::Group(_)) => {
                tracing::warn!("motion key '{}' must be a wave, ignoring group", TREMOR_KEY);
                None
            }
            None => None,
        };
        Self { waves, tremor }
    }
}

impl From<MotionSpec> for BTreeMap<String, MotionNode> {
    fn from(spec: MotionSpec) -> Self {
        let mut map = spec.waves;
        if let Some(tremor) = spec.tremor {
            map.insert(TREMOR_KEY.to_string(), MotionNode::Wave(tremor));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(json: &str) -> MotionSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_all_key_becomes_tremor() {
        let s = spec(r#"{"all": {"amplitude": 2.0}, "mouth": {"curve": {"amplitude": 0.1, "frequency": 2}}}"#);
        assert_eq!(s.tremor(), Some(Wave { amplitude: 2.0, frequency: 0.0 }));
        assert!(!s.waves().contains_key(TREMOR_KEY));
        assert!(s.waves().contains_key("mouth"));
    }

    #[test]
    fn test_empty_spec() {
        assert!(spec("{}").is_empty());
    }

    #[test]
    fn test_sample_quarter_period_hits_amplitude() {
        let s = spec(r#"{"gazeY": {"amplitude": 4.0, "frequency": 1.0}}"#);
        let mut out = PoseNode::group();
        s.sample_into(&mut out, 0.25, 0.5);
        let v = out.value_at("gazeY").unwrap();
        assert!((v - 2.0).abs() < 1e-9, "got {v}");
    }

    #[test]
    fn test_sample_at_zero_is_zero() {
        let s = spec(r#"{"leftEye": {"smile": {"amplitude": 1.0, "frequency": 3.0}}}"#);
        let mut out = PoseNode::group();
        s.sample_into(&mut out, 0.0, 1.0);
        assert_eq!(out.value_at("leftEye.smile"), Some(0.0));
    }

    #[test]
    fn test_serialize_restores_all_key() {
        let s = spec(r#"{"all": {"amplitude": 1.5, "frequency": 0}}"#);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["all"]["amplitude"], 1.5);
    }
}
