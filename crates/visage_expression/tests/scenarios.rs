//! End-to-end compositor scenarios, driven tick by tick at 60 fps.

use std::sync::Arc;
use visage_core::{PresetCatalog, PushOutcome, VisageConfig};
use visage_expression::{compositor, FaceEngine, FaceHandle, ManualValue};

const DT: f64 = 1.0 / 60.0;

struct Harness {
    engine: FaceEngine,
    handle: FaceHandle,
    elapsed: f64,
}

impl Harness {
    fn new() -> Self {
        let config = VisageConfig {
            seed: Some(7),
            ..VisageConfig::default()
        };
        let engine = FaceEngine::new(Arc::new(PresetCatalog::builtin().unwrap()), &config);
        let handle = engine.handle();
        Self {
            engine,
            handle,
            elapsed: 0.0,
        }
    }

    /// Run `n` ticks and return the color of the last frame.
    fn run(&mut self, n: usize) -> String {
        let mut color = String::new();
        for _ in 0..n {
            self.elapsed += DT;
            color = self.engine.step(DT, self.elapsed).unwrap().color.clone();
        }
        color
    }

    fn weight(&self, id: &str) -> Option<f64> {
        self.handle
            .active_impulses()
            .into_iter()
            .find(|i| i.preset_id == id)
            .map(|i| i.weight)
    }

    fn color_of(&self, id: &str) -> String {
        self.handle.catalog().lookup(id).unwrap().color.clone().unwrap()
    }
}

#[test]
fn happy_pulse_decays_linearly_and_color_reverts() {
    let mut h = Harness::new();
    let baseline_color = h.handle.current_frame().color.clone();

    h.handle.push_impulse("happy", Some(1.0), Some(3.0));
    let color = h.run(90);
    let w = h.weight("happy").unwrap();
    assert!((w - 0.5).abs() < 1e-6, "weight at 1.5s = {w}");
    assert_eq!(color, h.color_of("happy"));

    let color = h.run(90);
    assert!(h.weight("happy").is_none(), "impulse alive at 3.0s");
    assert_eq!(color, baseline_color);
}

#[test]
fn repeated_angry_merges_to_max() {
    let mut h = Harness::new();
    assert_eq!(
        h.handle.push_impulse("angry", Some(1.0), None),
        PushOutcome::Created
    );
    h.run(1);
    assert_eq!(
        h.handle.push_impulse("angry", Some(0.6), None),
        PushOutcome::Merged
    );
    assert_eq!(h.handle.active_impulses().len(), 1);
    let w = h.weight("angry").unwrap();
    assert!(w > 0.99 && w <= 1.0, "{w}");
}

#[test]
fn equal_weights_keep_first_color() {
    let mut h = Harness::new();
    h.handle.push_impulse("sad", Some(0.3), None);
    h.handle.push_impulse("joy", Some(0.3), None);
    assert_eq!(h.run(1), h.color_of("sad"));
    // Both decay at the same rate, so the tie holds.
    assert_eq!(h.run(30), h.color_of("sad"));
}

#[test]
fn select_preset_clears_impulses() {
    let mut h = Harness::new();
    for id in ["happy", "sad", "angry"] {
        h.handle.push_impulse(id, None, None);
    }
    h.run(5);
    assert!(h.handle.select_preset("thinking"));
    assert!(h.handle.active_impulses().is_empty());
    assert_eq!(h.handle.selection(), "thinking");
    assert_eq!(h.run(1), h.color_of("thinking"));
}

#[test]
fn unknown_preset_changes_nothing() {
    let mut h = Harness::new();
    h.handle.push_impulse("sad", Some(0.5), None);
    assert_eq!(
        h.handle.push_impulse("ecstatic", None, None),
        PushOutcome::UnknownPreset
    );
    assert!(!h.handle.select_preset("ecstatic"));
    assert_eq!(h.handle.active_impulses().len(), 1);
    assert_eq!(h.handle.displayed(), "sad");
    h.run(1);
}

#[test]
fn no_impulses_means_target_is_baseline() {
    let h = Harness::new();
    h.handle
        .set_manual_parameter("mouth.curve", 0.25)
        .unwrap();
    h.handle
        .set_manual_parameter("color", ManualValue::Text("#abcdef".into()))
        .unwrap();

    let catalog = h.handle.catalog();
    let mut baseline = catalog.neutral().unwrap().pose();
    baseline.tree.set("mouth.curve", 0.25).unwrap();
    baseline.color = Some("#abcdef".into());

    assert_eq!(compositor::base_weight(&[]), 1.0);
    assert_eq!(compositor::blend(catalog, &baseline, &[]), baseline.tree);
    assert_eq!(compositor::resolve_color(catalog, &baseline, &[]), "#abcdef");
}

#[test]
fn visible_pose_settles_on_manual_baseline() {
    let mut h = Harness::new();
    h.handle.set_manual_parameter("mouth.curve", 0.5).unwrap();
    h.run(300);
    let curve = h
        .handle
        .current_frame()
        .pose
        .value_at("mouth.curve")
        .unwrap();
    // Neutral carries no mouth motion, and liveness never runs before start.
    assert!((curve - 0.5).abs() < 1e-6, "{curve}");
}

#[test]
fn select_preset_clears_manual_fields_it_does_not_define() {
    let mut h = Harness::new();
    h.handle.set_manual_parameter("brow.height", 1.0).unwrap();
    h.run(120);
    let brow = h.handle.current_frame().pose.value_at("brow.height");
    assert!(brow.is_some_and(|v| v > 0.9), "{brow:?}");

    assert!(h.handle.select_preset("happy"));
    h.run(600);
    let frame = h.handle.current_frame();
    assert_eq!(frame.pose.value_at("brow.height"), None);
    assert!(frame.pose.value_at("mouth.curve").is_some());
}
