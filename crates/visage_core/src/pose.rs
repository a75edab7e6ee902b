//! Pose trees
//!
//! A face pose is a hierarchy of named numeric parameters: per-eye groups
//! (`openness`, `squeeze`, `smile`, `rotation`), gaze (`gazeX`, `gazeY`) and a
//! mouth group (`curve`, `openness`, `offsetY`, `roundness`). The hierarchy is
//! open-ended, so it is modelled as a recursive variant rather than a fixed
//! struct. Every arithmetic operation the compositor needs (scale, weighted
//! add, lerp) is written once here over that variant.
//!
//! Non-numeric data (the accent color) never lives inside the tree; it rides
//! beside it in [`Pose`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Horizontal gaze offset.
pub const GAZE_X: &str = "gazeX";
/// Vertical gaze offset.
pub const GAZE_Y: &str = "gazeY";
pub const LEFT_EYE_OPENNESS: &str = "leftEye.openness";
pub const RIGHT_EYE_OPENNESS: &str = "rightEye.openness";

/// Errors raised when addressing a pose tree by path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoseError {
    #[error("parameter path is empty")]
    EmptyPath,

    #[error("parameter path '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("parameter path '{0}' descends through a scalar field")]
    ThroughScalar(String),

    #[error("parameter path '{0}' names a group, not a scalar")]
    NotALeaf(String),

    #[error("value for '{0}' is not a finite number")]
    NonFinite(String),

    #[error("parameter '{0}' takes a number")]
    ExpectedNumber(String),

    #[error("'color' takes a color string")]
    ExpectedColor,
}

/// One node of a pose tree: a numeric leaf or a named group of children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoseNode {
    Scalar(f64),
    Group(BTreeMap<String, PoseNode>),
}

impl Default for PoseNode {
    fn default() -> Self {
        Self::group()
    }
}

impl PoseNode {
    /// An empty group.
    pub fn group() -> Self {
        PoseNode::Group(BTreeMap::new())
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            PoseNode::Scalar(v) => Some(*v),
            PoseNode::Group(_) => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, PoseNode::Group(_))
    }

    /// Look up a node by dot-separated path (`leftEye.openness`).
    pub fn get(&self, path: &str) -> Option<&PoseNode> {
        let mut node = self;
        for segment in path.split('.') {
            match node {
                PoseNode::Group(children) => node = children.get(segment)?,
                PoseNode::Scalar(_) => return None,
            }
        }
        Some(node)
    }

    /// Scalar value at `path`, if the path names a leaf.
    pub fn value_at(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(PoseNode::as_scalar)
    }

    /// Set the scalar at `path`, creating intermediate groups as needed.
    pub fn set(&mut self, path: &str, value: f64) -> Result<(), PoseError> {
        if !value.is_finite() {
            return Err(PoseError::NonFinite(path.to_string()));
        }
        let slot = self.leaf_slot(path)?;
        *slot = value;
        Ok(())
    }

    /// Add `delta` to the scalar at `path`. A missing leaf starts at zero.
    pub fn add_at(&mut self, path: &str, delta: f64) -> Result<(), PoseError> {
        let slot = self.leaf_slot(path)?;
        *slot += delta;
        Ok(())
    }

    /// Multiply the scalar at `path` by `factor`. Returns false when the leaf
    /// does not exist; nothing is created in that case.
    pub fn scale_at(&mut self, path: &str, factor: f64) -> bool {
        let mut node = self;
        for segment in path.split('.') {
            match node {
                PoseNode::Group(children) => match children.get_mut(segment) {
                    Some(child) => node = child,
                    None => return false,
                },
                PoseNode::Scalar(_) => return false,
            }
        }
        match node {
            PoseNode::Scalar(v) => {
                *v *= factor;
                true
            }
            PoseNode::Group(_) => false,
        }
    }

    /// Elementwise scalar multiply over the whole tree.
    pub fn scaled(&self, factor: f64) -> PoseNode {
        match self {
            PoseNode::Scalar(v) => PoseNode::Scalar(v * factor),
            PoseNode::Group(children) => PoseNode::Group(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.scaled(factor)))
                    .collect(),
            ),
        }
    }

    /// `self += other * factor`, leaf by leaf.
    ///
    /// Fields present only in `other` are inserted (scaled). Where the two
    /// trees disagree on shape (scalar vs group) `self` is left untouched.
    pub fn add_scaled(&mut self, other: &PoseNode, factor: f64) {
        match (self, other) {
            (PoseNode::Scalar(a), PoseNode::Scalar(b)) => *a += b * factor,
            (PoseNode::Group(mine), PoseNode::Group(theirs)) => {
                for (key, node) in theirs {
                    match mine.get_mut(key) {
                        Some(existing) => existing.add_scaled(node, factor),
                        None => {
                            mine.insert(key.clone(), node.scaled(factor));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Move every leaf toward `target` by `t`: `a += (b - a) * t`.
    ///
    /// `t` is not clamped; a factor above 1 overshoots the target. Leaves
    /// missing from `self` snap to the target value, and fields the target
    /// no longer has are dropped.
    pub fn lerp_toward(&mut self, target: &PoseNode, t: f64) {
        match (self, target) {
            (PoseNode::Scalar(a), PoseNode::Scalar(b)) => *a += (b - *a) * t,
            (PoseNode::Group(mine), PoseNode::Group(theirs)) => {
                mine.retain(|key, _| theirs.contains_key(key));
                for (key, node) in theirs {
                    match mine.get_mut(key) {
                        Some(existing) => existing.lerp_toward(node, t),
                        None => {
                            mine.insert(key.clone(), node.clone());
                        }
                    }
                }
            }
            (current, target) => *current = target.clone(),
        }
    }

    /// Return `self` laid over `template`: every field of `template` is kept
    /// unless `self` provides it.
    pub fn merged_over(&self, template: &PoseNode) -> PoseNode {
        let mut merged = template.clone();
        merged.overlay(self);
        merged
    }

    fn overlay(&mut self, top: &PoseNode) {
        match (self, top) {
            (PoseNode::Group(mine), PoseNode::Group(theirs)) => {
                for (key, node) in theirs {
                    match mine.get_mut(key) {
                        Some(existing) => existing.overlay(node),
                        None => {
                            mine.insert(key.clone(), node.clone());
                        }
                    }
                }
            }
            (current, top) => *current = top.clone(),
        }
    }

    /// All leaves as `(path, value)` pairs in path order.
    pub fn leaves(&self) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        self.collect_leaves(String::new(), &mut out);
        out
    }

    fn collect_leaves(&self, prefix: String, out: &mut Vec<(String, f64)>) {
        match self {
            PoseNode::Scalar(v) => out.push((prefix, *v)),
            PoseNode::Group(children) => {
                for (key, child) in children {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    child.collect_leaves(path, out);
                }
            }
        }
    }

    /// Walk to the leaf at `path`, creating groups and a zero leaf on the way.
    fn leaf_slot(&mut self, path: &str) -> Result<&mut f64, PoseError> {
        let segments = split_path(path)?;
        let (last, parents) = segments.split_last().ok_or(PoseError::EmptyPath)?;

        let mut node = self;
        for segment in parents {
            let PoseNode::Group(children) = node else {
                return Err(PoseError::ThroughScalar(path.to_string()));
            };
            node = children
                .entry((*segment).to_string())
                .or_insert_with(PoseNode::group);
        }

        let PoseNode::Group(children) = node else {
            return Err(PoseError::ThroughScalar(path.to_string()));
        };
        match children
            .entry((*last).to_string())
            .or_insert(PoseNode::Scalar(0.0))
        {
            PoseNode::Scalar(v) => Ok(v),
            PoseNode::Group(_) => Err(PoseError::NotALeaf(path.to_string())),
        }
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, PoseError> {
    if path.is_empty() {
        return Err(PoseError::EmptyPath);
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(PoseError::EmptySegment(path.to_string()));
    }
    Ok(segments)
}

/// A pose tree plus its optional accent color.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub tree: PoseNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Pose {
    pub fn new(tree: PoseNode, color: Option<String>) -> Self {
        Self { tree, color }
    }
}
