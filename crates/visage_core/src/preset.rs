//! Expression presets and the read-only catalog that holds them.

use crate::motion::MotionSpec;
use crate::pose::{Pose, PoseNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Id of the resting expression every other preset is normalized against.
pub const NEUTRAL_ID: &str = "neutral";

/// Accent used when neither the baseline nor the neutral preset has a color.
pub const DEFAULT_ACCENT: &str = "#7dd3fc";

const BUILTIN_PRESETS: &str = include_str!("../presets/default.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read preset catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid preset catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate preset id '{0}'")]
    DuplicateId(String),

    #[error("preset '{0}' has a scalar basePose; it must be a group of fields")]
    ScalarPose(String),

    #[error("preset catalog is empty")]
    Empty,
}

/// A named expression: resting pose, motion, accent color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionPreset {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub base_pose: PoseNode,
    #[serde(default)]
    pub motion_spec: MotionSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ExpressionPreset {
    /// Deep copy of the base pose together with the preset color.
    pub fn pose(&self) -> Pose {
        Pose::new(self.base_pose.clone(), self.color.clone())
    }
}

/// Immutable, ordered registry of presets.
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    presets: Vec<ExpressionPreset>,
    index: HashMap<String, usize>,
}

impl PresetCatalog {
    /// Build a catalog, rejecting duplicates. When a `neutral` preset is
    /// present every other preset's pose is laid over it so all presets carry
    /// the full field set.
    pub fn from_presets(mut presets: Vec<ExpressionPreset>) -> Result<Self, CatalogError> {
        if presets.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut index = HashMap::with_capacity(presets.len());
        for (i, preset) in presets.iter().enumerate() {
            if !preset.base_pose.is_group() {
                return Err(CatalogError::ScalarPose(preset.id.clone()));
            }
            if index.insert(preset.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateId(preset.id.clone()));
            }
        }

        if let Some(&neutral) = index.get(NEUTRAL_ID) {
            let template = presets[neutral].base_pose.clone();
            for preset in presets.iter_mut().filter(|p| p.id != NEUTRAL_ID) {
                preset.base_pose = preset.base_pose.merged_over(&template);
            }
        }

        Ok(Self { presets, index })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let presets: Vec<ExpressionPreset> = serde_json::from_str(json)?;
        Self::from_presets(presets)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        tracing::info!("Loaded {} presets from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// The preset set compiled into the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_PRESETS)
    }

    pub fn lookup(&self, id: &str) -> Option<&ExpressionPreset> {
        self.index.get(id).map(|&i| &self.presets[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpressionPreset> {
        self.presets.iter()
    }

    /// Preset ids in catalog order.
    pub fn ids(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn neutral(&self) -> Option<&ExpressionPreset> {
        self.lookup(NEUTRAL_ID)
    }

    /// The catalog-neutral accent color.
    pub fn neutral_color(&self) -> &str {
        self.neutral()
            .and_then(|p| p.color.as_deref())
            .unwrap_or(DEFAULT_ACCENT)
    }

    /// Pose the face rests in before any selection: the neutral preset, or
    /// the first preset when there is no neutral.
    pub fn resting(&self) -> &ExpressionPreset {
        self.neutral().unwrap_or(&self.presets[0])
    }
}
