use serde::{Deserialize, Serialize};
use visage_core::{ExpressionPreset, PushOutcome};
use visage_expression::ManualValue;

/// `POST /impulse` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpulseRequest {
    pub preset: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpulseResponse {
    pub outcome: PushOutcome,
}

/// `POST /preset` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRequest {
    pub id: String,
}

/// `POST /manual` body. `value` is a number, or a color string for `color`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualRequest {
    pub path: String,
    pub value: ManualValue,
}

/// One entry of `GET /presets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetSummary {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&ExpressionPreset> for PresetSummary {
    fn from(preset: &ExpressionPreset) -> Self {
        Self {
            id: preset.id.clone(),
            label: preset.label.clone(),
            color: preset.color.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
