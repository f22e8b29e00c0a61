use serde::{Deserialize, Serialize};

/// Practice-level default materiality, e.g. `{ "type": "fixed", "value": 1000 }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefaultMateriality {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl DefaultMateriality {
    /// Numeric threshold, accepting numbers and numeric strings.
    ///
    /// Returns `None` for anything that is not a finite, non-negative amount.
    pub fn threshold(&self) -> Option<f64> {
        let value = match &self.value {
            serde_json::Value::Number(n) => n.as_f64()?,
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (value.is_finite() && value >= 0.0).then_some(value)
    }
}

/// Practice-wide defaults delivered by the settings provider.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticeSettings {
    #[serde(default)]
    pub default_materiality: Option<DefaultMateriality>,
    #[serde(default)]
    pub show_immaterial_by_default: bool,
}

/// What the settings provider currently exposes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticeSettingsState {
    pub practice_settings: Option<PracticeSettings>,
    pub is_loading: bool,
}

impl PracticeSettingsState {
    pub fn loading() -> Self {
        Self {
            practice_settings: None,
            is_loading: true,
        }
    }

    pub fn loaded(practice_settings: Option<PracticeSettings>) -> Self {
        Self {
            practice_settings,
            is_loading: false,
        }
    }
}
