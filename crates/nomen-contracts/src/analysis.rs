use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::input::{AnalysisMode, UserInput};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineNode {
    pub year: String,
    pub title: String,
    pub choice: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyTotem {
    pub kanji: String,
    pub meaning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageryDetail {
    pub literal: String,
    pub energy: String,
    pub metaphor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityDetail {
    pub self_perception: String,
    pub social_strategy: String,
    pub mindset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FortuneDetail {
    pub wealth: String,
    pub relationships: String,
    pub hidden_worries: String,
}

/// Four flat narrative layers used by the sage, psychologist and mentor personas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardReading {
    pub imagery: String,
    pub energy: String,
    pub psychology: String,
    pub sociology: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Vec<TimelineNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_totem: Option<EnergyTotem>,
}

/// Case-study layout used by the colloquial persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepReading {
    pub imagery_detail: ImageryDetail,
    pub personality_detail: PersonalityDetail,
    pub fortune_detail: FortuneDetail,
    pub timeline: Vec<TimelineNode>,
    pub energy_totem: EnergyTotem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Reading {
    Standard(StandardReading),
    Deep(DeepReading),
}

impl Reading {
    pub fn mode(&self) -> AnalysisMode {
        match self {
            Reading::Standard(_) => AnalysisMode::Standard,
            Reading::Deep(_) => AnalysisMode::Deep,
        }
    }
}

/// One finished analysis. Never mutated after the pipeline hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: String,
    /// Creation instant in epoch milliseconds.
    pub timestamp: i64,
    pub user_input: UserInput,
    pub prologue: String,
    pub summary: String,
    pub advice: String,
    pub final_question: String,
    /// Only ever fed to image generation; not meant for display.
    pub visual_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_mantra: Option<String>,
    #[serde(flatten)]
    pub reading: Reading,
}

/// Identity fields stamped onto a validated provider payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultStamp {
    pub id: String,
    pub timestamp: i64,
    pub user_input: UserInput,
    pub mode: AnalysisMode,
}

impl AnalysisResult {
    /// Builds a result from a provider payload that already passed schema validation.
    ///
    /// The stamp wins over any identity keys the provider echoed back.
    pub fn from_validated(
        stamp: ResultStamp,
        mut payload: Map<String, Value>,
    ) -> serde_json::Result<Self> {
        for key in ["id", "timestamp", "userInput", "mode", "imageUrl"] {
            payload.remove(key);
        }
        payload.insert("id".to_string(), Value::String(stamp.id));
        payload.insert("timestamp".to_string(), Value::Number(stamp.timestamp.into()));
        payload.insert(
            "userInput".to_string(),
            serde_json::to_value(&stamp.user_input)?,
        );
        payload.insert(
            "mode".to_string(),
            Value::String(stamp.mode.as_str().to_string()),
        );
        if let Some(gold) = payload.get("goldValue").and_then(crate::schema::as_integer) {
            payload.insert("goldValue".to_string(), Value::Number(gold.into()));
        }
        serde_json::from_value(Value::Object(payload))
    }

    pub fn mode(&self) -> AnalysisMode {
        self.reading.mode()
    }

    pub fn timeline(&self) -> Option<&[TimelineNode]> {
        match &self.reading {
            Reading::Standard(reading) => reading.timeline.as_deref(),
            Reading::Deep(reading) => Some(reading.timeline.as_slice()),
        }
    }

    pub fn energy_totem(&self) -> Option<&EnergyTotem> {
        match &self.reading {
            Reading::Standard(reading) => reading.energy_totem.as_ref(),
            Reading::Deep(reading) => Some(&reading.energy_totem),
        }
    }

    pub fn with_image_url(mut self, image_url: String) -> Self {
        self.image_url = Some(image_url);
        self
    }
}
