use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Sage,
    Psychologist,
    Mentor,
    #[default]
    Colloquial,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::Colloquial,
        Persona::Sage,
        Persona::Psychologist,
        Persona::Mentor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Persona::Sage => "sage",
            Persona::Psychologist => "psychologist",
            Persona::Mentor => "mentor",
            Persona::Colloquial => "colloquial",
        }
    }

    /// Display label used in history listings.
    pub fn label(self) -> &'static str {
        match self {
            Persona::Sage => "隐世高人",
            Persona::Psychologist => "心理咨询",
            Persona::Mentor => "毒舌导师",
            Persona::Colloquial => "通俗深度",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Persona::ALL
            .into_iter()
            .find(|persona| persona.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Unknown persona '{}'; expected one of: \
                     sage, psychologist, mentor, colloquial.",
                    raw.trim()
                )
            })
    }
}

/// The response shape requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Standard,
    Deep,
}

impl AnalysisMode {
    pub fn for_persona(persona: Persona) -> Self {
        match persona {
            Persona::Colloquial => AnalysisMode::Deep,
            Persona::Sage | Persona::Psychologist | Persona::Mentor => AnalysisMode::Standard,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisMode::Standard => "standard",
            AnalysisMode::Deep => "deep",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub name: String,
    #[serde(default)]
    pub occupation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub persona: Persona,
}

impl UserInput {
    pub fn mode(&self) -> AnalysisMode {
        AnalysisMode::for_persona(self.persona)
    }

    /// Background with blank values treated as absent.
    pub fn background(&self) -> Option<&str> {
        self.background
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("A name is required before an analysis can start.".to_string());
        }
        Ok(())
    }
}
