use std::fmt;

use indexmap::IndexMap;

/// What a model is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Schema-constrained JSON reading.
    Text,
    /// Single illustration from the visual prompt.
    Image,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<Capability>,
}

impl ModelSpec {
    pub fn gemini(name: &str, capability: Capability) -> Self {
        Self {
            name: name.to_string(),
            provider: "gemini".to_string(),
            capabilities: vec![capability],
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

// Preference order matters: the first entry per capability is the default.
const KNOWN_MODELS: &[(&str, Capability)] = &[
    ("gemini-3-flash-preview", Capability::Text),
    ("gemini-3-pro-preview", Capability::Text),
    ("gemini-2.5-flash", Capability::Text),
    ("gemini-2.5-pro", Capability::Text),
    ("gemini-2.5-flash-image", Capability::Image),
    ("gemini-2.5-flash-image-preview", Capability::Image),
    ("gemini-3-pro-image-preview", Capability::Image),
];

/// Models the pipeline may call, keyed by name in preference order.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::from_specs(
            KNOWN_MODELS
                .iter()
                .map(|(name, capability)| ModelSpec::gemini(name, *capability)),
        )
    }
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        models.map_or_else(Self::default, |models| Self { models })
    }

    pub fn from_specs(specs: impl IntoIterator<Item = ModelSpec>) -> Self {
        Self {
            models: specs
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    pub fn default_for(&self, capability: Capability) -> Option<&ModelSpec> {
        self.models.values().find(|model| model.supports(capability))
    }

    /// The named model, only if it can serve `capability`.
    pub fn ensure(&self, name: &str, capability: Capability) -> Option<&ModelSpec> {
        self.get(name).filter(|model| model.supports(capability))
    }
}
