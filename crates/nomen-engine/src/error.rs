use nomen_contracts::schema::SchemaViolation;

/// Terminal outcomes of [`crate::ResultPipeline::generate`].
///
/// Image-step failures never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    /// No usable API credential.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The text call failed at the transport or provider level.
    #[error("generation failed: {0}")]
    GenerationFailed(String),
    /// The text call succeeded but carried no text.
    #[error("provider returned an empty response")]
    EmptyResponse,
    #[error("response does not match schema: {0}")]
    SchemaViolation(#[from] SchemaViolation),
}

impl GenerateError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerateError::Configuration(_) => "configuration_error",
            GenerateError::GenerationFailed(_) => "generation_failed",
            GenerateError::EmptyResponse => "empty_response",
            GenerateError::SchemaViolation(_) => "schema_violation",
        }
    }

    pub(crate) fn from_anyhow(err: &anyhow::Error) -> Self {
        GenerateError::GenerationFailed(error_chain_text(err, 600))
    }
}

/// Flattens an error chain into one line, skipping repeated causes.
pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing: &String| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
