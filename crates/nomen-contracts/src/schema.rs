//! Response shapes as plain data.
//!
//! One table per [`AnalysisMode`] feeds both the provider `responseSchema`
//! and the independent validation of whatever the provider returns.

use serde_json::{json, Map, Value};

use crate::input::AnalysisMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Object(&'static [FieldSpec]),
    ArrayOf(&'static [FieldSpec]),
}

impl FieldKind {
    fn label(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Object(_) => "object",
            FieldKind::ArrayOf(_) => "array of objects",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: Option<&'static str>,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
        description: None,
    }
}

const fn described(name: &'static str, kind: FieldKind, description: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
        description: Some(description),
    }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
        description: None,
    }
}

const IMAGERY_DETAIL: &[FieldSpec] = &[
    required("literal", FieldKind::String),
    required("energy", FieldKind::String),
    required("metaphor", FieldKind::String),
];

const PERSONALITY_DETAIL: &[FieldSpec] = &[
    required("selfPerception", FieldKind::String),
    required("socialStrategy", FieldKind::String),
    required("mindset", FieldKind::String),
];

const FORTUNE_DETAIL: &[FieldSpec] = &[
    required("wealth", FieldKind::String),
    required("relationships", FieldKind::String),
    required("hiddenWorries", FieldKind::String),
];

const TIMELINE_NODE: &[FieldSpec] = &[
    required("year", FieldKind::String),
    required("title", FieldKind::String),
    required("choice", FieldKind::String),
];

const ENERGY_TOTEM: &[FieldSpec] = &[
    required("kanji", FieldKind::String),
    required("meaning", FieldKind::String),
];

const DEEP_FIELDS: &[FieldSpec] = &[
    described("prologue", FieldKind::String, "Opening judgement on the name"),
    required("imageryDetail", FieldKind::Object(IMAGERY_DETAIL)),
    required("personalityDetail", FieldKind::Object(PERSONALITY_DETAIL)),
    required("fortuneDetail", FieldKind::Object(FORTUNE_DETAIL)),
    described(
        "timeline",
        FieldKind::ArrayOf(TIMELINE_NODE),
        "Decision points for the next three years, in chronological order",
    ),
    required("energyTotem", FieldKind::Object(ENERGY_TOTEM)),
    required("summary", FieldKind::String),
    required("advice", FieldKind::String),
    required("finalQuestion", FieldKind::String),
    required("goldValue", FieldKind::Integer),
    required("dailyMantra", FieldKind::String),
    described(
        "visualPrompt",
        FieldKind::String,
        "English scene description used to paint the name",
    ),
];

const STANDARD_FIELDS: &[FieldSpec] = &[
    described("prologue", FieldKind::String, "Opening judgement on the name"),
    required("imagery", FieldKind::String),
    required("energy", FieldKind::String),
    required("psychology", FieldKind::String),
    required("sociology", FieldKind::String),
    optional("timeline", FieldKind::ArrayOf(TIMELINE_NODE)),
    optional("energyTotem", FieldKind::Object(ENERGY_TOTEM)),
    required("summary", FieldKind::String),
    required("advice", FieldKind::String),
    required("finalQuestion", FieldKind::String),
    required("goldValue", FieldKind::Integer),
    required("dailyMantra", FieldKind::String),
    described(
        "visualPrompt",
        FieldKind::String,
        "English scene description used to paint the name",
    ),
];

pub const DEEP_SCHEMA: ResponseSchema = ResponseSchema {
    mode: AnalysisMode::Deep,
    fields: DEEP_FIELDS,
};

pub const STANDARD_SCHEMA: ResponseSchema = ResponseSchema {
    mode: AnalysisMode::Standard,
    fields: STANDARD_FIELDS,
};

/// First mismatch between a provider payload and its schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{path}` expected {expected}, found {found}")]
pub struct SchemaViolation {
    pub path: String,
    pub expected: String,
    pub found: String,
}

impl SchemaViolation {
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Payload text that was not JSON at all.
    pub fn unparsable(detail: impl Into<String>) -> Self {
        Self::new("$", "JSON object", detail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSchema {
    pub mode: AnalysisMode,
    pub fields: &'static [FieldSpec],
}

impl ResponseSchema {
    pub fn for_mode(mode: AnalysisMode) -> Self {
        match mode {
            AnalysisMode::Deep => DEEP_SCHEMA,
            AnalysisMode::Standard => STANDARD_SCHEMA,
        }
    }

    pub fn required_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name)
            .collect()
    }

    /// Renders the table in the OpenAPI subset accepted as `responseSchema`.
    pub fn to_provider_schema(&self) -> Value {
        object_schema(self.fields)
    }

    /// Checks `payload` against the table and returns its top-level object.
    ///
    /// Fields outside the table pass through untouched.
    pub fn validate(&self, payload: &Value) -> Result<Map<String, Value>, SchemaViolation> {
        let Some(object) = payload.as_object() else {
            return Err(SchemaViolation::new("$", "object", describe(payload)));
        };
        validate_fields(self.fields, object, "")?;
        Ok(object.clone())
    }
}

fn object_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    for field in fields {
        let mut property = match field.kind {
            FieldKind::String => json!({ "type": "STRING" }),
            FieldKind::Integer => json!({ "type": "INTEGER" }),
            FieldKind::Object(nested) => object_schema(nested),
            FieldKind::ArrayOf(items) => json!({
                "type": "ARRAY",
                "items": object_schema(items),
            }),
        };
        if let (Some(description), Some(map)) = (field.description, property.as_object_mut()) {
            map.insert(
                "description".to_string(),
                Value::String(description.to_string()),
            );
        }
        properties.insert(field.name.to_string(), property);
    }
    let required = fields
        .iter()
        .filter(|field| field.required)
        .map(|field| Value::String(field.name.to_string()))
        .collect::<Vec<Value>>();
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

fn validate_fields(
    fields: &[FieldSpec],
    object: &Map<String, Value>,
    prefix: &str,
) -> Result<(), SchemaViolation> {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };
        match object.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    return Err(SchemaViolation::new(path, field.kind.label(), "nothing"));
                }
            }
            Some(value) => validate_value(&field.kind, value, &path)?,
        }
    }
    Ok(())
}

fn validate_value(kind: &FieldKind, value: &Value, path: &str) -> Result<(), SchemaViolation> {
    let mismatch = || SchemaViolation::new(path, kind.label(), describe(value));
    match kind {
        FieldKind::String => {
            if !value.is_string() {
                return Err(mismatch());
            }
        }
        FieldKind::Integer => {
            if as_integer(value).is_none() {
                return Err(mismatch());
            }
        }
        FieldKind::Object(nested) => {
            let object = value.as_object().ok_or_else(mismatch)?;
            validate_fields(nested, object, path)?;
        }
        FieldKind::ArrayOf(items) => {
            let rows = value.as_array().ok_or_else(mismatch)?;
            for (idx, row) in rows.iter().enumerate() {
                let row_path = format!("{path}[{idx}]");
                let object = row
                    .as_object()
                    .ok_or_else(|| SchemaViolation::new(&row_path, "object", describe(row)))?;
                validate_fields(items, object, &row_path)?;
            }
        }
    }
    Ok(())
}

/// Integral JSON numbers only; `88.0` counts, `88.5` and `"88"` do not.
pub fn as_integer(value: &Value) -> Option<i64> {
    if let Some(number) = value.as_i64() {
        return Some(number);
    }
    let float = value.as_f64()?;
    if float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        return Some(float as i64);
    }
    None
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(number) => format!("number {number}"),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}
