use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use nomen_contracts::analysis::{AnalysisResult, ResultStamp};
use nomen_contracts::events::EventLog;
use nomen_contracts::input::{AnalysisMode, UserInput};
use nomen_contracts::models::{Capability, ModelSelector, ModelSpec};
use nomen_contracts::schema::{ResponseSchema, SchemaViolation};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{error_chain_text, GenerateError};
use crate::prompt;
use crate::provider::{GeminiClient, GenerativeClient, ImageRequest, TextRequest};

pub const IMAGE_ASPECT_RATIO: &str = "1:1";

static LAST_STAMP_MS: AtomicI64 = AtomicI64::new(0);

/// Turns a [`UserInput`] into an [`AnalysisResult`].
///
/// One mandatory text call, then one best-effort image call. Holds no
/// mutable state, so a single pipeline can serve concurrent callers.
pub struct ResultPipeline {
    client: Arc<dyn GenerativeClient>,
    config: PipelineConfig,
    model_selector: ModelSelector,
    events: Option<EventLog>,
}

impl ResultPipeline {
    /// Never fails: credentials are only looked at inside [`Self::generate`].
    pub fn new(client: Arc<dyn GenerativeClient>, config: PipelineConfig) -> Self {
        Self {
            client,
            config,
            model_selector: ModelSelector::default(),
            events: None,
        }
    }

    pub fn gemini(config: PipelineConfig) -> Self {
        Self::new(Arc::new(GeminiClient::new()), config)
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_model_selector(mut self, model_selector: ModelSelector) -> Self {
        self.model_selector = model_selector;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    pub fn generate(&self, input: &UserInput) -> Result<AnalysisResult, GenerateError> {
        let mode = AnalysisMode::for_persona(input.persona);
        self.observe(
            "analysis_started",
            json!({
                "persona": input.persona.as_str(),
                "mode": mode.as_str(),
                "provider": self.client.name(),
            }),
        );

        let outcome = self.resolve_api_key().and_then(|api_key| {
            self.generate_reading(input, mode, &api_key)
                .map(|result| (result, api_key))
        });
        let (result, api_key) = match outcome {
            Ok(ok) => ok,
            Err(err) => {
                self.observe(
                    "analysis_failed",
                    json!({
                        "kind": err.kind(),
                        "error": err.to_string(),
                    }),
                );
                return Err(err);
            }
        };

        Ok(self.attach_image(result, &api_key))
    }

    fn resolve_api_key(&self) -> Result<String, GenerateError> {
        self.config.resolve_api_key().ok_or_else(|| {
            GenerateError::Configuration(format!(
                "no API key configured; pass one explicitly or set {}",
                self.config.api_key_env.join(" or ")
            ))
        })
    }

    fn generate_reading(
        &self,
        input: &UserInput,
        mode: AnalysisMode,
        api_key: &str,
    ) -> Result<AnalysisResult, GenerateError> {
        let model = self
            .select_model(&self.config.text_model, Capability::Text)
            .map_err(GenerateError::GenerationFailed)?;
        let bundle = prompt::build_prompt(input, mode);
        let schema = ResponseSchema::for_mode(mode);

        let response = self
            .client
            .generate_text(&TextRequest {
                api_key: api_key.to_string(),
                model: model.name.clone(),
                prompt: bundle.prompt,
                system_instruction: bundle.system_instruction.to_string(),
                response_schema: schema.to_provider_schema(),
                timeout_s: self.config.request_timeout_s,
            })
            .map_err(|err| GenerateError::from_anyhow(&err))?;

        let text = response
            .text
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerateError::EmptyResponse)?;
        let payload: Value = serde_json::from_str(strip_code_fence(&text)).map_err(|err| {
            SchemaViolation::unparsable(format!("unparsable text ({err})"))
        })?;
        let fields = schema.validate(&payload)?;

        let stamp = ResultStamp {
            id: Uuid::new_v4().to_string(),
            timestamp: next_timestamp_millis(),
            user_input: input.clone(),
            mode,
        };
        let result = AnalysisResult::from_validated(stamp, fields)
            .map_err(|err| SchemaViolation::new("$", format!("{mode} reading"), err.to_string()))?;

        self.observe(
            "text_generated",
            json!({
                "id": result.id,
                "model": model.name,
                "mode": mode.as_str(),
                "usage": response.usage,
            }),
        );
        Ok(result)
    }

    fn attach_image(&self, result: AnalysisResult, api_key: &str) -> AnalysisResult {
        if !self.config.image_enabled {
            self.observe(
                "image_skipped",
                json!({ "id": result.id, "reason": "disabled" }),
            );
            return result;
        }
        match self.paint(&result.visual_prompt, api_key) {
            Ok(image_url) => {
                self.observe(
                    "image_attached",
                    json!({ "id": result.id, "bytes": image_url.len() }),
                );
                result.with_image_url(image_url)
            }
            Err(err) => {
                self.observe(
                    "image_skipped",
                    json!({
                        "id": result.id,
                        "reason": "error",
                        "error": error_chain_text(&err, 600),
                    }),
                );
                result
            }
        }
    }

    fn paint(&self, visual_prompt: &str, api_key: &str) -> anyhow::Result<String> {
        let model = self
            .select_model(&self.config.image_model, Capability::Image)
            .map_err(|reason| anyhow!(reason))?;
        let response = self.client.generate_image(&ImageRequest {
            api_key: api_key.to_string(),
            model: model.name,
            prompt: prompt::image_prompt(visual_prompt),
            aspect_ratio: IMAGE_ASPECT_RATIO.to_string(),
            timeout_s: self.config.request_timeout_s,
        })?;
        let Some((mime_type, bytes)) = response.first_inline_image() else {
            bail!("image response carried no inline image data");
        };
        Ok(format!(
            "data:{};base64,{}",
            mime_type.unwrap_or("image/png"),
            BASE64.encode(bytes)
        ))
    }

    fn select_model(&self, requested: &str, capability: Capability) -> Result<ModelSpec, String> {
        let selection = self.model_selector.select(Some(requested), capability)?;
        if let Some(reason) = selection.fallback_reason.as_deref() {
            self.observe(
                "model_fallback",
                json!({
                    "capability": capability.as_str(),
                    "requested": selection.requested,
                    "model": selection.model.name,
                    "reason": reason,
                }),
            );
        }
        Ok(selection.model)
    }

    fn observe(&self, event_type: &str, payload: Value) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let payload: Map<String, Value> = payload.as_object().cloned().unwrap_or_default();
        // The event log never decides the outcome of a generation.
        let _ = events.emit(event_type, payload);
    }
}

/// Wall-clock millis, clamped so stamps never go backwards within the process.
fn next_timestamp_millis() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let previous = LAST_STAMP_MS.fetch_max(now, Ordering::SeqCst);
    previous.max(now)
}

/// Drops a surrounding Markdown code fence, which some models add despite the JSON mime type.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.strip_suffix("```").unwrap_or(rest);
    let body = body.strip_prefix("json").unwrap_or(body);
    body.trim()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use base64::Engine as _;
    use nomen_contracts::analysis::Reading;
    use nomen_contracts::events::{read_events, EventLog};
    use nomen_contracts::input::{AnalysisMode, Persona, UserInput};
    use nomen_contracts::models::{Capability, ModelRegistry, ModelSelector, ModelSpec};
    use serde_json::{json, Value};

    use super::{strip_code_fence, ResultPipeline, BASE64};
    use crate::config::PipelineConfig;
    use crate::error::GenerateError;
    use crate::provider::{
        ContentPart, GenerativeClient, ImageRequest, ImageResponse, TextRequest, TextResponse,
    };

    type TextScript = Box<dyn Fn(&TextRequest) -> Result<TextResponse> + Send + Sync>;
    type ImageScript = Box<dyn Fn(&ImageRequest) -> Result<ImageResponse> + Send + Sync>;

    struct ScriptedClient {
        text: TextScript,
        image: ImageScript,
        text_calls: Mutex<Vec<TextRequest>>,
        image_calls: Mutex<Vec<ImageRequest>>,
    }

    impl ScriptedClient {
        fn new(text: TextScript, image: ImageScript) -> Arc<Self> {
            Arc::new(Self {
                text,
                image,
                text_calls: Mutex::new(Vec::new()),
                image_calls: Mutex::new(Vec::new()),
            })
        }

        fn text_calls(&self) -> Vec<TextRequest> {
            self.text_calls.lock().map(|rows| rows.clone()).unwrap_or_default()
        }

        fn image_calls(&self) -> Vec<ImageRequest> {
            self.image_calls.lock().map(|rows| rows.clone()).unwrap_or_default()
        }
    }

    impl GenerativeClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate_text(&self, request: &TextRequest) -> Result<TextResponse> {
            if let Ok(mut calls) = self.text_calls.lock() {
                calls.push(request.clone());
            }
            (self.text)(request)
        }

        fn generate_image(&self, request: &ImageRequest) -> Result<ImageResponse> {
            if let Ok(mut calls) = self.image_calls.lock() {
                calls.push(request.clone());
            }
            (self.image)(request)
        }
    }

    fn text_ok(payload: Value) -> TextScript {
        let text = payload.to_string();
        Box::new(move |_: &TextRequest| -> Result<TextResponse> {
            Ok(TextResponse {
                text: Some(text.clone()),
                usage: Value::Null,
            })
        })
    }

    fn image_ok() -> ImageScript {
        Box::new(|_: &ImageRequest| -> Result<ImageResponse> {
            Ok(ImageResponse {
                parts: vec![
                    ContentPart::Text("here you go".to_string()),
                    ContentPart::InlineImage {
                        mime_type: Some("image/png".to_string()),
                        bytes: b"png-bytes".to_vec(),
                    },
                ],
            })
        })
    }

    fn image_timeout() -> ImageScript {
        Box::new(|_: &ImageRequest| -> Result<ImageResponse> {
            Err(anyhow!("operation timed out").context("Gemini request failed"))
        })
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            api_key: Some("test-key".to_string()),
            api_key_env: Vec::new(),
            ..PipelineConfig::default()
        }
    }

    fn input(persona: Persona) -> UserInput {
        UserInput {
            name: "Lin".to_string(),
            occupation: "Engineer".to_string(),
            background: None,
            location: "Remote".to_string(),
            persona,
        }
    }

    fn standard_payload() -> Value {
        json!({
            "prologue": "名如其人",
            "imagery": "林木成森",
            "energy": "木气旺盛",
            "psychology": "沉静内敛",
            "sociology": "稳中求进",
            "summary": "s",
            "advice": "a",
            "finalQuestion": "q",
            "goldValue": 880,
            "dailyMantra": "m",
            "visualPrompt": "a quiet forest at dawn",
        })
    }

    fn deep_payload() -> Value {
        json!({
            "prologue": "p",
            "imageryDetail": {"literal": "l", "energy": "e", "metaphor": "m"},
            "personalityDetail": {"selfPerception": "s", "socialStrategy": "o", "mindset": "m"},
            "fortuneDetail": {"wealth": "w", "relationships": "r", "hiddenWorries": "h"},
            "timeline": [
                {"year": "2026", "title": "破局", "choice": "c1"},
                {"year": "2027", "title": "立势", "choice": "c2"},
                {"year": "2028", "title": "成器", "choice": "c3"},
            ],
            "energyTotem": {"kanji": "森", "meaning": "many trees stand together"},
            "summary": "s",
            "advice": "a",
            "finalQuestion": "q",
            "goldValue": 1200,
            "dailyMantra": "d",
            "visualPrompt": "a lone crane over misty water",
        })
    }

    #[test]
    fn deep_mode_success_carries_timeline_and_totem() -> Result<()> {
        let client = ScriptedClient::new(text_ok(deep_payload()), image_ok());
        let pipeline = ResultPipeline::new(client.clone(), config());

        let result = pipeline.generate(&input(Persona::Colloquial))?;
        assert_eq!(result.mode(), AnalysisMode::Deep);
        assert_eq!(result.timeline().map(<[_]>::len), Some(3));
        assert!(result
            .energy_totem()
            .map(|totem| !totem.kanji.is_empty())
            .unwrap_or(false));
        assert!(matches!(result.reading, Reading::Deep(_)));
        assert_eq!(result.user_input, input(Persona::Colloquial));

        let calls = client.text_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].api_key, "test-key");
        assert_eq!(calls[0].model, "gemini-3-flash-preview");
        assert!(calls[0].prompt.contains("Name: Lin"));
        assert!(calls[0].prompt.contains("Background: Not specified"));
        assert_eq!(
            calls[0].response_schema["properties"]["timeline"]["type"],
            json!("ARRAY")
        );
        Ok(())
    }

    #[test]
    fn persona_decides_mode_and_schema() -> Result<()> {
        for persona in Persona::ALL {
            let payload = if persona == Persona::Colloquial {
                deep_payload()
            } else {
                standard_payload()
            };
            let client = ScriptedClient::new(text_ok(payload), image_ok());
            let pipeline = ResultPipeline::new(client.clone(), config());
            let result = pipeline.generate(&input(persona))?;

            let expected = if persona == Persona::Colloquial {
                AnalysisMode::Deep
            } else {
                AnalysisMode::Standard
            };
            assert_eq!(result.mode(), expected, "{persona}");
            let schema = &client.text_calls()[0].response_schema;
            let has_deep_fields = schema["properties"].get("imageryDetail").is_some();
            assert_eq!(has_deep_fields, expected == AnalysisMode::Deep, "{persona}");
        }
        Ok(())
    }

    #[test]
    fn missing_required_field_is_a_schema_violation() {
        let mut payload = standard_payload();
        payload.as_object_mut().map(|map| map.remove("sociology"));
        let client = ScriptedClient::new(text_ok(payload), image_ok());
        let pipeline = ResultPipeline::new(client.clone(), config());

        let err = pipeline.generate(&input(Persona::Sage)).unwrap_err();
        match err {
            GenerateError::SchemaViolation(violation) => assert_eq!(violation.path, "sociology"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(client.image_calls().is_empty());
    }

    #[test]
    fn malformed_optional_field_reports_its_own_path() {
        let mut payload = standard_payload();
        payload["energyTotem"] = json!("森");
        let client = ScriptedClient::new(text_ok(payload), image_ok());
        let pipeline = ResultPipeline::new(client.clone(), config());

        let err = pipeline.generate(&input(Persona::Mentor)).unwrap_err();
        match err {
            GenerateError::SchemaViolation(violation) => {
                assert_eq!(violation.path, "energyTotem");
                assert_eq!(violation.expected, "object");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(client.image_calls().is_empty());
    }

    #[test]
    fn registry_without_text_model_fails_generation() {
        let registry = ModelRegistry::from_specs([ModelSpec::gemini(
            "gemini-2.5-flash-image",
            Capability::Image,
        )]);
        let client = ScriptedClient::new(text_ok(standard_payload()), image_ok());
        let pipeline = ResultPipeline::new(client.clone(), config())
            .with_model_selector(ModelSelector::new(Some(registry)));

        let err = pipeline.generate(&input(Persona::Sage)).unwrap_err();
        assert_eq!(err.kind(), "generation_failed");
        assert!(err.to_string().contains("No models available"));
        assert!(client.text_calls().is_empty());
    }

    #[test]
    fn wrong_mode_payload_is_a_schema_violation() {
        let client = ScriptedClient::new(text_ok(standard_payload()), image_ok());
        let pipeline = ResultPipeline::new(client, config());
        let err = pipeline.generate(&input(Persona::Colloquial)).unwrap_err();
        assert_eq!(err.kind(), "schema_violation");
    }

    #[test]
    fn unparsable_text_is_a_schema_violation() {
        let client = ScriptedClient::new(
            Box::new(|_: &TextRequest| -> Result<TextResponse> {
                Ok(TextResponse {
                    text: Some("the stars are silent today".to_string()),
                    usage: Value::Null,
                })
            }),
            image_ok(),
        );
        let pipeline = ResultPipeline::new(client, config());
        let err = pipeline.generate(&input(Persona::Mentor)).unwrap_err();
        assert_eq!(err.kind(), "schema_violation");
    }

    #[test]
    fn empty_text_is_an_empty_response() {
        for text in [None, Some("   ".to_string())] {
            let client = ScriptedClient::new(
                Box::new(move |_: &TextRequest| -> Result<TextResponse> {
                    Ok(TextResponse {
                        text: text.clone(),
                        usage: Value::Null,
                    })
                }),
                image_ok(),
            );
            let pipeline = ResultPipeline::new(client, config());
            let err = pipeline.generate(&input(Persona::Sage)).unwrap_err();
            assert_eq!(err, GenerateError::EmptyResponse);
        }
    }

    #[test]
    fn text_transport_failure_is_terminal_and_not_retried() {
        let client = ScriptedClient::new(
            Box::new(|_: &TextRequest| -> Result<TextResponse> {
                Err(anyhow!("Gemini request failed (503): overloaded"))
            }),
            image_ok(),
        );
        let pipeline = ResultPipeline::new(client.clone(), config());
        let err = pipeline.generate(&input(Persona::Psychologist)).unwrap_err();
        match err {
            GenerateError::GenerationFailed(message) => assert!(message.contains("503")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.text_calls().len(), 1);
        assert!(client.image_calls().is_empty());
    }

    #[test]
    fn image_timeout_still_returns_the_reading() -> Result<()> {
        let painted = ResultPipeline::new(
            ScriptedClient::new(text_ok(standard_payload()), image_ok()),
            config(),
        )
        .generate(&input(Persona::Sage))?;
        let unpainted = ResultPipeline::new(
            ScriptedClient::new(text_ok(standard_payload()), image_timeout()),
            config(),
        )
        .generate(&input(Persona::Sage))?;

        assert!(painted.image_url.is_some());
        assert!(unpainted.image_url.is_none());
        assert_eq!(painted.reading, unpainted.reading);
        assert_eq!(painted.prologue, unpainted.prologue);
        assert_eq!(painted.gold_value, unpainted.gold_value);
        assert_eq!(painted.visual_prompt, unpainted.visual_prompt);
        Ok(())
    }

    #[test]
    fn image_without_inline_data_is_skipped() -> Result<()> {
        let client = ScriptedClient::new(
            text_ok(standard_payload()),
            Box::new(|_: &ImageRequest| -> Result<ImageResponse> {
                Ok(ImageResponse {
                    parts: vec![ContentPart::Text("no picture today".to_string())],
                })
            }),
        );
        let result = ResultPipeline::new(client, config()).generate(&input(Persona::Mentor))?;
        assert!(result.image_url.is_none());
        Ok(())
    }

    #[test]
    fn first_inline_image_becomes_data_uri() -> Result<()> {
        let client = ScriptedClient::new(text_ok(standard_payload()), image_ok());
        let result =
            ResultPipeline::new(client.clone(), config()).generate(&input(Persona::Sage))?;
        assert_eq!(
            result.image_url,
            Some(format!("data:image/png;base64,{}", BASE64.encode(b"png-bytes")))
        );

        let calls = client.image_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].aspect_ratio, "1:1");
        assert_eq!(calls[0].model, "gemini-2.5-flash-image");
        assert!(calls[0].prompt.starts_with("a quiet forest at dawn, "));
        assert!(calls[0].prompt.contains("ink wash"));
        Ok(())
    }

    #[test]
    fn disabled_image_step_makes_no_image_call() -> Result<()> {
        let client = ScriptedClient::new(text_ok(standard_payload()), image_ok());
        let config = PipelineConfig {
            image_enabled: false,
            ..config()
        };
        let result = ResultPipeline::new(client.clone(), config).generate(&input(Persona::Sage))?;
        assert!(result.image_url.is_none());
        assert!(client.image_calls().is_empty());
        Ok(())
    }

    #[test]
    fn successive_results_get_distinct_ids_and_ordered_timestamps() -> Result<()> {
        let pipeline = ResultPipeline::new(
            ScriptedClient::new(text_ok(standard_payload()), image_ok()),
            config(),
        );
        let first = pipeline.generate(&input(Persona::Sage))?;
        let second = pipeline.generate(&input(Persona::Sage))?;
        assert_ne!(first.id, second.id);
        assert!(second.timestamp >= first.timestamp);
        Ok(())
    }

    #[test]
    fn missing_credential_fails_only_on_generate() {
        let client = ScriptedClient::new(text_ok(standard_payload()), image_ok());
        let pipeline = ResultPipeline::new(
            client.clone(),
            PipelineConfig {
                api_key: None,
                api_key_env: vec!["NOMEN_TEST_KEY_THAT_IS_NEVER_SET".to_string()],
                ..PipelineConfig::default()
            },
        );
        let err = pipeline.generate(&input(Persona::Sage)).unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
        assert!(err.to_string().contains("NOMEN_TEST_KEY_THAT_IS_NEVER_SET"));
        assert!(client.text_calls().is_empty());
    }

    #[test]
    fn unknown_model_falls_back_and_is_recorded() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let client = ScriptedClient::new(text_ok(standard_payload()), image_timeout());
        let pipeline = ResultPipeline::new(
            client.clone(),
            PipelineConfig {
                text_model: "gemini-0-imaginary".to_string(),
                ..config()
            },
        )
        .with_events(EventLog::new(&events_path, "session-1"));
        pipeline.generate(&input(Persona::Sage))?;

        assert_eq!(client.text_calls()[0].model, "gemini-3-flash-preview");
        let events = read_events(&events_path)?;
        let types: Vec<&str> = events
            .iter()
            .filter_map(|row| row.get("type").and_then(Value::as_str))
            .collect();
        assert_eq!(
            types,
            vec!["analysis_started", "model_fallback", "text_generated", "image_skipped"]
        );
        let skipped = &events[3];
        assert_eq!(skipped["reason"], json!("error"));
        assert!(skipped["error"]
            .as_str()
            .unwrap_or_default()
            .contains("timed out"));
        Ok(())
    }

    #[test]
    fn failures_are_recorded_in_the_event_log() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let mut payload = standard_payload();
        payload["goldValue"] = json!("a lot");
        let pipeline = ResultPipeline::new(
            ScriptedClient::new(text_ok(payload), image_ok()),
            config(),
        )
        .with_events(EventLog::new(&events_path, "session-1"));
        assert!(pipeline.generate(&input(Persona::Sage)).is_err());

        let events = read_events(&events_path)?;
        let last = events.last().cloned().unwrap_or(Value::Null);
        assert_eq!(last["type"], json!("analysis_failed"));
        assert_eq!(last["kind"], json!("schema_violation"));
        Ok(())
    }

    #[test]
    fn strip_code_fence_handles_fenced_json() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn fenced_provider_text_still_parses() -> Result<()> {
        let fenced = format!("```json\n{}\n```", standard_payload());
        let client = ScriptedClient::new(
            Box::new(move |_: &TextRequest| -> Result<TextResponse> {
                Ok(TextResponse {
                    text: Some(fenced.clone()),
                    usage: Value::Null,
                })
            }),
            image_ok(),
        );
        let result = ResultPipeline::new(client, config()).generate(&input(Persona::Sage))?;
        assert_eq!(result.mode(), AnalysisMode::Standard);
        Ok(())
    }
}
