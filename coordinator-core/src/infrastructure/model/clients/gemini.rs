//! Gemini client implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::config::AppConfig;
use crate::infrastructure::model::traits::ModelProvider;
use crate::infrastructure::model::types::{
    FunctionDeclaration, ModelError, ModelRequest, ModelResponse,
};
use crate::types::{Content, FunctionCall, FunctionResponse, Part, Role};

/// Gemini client for Google AI, with function calling.
#[derive(Clone)]
pub struct GeminiClient {
    base: HttpClientBase,
    api_path: String,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_path: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            base: HttpClientBase::new("gemini".to_string(), endpoint.into(), api_key),
            api_path: api_path.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.endpoint.clone(),
            config.api_path.clone(),
            Some(config.credentials.api_key.clone()),
        )
    }

    fn build_model_url(&self, model: &str) -> String {
        self.base.build_url(&format!(
            "{}/{model}:generateContent",
            self.api_path.trim_matches('/')
        ))
    }
}

#[async_trait]
impl ModelProvider for GeminiClient {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.build_model_url(&request.model);
        let payload = GenerateContentRequest::from(&request);

        info!(
            provider = self.base.id.as_str(),
            model = request.model.as_str(),
            contents = request.contents.len(),
            tools = request.tools.len(),
            "Sending request to Gemini"
        );

        let response: GenerateContentResponse =
            self.base.post_with_query_key(&url, &payload).await?;
        debug!("Received response from Gemini");

        if let Some(error) = response.error {
            return Err(ModelError::invalid_response(&self.base.id, error.message));
        }

        let candidate = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::invalid_response(&self.base.id, "missing candidates"))?;

        let parts = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .map(Part::from)
            .collect();

        Ok(ModelResponse {
            content: Content::new(Role::Model, parts),
            finish_reason: candidate.finish_reason,
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

impl From<&ModelRequest> for GenerateContentRequest {
    fn from(request: &ModelRequest) -> Self {
        let contents = request
            .contents
            .iter()
            .map(|content| WireContent {
                role: Some(content.role.as_str().to_string()),
                parts: content.parts.iter().filter_map(WirePart::from_part).collect(),
            })
            .filter(|content| !content.parts.is_empty())
            .collect();

        let system_instruction = request
            .system_instruction
            .as_ref()
            .filter(|text| !text.trim().is_empty())
            .map(|text| WireContent {
                role: None,
                parts: vec![WirePart {
                    text: Some(text.clone()),
                    ..WirePart::default()
                }],
            });

        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![WireTool {
                function_declarations: request.tools.clone(),
            }]
        };

        Self {
            contents,
            system_instruction,
            tools,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        rename = "functionCall",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    function_call: Option<WireFunctionCall>,
    #[serde(
        rename = "functionResponse",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    function_response: Option<WireFunctionResponse>,
}

impl WirePart {
    fn from_part(part: &Part) -> Option<Self> {
        match part {
            Part::Text { text } => Some(WirePart {
                text: Some(text.clone()),
                ..WirePart::default()
            }),
            // Call ids are minted locally; Gemini matches responses by name
            // and position.
            Part::FunctionCall(call) => Some(WirePart {
                function_call: Some(WireFunctionCall {
                    name: call.name.clone(),
                    args: call.args.clone(),
                    id: None,
                }),
                ..WirePart::default()
            }),
            Part::FunctionResponse(response) => Some(WirePart {
                function_response: Some(WireFunctionResponse {
                    name: response.name.clone(),
                    response: as_object(response.response.clone()),
                }),
                ..WirePart::default()
            }),
            Part::Other => None,
        }
    }
}

impl From<WirePart> for Part {
    fn from(part: WirePart) -> Self {
        if let Some(call) = part.function_call {
            return Part::FunctionCall(FunctionCall {
                id: call.id.unwrap_or_default(),
                name: call.name,
                args: call.args,
            });
        }
        if let Some(response) = part.function_response {
            return Part::FunctionResponse(FunctionResponse {
                id: String::new(),
                name: response.name,
                response: response.response,
            });
        }
        match part.text {
            Some(text) => Part::Text { text },
            None => Part::Other,
        }
    }
}

/// Gemini only accepts objects as function responses.
fn as_object(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        other => json!({ "result": other }),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
struct WireTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<WireContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}
