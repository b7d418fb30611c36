//! Converse-style text completion over HTTP.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::ports::{CompletionPort, CompletionRequest};
use crate::error::InferenceError;

#[derive(Debug)]
pub struct HttpCompletionClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpCompletionClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest<'a> {
    model_id: &'a str,
    messages: Vec<ConverseMessage<'a>>,
    inference_config: InferenceParams,
}

#[derive(Debug, Serialize)]
struct ConverseMessage<'a> {
    role: &'static str,
    content: Vec<TextBlock<'a>>,
}

#[derive(Debug, Serialize)]
struct TextBlock<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceParams {
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ConverseResponse {
    output: ConverseOutput,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    message: OutputMessage,
}

#[derive(Debug, Deserialize)]
struct OutputMessage {
    content: Vec<OutputBlock>,
}

#[derive(Debug, Deserialize)]
struct OutputBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn request_body(request: &CompletionRequest) -> ConverseRequest<'_> {
    ConverseRequest {
        model_id: &request.model_id,
        messages: request
            .messages
            .iter()
            .map(|m| ConverseMessage {
                role: m.role.as_str(),
                content: vec![TextBlock { text: &m.text }],
            })
            .collect(),
        inference_config: InferenceParams {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        },
    }
}

/// First text block of the first output message
fn extract_text(body: &str) -> Result<String, InferenceError> {
    let response: ConverseResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::ParseError(e.to_string()))?;
    response
        .output
        .message
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or_else(|| InferenceError::ParseError("No text content in response".to_string()))
}

#[async_trait]
impl CompletionPort for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, InferenceError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&request_body(request));
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| InferenceError::RequestFailed(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| InferenceError::RequestFailed(e.to_string()))?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(InferenceError::ApiError { status, message });
        }

        extract_text(&body)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
