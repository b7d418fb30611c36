use async_trait::async_trait;

use crate::error::{InferenceError, Result};

/// Key/value object storage. Keys are hierarchical strings; writes are plain
/// overwrites with no versioning or conditional semantics.
#[async_trait]
pub trait BlobStorePort: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

// Fetch-side port
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpGetResult>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

/// One text-completion call: model, conversation and sampling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model_id: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn single_prompt(model_id: &str, prompt: String, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model_id: model_id.to_string(),
            messages: vec![ChatMessage {
                role: Role::User,
                text: prompt,
            }],
            temperature,
            max_tokens,
        }
    }
}

/// Opaque text-completion backend. Returns the generated text only.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, InferenceError>;

    fn backend_name(&self) -> &'static str;
}
