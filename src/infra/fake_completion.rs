//! Scripted completion backend.
//!
//! Responses are served in the order they were queued. Once the queue is
//! empty the default response is used, and with no default every call
//! fails. Used by tests and by the `fake` inference backend, which runs the
//! pipeline offline and marks every record `analysis_failed`.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::app::ports::{CompletionPort, CompletionRequest};
use crate::error::InferenceError;

#[derive(Debug, Default)]
pub struct FakeCompletionClient {
    script: Mutex<VecDeque<Result<String, String>>>,
    default_response: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every call fails
    pub fn failing() -> Self {
        Self::new()
    }

    pub fn then_respond(mut self, text: &str) -> Self {
        self.script
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(text.to_string()));
        self
    }

    pub fn then_fail(mut self, message: &str) -> Self {
        self.script
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(message.to_string()));
        self
    }

    pub fn with_default_response(mut self, text: &str) -> Self {
        self.default_response = Some(text.to_string());
        self
    }

    /// Every request seen so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl CompletionPort for FakeCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, InferenceError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let next = self.script.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(InferenceError::RequestFailed(message)),
            None => self
                .default_response
                .clone()
                .ok_or_else(|| InferenceError::NotConfigured("fake backend has no response queued".to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}
