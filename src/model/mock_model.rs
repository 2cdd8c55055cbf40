//! # Mock Completion Model for Testing
//!
//! Provides a `MockCompletionModel` that implements the `CompletionModel` trait
//! for use in tests. Responses can be queued so consecutive calls (a listing
//! extraction followed by detail extractions) see different answers, and a
//! fallback response or error covers every call after the queue drains.

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    one_or_many::OneOrMany,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Scripted {
    Reply(OneOrMany<AssistantContent>),
    Fail(String),
}

/// A mock completion model for testing purposes.
#[derive(Debug, Clone)]
pub struct MockCompletionModel {
    queue: Arc<Mutex<VecDeque<Scripted>>>,
    fallback: Arc<Mutex<Option<Scripted>>>,
    calls: Arc<AtomicUsize>,
}

impl MockCompletionModel {
    /// Creates a new mock model that will return a default empty success response.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sets the response returned once the queue is empty.
    pub async fn set_response(&self, response: OneOrMany<AssistantContent>) {
        *self.fallback.lock().await = Some(Scripted::Reply(response));
    }

    /// Helper to create a simple text response.
    pub async fn set_text_response(&self, text: &str) {
        self.set_response(OneOrMany::one(AssistantContent::text(text)))
            .await;
    }

    /// Makes every call after the queue drains fail with a provider error.
    pub async fn set_error(&self, message: &str) {
        *self.fallback.lock().await = Some(Scripted::Fail(message.to_string()));
    }

    /// Queues a text response for the next unanswered call.
    pub async fn push_text_response(&self, text: &str) {
        self.queue
            .lock()
            .await
            .push_back(Scripted::Reply(OneOrMany::one(AssistantContent::text(text))));
    }

    /// Number of completion calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockCompletionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        _completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queue.lock().await.pop_front();
        let scripted = match next {
            Some(scripted) => Some(scripted),
            None => self.fallback.lock().await.clone(),
        };
        match scripted {
            Some(Scripted::Reply(choice)) => Ok(CompletionResponse {
                choice,
                raw_response: "".to_string(),
            }),
            Some(Scripted::Fail(message)) => Err(CompletionError::ProviderError(message)),
            None => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text("")),
                raw_response: "".to_string(),
            }),
        }
    }
}
