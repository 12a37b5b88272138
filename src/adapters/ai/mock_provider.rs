//! Mock completion provider for testing.
//!
//! Replays scripted replies so tests can drive the streaming path without a
//! real model.
//!
//! # Features
//!
//! - Scripted chunk sequences, consumed one per request
//! - Request rejection and mid-stream error injection
//! - Per-chunk delay for interleaving tests
//! - Request tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockCompletionProvider::new()
//!     .with_chunks(["Hel", "lo!"])
//!     .with_reply("Second turn answer");
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    CompletionChunk, CompletionError, CompletionProvider, CompletionRequest, CompletionStream,
    FinishReason, ProviderInfo,
};

const DEFAULT_REPLY: &str = "Mock response";

/// One scripted answer to a `generate` call.
#[derive(Debug, Clone)]
pub enum MockScript {
    Stream {
        chunks: Vec<String>,
        /// Emitted after the chunks instead of the end marker.
        error: Option<CompletionError>,
        end_marker: bool,
    },
    /// `generate` itself fails.
    Rejected(CompletionError),
}

impl MockScript {
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockScript::Stream {
            chunks: chunks.into_iter().map(Into::into).collect(),
            error: None,
            end_marker: true,
        }
    }

    /// Splits `content` into word chunks, keeping the separating spaces.
    pub fn reply(content: &str) -> Self {
        let words: Vec<&str> = content.split(' ').collect();
        let last = words.len().saturating_sub(1);
        Self::chunks(words.iter().enumerate().map(|(i, word)| {
            if i < last {
                format!("{} ", word)
            } else {
                (*word).to_string()
            }
        }))
    }
}

/// Mock completion provider.
#[derive(Debug, Clone)]
pub struct MockCompletionProvider {
    scripts: Arc<Mutex<VecDeque<MockScript>>>,
    info: ProviderInfo,
    chunk_delay: Duration,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompletionProvider {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            info: ProviderInfo::new("mock", "mock-model-1"),
            chunk_delay: Duration::ZERO,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a reply streamed as exactly these chunks.
    pub fn with_chunks<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_script(MockScript::chunks(chunks))
    }

    /// Queues a reply streamed word by word.
    pub fn with_reply(self, content: &str) -> Self {
        self.with_script(MockScript::reply(content))
    }

    /// Queues a rejected request.
    pub fn with_request_error(self, error: CompletionError) -> Self {
        self.with_script(MockScript::Rejected(error))
    }

    /// Ends the last queued reply with `error` instead of the end marker.
    pub fn with_stream_error(self, error: CompletionError) -> Self {
        self.modify_last(|error_slot, _| *error_slot = Some(error))
    }

    /// Closes the last queued reply without an end marker.
    pub fn without_end_marker(self) -> Self {
        self.modify_last(|_, end_marker| *end_marker = false)
    }

    pub fn with_script(self, script: MockScript) -> Self {
        lock(&self.scripts).push_back(script);
        self
    }

    /// Sleeps before yielding each stream item.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn with_provider_info(mut self, info: ProviderInfo) -> Self {
        self.info = info;
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Returns all recorded requests.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    fn modify_last(self, f: impl FnOnce(&mut Option<CompletionError>, &mut bool)) -> Self {
        {
            let mut scripts = lock(&self.scripts);
            if !matches!(scripts.back(), Some(MockScript::Stream { .. })) {
                scripts.push_back(MockScript::chunks(Vec::<String>::new()));
            }
            if let Some(MockScript::Stream {
                error, end_marker, ..
            }) = scripts.back_mut()
            {
                f(error, end_marker);
            }
        }
        self
    }

    fn next_script(&self) -> MockScript {
        lock(&self.scripts)
            .pop_front()
            .unwrap_or_else(|| MockScript::reply(DEFAULT_REPLY))
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn generate(&self, request: CompletionRequest) -> Result<CompletionStream, CompletionError> {
        lock(&self.requests).push(request);

        let (chunks, error, end_marker) = match self.next_script() {
            MockScript::Rejected(err) => return Err(err),
            MockScript::Stream {
                chunks,
                error,
                end_marker,
            } => (chunks, error, end_marker),
        };

        let mut items: Vec<Result<CompletionChunk, CompletionError>> =
            chunks.into_iter().map(|c| Ok(CompletionChunk::content(c))).collect();
        match error {
            Some(err) => items.push(Err(err)),
            None if end_marker => items.push(Ok(CompletionChunk::final_chunk(FinishReason::Stop))),
            None => {}
        }

        let delay = self.chunk_delay;
        let stream = stream::iter(items).then(move |item| async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            item
        });
        Ok(Box::pin(stream))
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ConversationId, UserId};
    use crate::ports::RequestMetadata;

    fn test_request() -> CompletionRequest {
        CompletionRequest::new(RequestMetadata::new(
            UserId::new("test-user").unwrap(),
            ConversationId::new(),
            1,
        ))
    }

    async fn collect(provider: &MockCompletionProvider) -> Vec<Result<CompletionChunk, CompletionError>> {
        provider.generate(test_request()).await.unwrap().collect().await
    }

    #[tokio::test]
    async fn streams_chunks_then_end_marker() {
        let provider = MockCompletionProvider::new().with_chunks(["Hel", "lo"]);

        let items = collect(&provider).await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Ok(CompletionChunk::content("Hel")));
        assert!(items[2].as_ref().unwrap().is_final());
    }

    #[tokio::test]
    async fn scripts_are_consumed_in_order() {
        let provider = MockCompletionProvider::new()
            .with_chunks(["first"])
            .with_chunks(["second"]);

        assert_eq!(collect(&provider).await[0], Ok(CompletionChunk::content("first")));
        assert_eq!(collect(&provider).await[0], Ok(CompletionChunk::content("second")));
    }

    #[tokio::test]
    async fn default_reply_after_exhausted() {
        let provider = MockCompletionProvider::new();

        let text: String = collect(&provider)
            .await
            .into_iter()
            .map(|item| item.unwrap().delta)
            .collect();

        assert_eq!(text, DEFAULT_REPLY);
    }

    #[tokio::test]
    async fn reply_keeps_spacing() {
        let provider = MockCompletionProvider::new().with_reply("Hello there world");

        let text: String = collect(&provider)
            .await
            .into_iter()
            .map(|item| item.unwrap().delta)
            .collect();

        assert_eq!(text, "Hello there world");
    }

    #[tokio::test]
    async fn stream_error_replaces_end_marker() {
        let provider = MockCompletionProvider::new()
            .with_chunks(["part"])
            .with_stream_error(CompletionError::Disconnected);

        let items = collect(&provider).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Err(CompletionError::Disconnected));
    }

    #[tokio::test]
    async fn without_end_marker_just_stops() {
        let provider = MockCompletionProvider::new()
            .with_chunks(["part"])
            .without_end_marker();

        let items = collect(&provider).await;

        assert_eq!(items, vec![Ok(CompletionChunk::content("part"))]);
    }

    #[tokio::test]
    async fn rejected_request_returns_error() {
        let provider =
            MockCompletionProvider::new().with_request_error(CompletionError::rate_limited(30));

        let result = provider.generate(test_request()).await;

        assert!(matches!(result, Err(CompletionError::RateLimited { retry_after_secs: 30 })));
    }

    #[tokio::test]
    async fn tracks_requests() {
        let provider = MockCompletionProvider::new();
        assert_eq!(provider.call_count(), 0);

        let _ = provider.generate(test_request()).await.unwrap();
        let _ = provider.generate(test_request()).await.unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.requests()[0].metadata.generation, 1);
    }

    #[tokio::test]
    async fn respects_chunk_delay() {
        let provider = MockCompletionProvider::new()
            .with_chunks(["a"])
            .with_chunk_delay(Duration::from_millis(20));

        let start = std::time::Instant::now();
        collect(&provider).await;

        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn returns_provider_info() {
        let provider = MockCompletionProvider::new()
            .with_provider_info(ProviderInfo::new("custom", "custom-model"));

        assert_eq!(provider.provider_info().model, "custom-model");
    }
}
