//! Stream reconciliation between a completion provider and an open session.
//!
//! A turn is driven by one spawned task that owns the provider stream:
//!
//! ```text
//! provider ──chunk──► lock session ─► apply_chunk(g) ─► unlock ─► Chunk event
//!          ──end────► lock session ─► persist reply ─► complete_turn(g) ─► Completed
//!          ──error──► lock session ─► fail_turn(g) ─► Failed
//! ```
//!
//! The session lock is taken per chunk and never held while waiting on the
//! provider. Once the session reports the generation as stale the task stops
//! reading and emits `Superseded`. A dropped event receiver does not cancel
//! the turn: the reply is still persisted.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::error::ChatError;
use crate::application::session_registry::SessionHandle;
use crate::domain::conversation::{ChunkOutcome, Generation, Message, Role, StreamEnd};
use crate::domain::foundation::{ConversationId, MessageId, UserId};
use crate::ports::{
    CompletionError, CompletionProvider, CompletionRequest, CompletionStream, ConversationStore,
    RequestMetadata,
};

/// Event emitted to the client while a turn runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text appended to the assistant placeholder.
    Chunk {
        generation: Generation,
        message_id: MessageId,
        delta: String,
    },
    /// The reply was persisted and replaced the placeholder.
    Completed {
        generation: Generation,
        message: Message,
    },
    Failed {
        generation: Generation,
        error: ChatError,
    },
    /// A newer turn took over the session. Nothing of this turn is kept.
    Superseded { generation: Generation },
}

impl StreamEvent {
    pub fn generation(&self) -> Generation {
        match self {
            StreamEvent::Chunk { generation, .. }
            | StreamEvent::Completed { generation, .. }
            | StreamEvent::Failed { generation, .. }
            | StreamEvent::Superseded { generation } => *generation,
        }
    }

    /// Returns true if no further events follow.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Chunk { .. })
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed(Message),
    Failed(ChatError),
    Superseded,
}

/// A running generation turn.
pub struct TurnHandle {
    pub conversation_id: ConversationId,
    pub generation: Generation,
    pub events: mpsc::Receiver<StreamEvent>,
    pub task: JoinHandle<TurnOutcome>,
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Capacity of each turn's event channel.
    pub event_buffer: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_tokens: None,
            temperature: None,
            event_buffer: 32,
        }
    }
}

/// Starts generation turns and folds their streams into sessions.
pub struct StreamReconciler {
    provider: Arc<dyn CompletionProvider>,
    store: Arc<dyn ConversationStore>,
    config: ReconcilerConfig,
}

impl StreamReconciler {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        store: Arc<dyn ConversationStore>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Requests a completion for `history` and spawns the task consuming it.
    ///
    /// The caller must already hold `generation` from `begin_turn` and must
    /// not hold the session lock.
    ///
    /// # Errors
    ///
    /// - `ProviderFailure` if the provider refuses the request; the turn is
    ///   marked failed
    pub async fn start(
        &self,
        session: SessionHandle,
        user_id: &UserId,
        generation: Generation,
        history: &[Message],
    ) -> Result<TurnHandle, ChatError> {
        let conversation_id = *session.lock().await.id();
        let request = self.request_for(user_id, conversation_id, generation, history);

        let stream = match self.provider.generate(request).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    generation = %generation,
                    error = %err,
                    "completion request rejected"
                );
                abandon(&session, generation).await;
                return Err(err.into());
            }
        };

        Ok(self.spawn(session, conversation_id, generation, stream))
    }

    /// Spawns the task folding `stream` into the session for `generation`.
    pub fn spawn(
        &self,
        session: SessionHandle,
        conversation_id: ConversationId,
        generation: Generation,
        stream: CompletionStream,
    ) -> TurnHandle {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let store = Arc::clone(&self.store);

        let task = tokio::spawn(async move {
            let outcome = run_turn(store, session, generation, stream, &tx).await;
            let event = match &outcome {
                TurnOutcome::Completed(message) => StreamEvent::Completed {
                    generation,
                    message: message.clone(),
                },
                TurnOutcome::Failed(error) => StreamEvent::Failed {
                    generation,
                    error: error.clone(),
                },
                TurnOutcome::Superseded => StreamEvent::Superseded { generation },
            };
            let _ = tx.send(event).await;
            outcome
        });

        TurnHandle {
            conversation_id,
            generation,
            events: rx,
            task,
        }
    }

    fn request_for(
        &self,
        user_id: &UserId,
        conversation_id: ConversationId,
        generation: Generation,
        history: &[Message],
    ) -> CompletionRequest {
        let metadata = RequestMetadata::new(user_id.clone(), conversation_id, generation.value());
        let mut request = CompletionRequest::from_history(
            metadata,
            self.config.system_prompt.as_deref(),
            history,
        );
        if let Some(max) = self.config.max_tokens {
            request = request.with_max_tokens(max);
        }
        if let Some(temp) = self.config.temperature {
            request = request.with_temperature(temp);
        }
        request
    }
}

async fn run_turn(
    store: Arc<dyn ConversationStore>,
    session: SessionHandle,
    generation: Generation,
    mut stream: CompletionStream,
    tx: &mpsc::Sender<StreamEvent>,
) -> TurnOutcome {
    loop {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let applied = {
                    let mut guard = session.lock().await;
                    match guard.apply_chunk(generation, &chunk.delta) {
                        ChunkOutcome::Stale => return TurnOutcome::Superseded,
                        ChunkOutcome::Skipped => None,
                        ChunkOutcome::Applied => guard.placeholder().map(|p| *p.id()),
                    }
                };

                if let Some(message_id) = applied {
                    // Receiver may be gone; the turn still runs to completion.
                    let _ = tx
                        .send(StreamEvent::Chunk {
                            generation,
                            message_id,
                            delta: chunk.delta,
                        })
                        .await;
                }

                if chunk.finish_reason.is_some() {
                    return finish(store.as_ref(), &session, generation).await;
                }
            }
            Some(Err(err)) => return fail(&session, generation, err.into()).await,
            None => return fail(&session, generation, CompletionError::Disconnected.into()).await,
        }
    }
}

async fn finish(
    store: &dyn ConversationStore,
    session: &SessionHandle,
    generation: Generation,
) -> TurnOutcome {
    // Held across persistence so an edit cannot interleave with completion.
    let mut guard = session.lock().await;
    let content = match guard.end_of_stream(generation) {
        StreamEnd::Stale => return TurnOutcome::Superseded,
        StreamEnd::Empty => {
            let _ = guard.fail_turn(generation);
            return TurnOutcome::Failed(ChatError::provider("completion produced no content", true));
        }
        StreamEnd::Ready(content) => content,
    };

    let conversation_id = *guard.id();
    match store
        .create_message(&conversation_id, Role::Assistant, &content)
        .await
    {
        Ok(message) => match guard.complete_turn(generation, message.clone()) {
            Ok(_) => {
                tracing::info!(
                    conversation_id = %conversation_id,
                    generation = %generation,
                    message_id = %message.id(),
                    "turn completed"
                );
                TurnOutcome::Completed(message)
            }
            Err(err) => TurnOutcome::Failed(err.into()),
        },
        Err(err) => {
            tracing::error!(
                conversation_id = %conversation_id,
                generation = %generation,
                error = %err,
                "failed to persist assistant reply"
            );
            let _ = guard.fail_turn(generation);
            TurnOutcome::Failed(ChatError::PersistenceFailure(err.message))
        }
    }
}

async fn fail(session: &SessionHandle, generation: Generation, error: ChatError) -> TurnOutcome {
    let mut guard = session.lock().await;
    match guard.fail_turn(generation) {
        Ok(true) => {
            tracing::warn!(
                conversation_id = %guard.id(),
                generation = %generation,
                error = %error,
                "turn failed"
            );
            TurnOutcome::Failed(error)
        }
        Ok(false) => TurnOutcome::Superseded,
        Err(err) => TurnOutcome::Failed(err.into()),
    }
}

/// Marks a turn failed before any stream existed.
async fn abandon(session: &SessionHandle, generation: Generation) {
    let mut guard = session.lock().await;
    let _ = guard.fail_turn(generation);
}
