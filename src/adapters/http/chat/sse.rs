//! Server-sent event framing of a generation turn.
//!
//! ```text
//! event: started     { chat, generation, message, created?, removed? }
//! event: chunk       { generation, messageId, delta }        (repeated)
//! event: completed | failed | superseded                      (exactly one)
//! ```
//!
//! Dropping the response stream does not stop the turn.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;

use crate::application::{StreamEvent, TurnHandle};

use super::dto::{
    ChunkPayload, CompletedPayload, FailedPayload, MessageResponse, SupersededPayload, TurnStarted,
};

pub const STARTED: &str = "started";
pub const CHUNK: &str = "chunk";
pub const COMPLETED: &str = "completed";
pub const FAILED: &str = "failed";
pub const SUPERSEDED: &str = "superseded";

/// Streams `started` followed by the turn's events until it ends.
pub fn turn_stream(
    started: TurnStarted,
    turn: TurnHandle,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = turn.events;
    let head = stream::once(async move { Ok(encode(STARTED, &started)) });
    let tail = stream::unfold(Some(events), |receiver| async move {
        let mut receiver = receiver?;
        let event = receiver.recv().await?;
        let next = (!event.is_terminal()).then_some(receiver);
        Some((Ok(sse_event(event)), next))
    });
    Sse::new(head.chain(tail)).keep_alive(KeepAlive::default())
}

/// Encodes one reconciler event.
pub fn sse_event(event: StreamEvent) -> Event {
    match event {
        StreamEvent::Chunk {
            generation,
            message_id,
            delta,
        } => encode(
            CHUNK,
            &ChunkPayload {
                generation,
                message_id: message_id.to_string(),
                delta,
            },
        ),
        StreamEvent::Completed {
            generation,
            message,
        } => encode(
            COMPLETED,
            &CompletedPayload {
                generation,
                message: MessageResponse::from(&message),
            },
        ),
        StreamEvent::Failed { generation, error } => {
            encode(FAILED, &FailedPayload::new(generation, &error))
        }
        StreamEvent::Superseded { generation } => {
            encode(SUPERSEDED, &SupersededPayload { generation })
        }
    }
}

fn encode(name: &'static str, payload: &impl Serialize) -> Event {
    Event::default()
        .event(name)
        .json_data(payload)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, event = name, "failed to serialize SSE event");
            Event::default().event(name).data("{}")
        })
}
