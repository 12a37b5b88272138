//! In-memory view of one open conversation.
//!
//! `ConversationSession` owns the ordered message list the UI reads and the
//! state of the current generation turn. It performs no I/O: callers load it
//! from the store and persist what it tells them to.
//!
//! # Turn protocol
//!
//! ```text
//! begin_turn() ─► Generation g          (Busy if a turn is active)
//! apply_chunk(g, "Hel")                 first chunk appends the placeholder
//! apply_chunk(g, "lo!")
//! end_of_stream(g) ─► Ready("Hello!")   caller persists the content
//! complete_turn(g, persisted)           placeholder replaced by the record
//! ```
//!
//! Every turn call carries its generation. Calls for an older generation are
//! answered with `Stale` / `false` and change nothing.

use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, MessageId, StateMachine,
};

use super::aggregate::Conversation;
use super::message::{validate_content, Message};
use super::state::{Generation, StreamState};

/// Result of feeding one chunk to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Text appended to the placeholder.
    Applied,
    /// Empty chunk, nothing to do.
    Skipped,
    /// Chunk belongs to a superseded or finished turn.
    Stale,
}

/// What the end of a provider stream leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    Stale,
    /// The stream ended without producing any text.
    Empty,
    Ready(String),
}

/// Full copy of the session state, used to undo a failed edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    conversation: Conversation,
    messages: Vec<Message>,
    state: StreamState,
    generation: Generation,
    placeholder: Option<MessageId>,
}

impl SessionSnapshot {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[derive(Debug, Clone)]
pub struct ConversationSession {
    conversation: Conversation,
    messages: Vec<Message>,
    state: StreamState,
    generation: Generation,
    placeholder: Option<MessageId>,
}

impl ConversationSession {
    /// Opens a session over persisted messages, ordered by position.
    pub fn load(conversation: Conversation, messages: Vec<Message>) -> Self {
        Self {
            conversation,
            messages: ordered(messages),
            state: StreamState::Idle,
            generation: Generation::default(),
            placeholder: None,
        }
    }

    /// Replaces the whole message list in one step.
    ///
    /// An active turn is superseded since its placeholder no longer exists.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.supersede();
        self.messages = ordered(messages);
    }

    pub fn update_conversation(&mut self, conversation: Conversation) {
        self.conversation = conversation;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ConversationId {
        self.conversation.id()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Returns true while a turn is in `Requesting` or `Streaming`.
    pub fn is_busy(&self) -> bool {
        self.state.is_active()
    }

    /// The assistant message currently being streamed into, if any.
    pub fn placeholder(&self) -> Option<&Message> {
        self.placeholder.as_ref().and_then(|id| self.message(id))
    }

    /// Position the next appended message will occupy.
    pub fn next_position(&self) -> u32 {
        self.messages
            .last()
            .map(|m| m.position() + 1)
            .unwrap_or(0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sequence mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a message to the end of the sequence. Nothing is persisted.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.conversation.touch();
    }

    /// Removes every message strictly after `id`, returning how many went.
    ///
    /// # Errors
    ///
    /// - `MessageNotFound` if `id` is not in the session
    pub fn truncate_after(&mut self, id: &MessageId) -> Result<usize, DomainError> {
        let index = self.index_of(id)?;
        let removed = self.messages.len() - (index + 1);

        let cuts_placeholder = self
            .placeholder
            .map(|p| self.messages[index + 1..].iter().any(|m| m.id() == &p))
            .unwrap_or(false);
        if cuts_placeholder {
            self.supersede();
        }

        self.messages.truncate(index + 1);
        Ok(removed)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            conversation: self.conversation.clone(),
            messages: self.messages.clone(),
            state: self.state,
            generation: self.generation,
            placeholder: self.placeholder,
        }
    }

    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.conversation = snapshot.conversation;
        self.messages = snapshot.messages;
        self.state = snapshot.state;
        self.generation = snapshot.generation;
        self.placeholder = snapshot.placeholder;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Generation turns
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts a new turn and returns its generation.
    ///
    /// # Errors
    ///
    /// - `GenerationInFlight` if a turn is already requesting or streaming
    pub fn begin_turn(&mut self) -> Result<Generation, DomainError> {
        if self.state.is_active() {
            return Err(DomainError::new(
                ErrorCode::GenerationInFlight,
                "A response is already being generated for this conversation",
            )
            .with_detail("generation", self.generation.to_string()));
        }

        self.state = self.state.transition_to(StreamState::Requesting)?;
        self.generation = self.generation.next();
        Ok(self.generation)
    }

    /// Appends a chunk of streamed text to the turn's placeholder.
    ///
    /// The first non-empty chunk creates the placeholder and moves the turn to
    /// `Streaming`.
    pub fn apply_chunk(&mut self, generation: Generation, delta: &str) -> ChunkOutcome {
        if !self.is_current(generation) {
            return ChunkOutcome::Stale;
        }
        if delta.is_empty() {
            return ChunkOutcome::Skipped;
        }

        if self.state == StreamState::Requesting {
            let placeholder = Message::placeholder(*self.conversation.id(), self.next_position());
            self.placeholder = Some(*placeholder.id());
            self.messages.push(placeholder);
            self.state = StreamState::Streaming;
        }

        match self.placeholder_mut() {
            Some(message) => {
                message.push_content(delta);
                ChunkOutcome::Applied
            }
            None => ChunkOutcome::Stale,
        }
    }

    /// Reports what the turn produced once the provider signals the end.
    ///
    /// The turn stays `Streaming` until `complete_turn` or `fail_turn`.
    pub fn end_of_stream(&self, generation: Generation) -> StreamEnd {
        if !self.is_current(generation) {
            return StreamEnd::Stale;
        }
        match self.placeholder() {
            Some(message) if !message.content().trim().is_empty() => {
                StreamEnd::Ready(message.content().to_string())
            }
            _ => StreamEnd::Empty,
        }
    }

    /// Swaps the placeholder for its persisted record and completes the turn.
    ///
    /// Returns `Ok(false)` without changes if the turn was superseded.
    pub fn complete_turn(
        &mut self,
        generation: Generation,
        persisted: Message,
    ) -> Result<bool, DomainError> {
        if !self.is_current(generation) {
            return Ok(false);
        }
        let next = self.state.transition_to(StreamState::Completed)?;

        let index = self
            .placeholder
            .and_then(|id| self.messages.iter().position(|m| m.id() == &id));
        match index {
            Some(index) => self.messages[index] = persisted,
            None => self.messages.push(persisted),
        }

        self.placeholder = None;
        self.state = next;
        self.conversation.touch();
        Ok(true)
    }

    /// Drops the placeholder and marks the turn failed.
    ///
    /// Returns `Ok(false)` without changes if the turn was superseded.
    pub fn fail_turn(&mut self, generation: Generation) -> Result<bool, DomainError> {
        if !self.is_current(generation) {
            return Ok(false);
        }
        let next = self.state.transition_to(StreamState::Failed)?;
        self.remove_placeholder();
        self.state = next;
        Ok(true)
    }

    /// Abandons the active turn, if any. Its later chunks become stale.
    pub fn supersede(&mut self) {
        if self.state.is_active() {
            self.remove_placeholder();
            self.state = StreamState::Idle;
            self.generation = self.generation.next();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────────

    /// Rewrites a user message and drops everything after it.
    ///
    /// Any active turn is superseded. Returns the edited message.
    ///
    /// # Errors
    ///
    /// - `MessageNotFound` if `id` is not in the session
    /// - `InvalidRole` if the message was not written by the user
    /// - `ValidationFailed` if `new_content` is blank or too long
    pub fn edit(&mut self, id: &MessageId, new_content: &str) -> Result<Message, DomainError> {
        let index = self.index_of(id)?;
        if !self.messages[index].is_user() {
            return Err(DomainError::new(
                ErrorCode::InvalidRole,
                "Only user messages can be edited",
            )
            .with_detail("role", self.messages[index].role().to_string()));
        }
        validate_content(new_content)?;

        self.supersede();
        self.messages.truncate(index + 1);
        self.messages[index].replace_content(new_content.to_string());
        self.conversation.touch();
        Ok(self.messages[index].clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation && self.state.is_active()
    }

    fn index_of(&self, id: &MessageId) -> Result<usize, DomainError> {
        self.messages
            .iter()
            .position(|m| m.id() == id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::MessageNotFound, "Message not found")
                    .with_detail("message_id", id.to_string())
            })
    }

    fn placeholder_mut(&mut self) -> Option<&mut Message> {
        let id = self.placeholder?;
        self.messages.iter_mut().find(|m| m.id() == &id)
    }

    fn remove_placeholder(&mut self) {
        if let Some(id) = self.placeholder.take() {
            self.messages.retain(|m| m.id() != &id);
        }
    }
}

fn ordered(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| {
        a.position()
            .cmp(&b.position())
            .then_with(|| a.created_at().cmp(b.created_at()))
    });
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Role;
    use crate::domain::foundation::{Timestamp, UserId};
    use proptest::prelude::*;

    fn conversation() -> Conversation {
        Conversation::new(UserId::new("user-1").unwrap(), Some("Test"))
    }

    fn message(conversation: &Conversation, role: Role, content: &str, position: u32) -> Message {
        Message::new(*conversation.id(), role, content, position).unwrap()
    }

    /// Session holding `[user, assistant, user, assistant, ...]` of length `n`.
    fn session_with(n: u32) -> ConversationSession {
        let conversation = conversation();
        let messages = (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                message(&conversation, role, &format!("m{}", i), i)
            })
            .collect();
        ConversationSession::load(conversation, messages)
    }

    fn persisted_reply(session: &ConversationSession, content: &str) -> Message {
        let position = session.placeholder().map(|p| p.position()).unwrap_or(0);
        Message::new(*session.id(), Role::Assistant, content, position).unwrap()
    }

    mod load {
        use super::*;

        #[test]
        fn orders_by_position() {
            let conversation = conversation();
            let shuffled = vec![
                message(&conversation, Role::Assistant, "b", 1),
                message(&conversation, Role::User, "c", 2),
                message(&conversation, Role::User, "a", 0),
            ];

            let session = ConversationSession::load(conversation, shuffled);

            let contents: Vec<_> = session.messages().iter().map(|m| m.content()).collect();
            assert_eq!(contents, vec!["a", "b", "c"]);
            assert_eq!(session.state(), StreamState::Idle);
        }

        #[test]
        fn equal_positions_fall_back_to_creation_time() {
            let conversation = conversation();
            let id = *conversation.id();
            let now = Timestamp::now();
            let later = Message::reconstitute(MessageId::new(), id, Role::User, "later".into(), 0, now.plus_secs(1));
            let earlier = Message::reconstitute(MessageId::new(), id, Role::User, "earlier".into(), 0, now);

            let session = ConversationSession::load(conversation, vec![later, earlier]);
            assert_eq!(session.messages()[0].content(), "earlier");
        }

        #[test]
        fn replace_messages_swaps_whole_list() {
            let mut session = session_with(4);
            let conversation = session.conversation().clone();
            session.replace_messages(vec![message(&conversation, Role::User, "only", 0)]);

            assert_eq!(session.len(), 1);
            assert_eq!(session.next_position(), 1);
        }
    }

    mod sequence {
        use super::*;

        #[test]
        fn append_adds_to_end() {
            let mut session = session_with(1);
            let conversation = session.conversation().clone();
            session.append(message(&conversation, Role::Assistant, "reply", 1));

            assert_eq!(session.len(), 2);
            assert_eq!(session.messages()[1].content(), "reply");
        }

        #[test]
        fn truncate_after_keeps_target() {
            let mut session = session_with(4);
            let target = *session.messages()[1].id();

            let removed = session.truncate_after(&target).unwrap();

            assert_eq!(removed, 2);
            assert_eq!(session.len(), 2);
            assert_eq!(session.messages()[1].id(), &target);
        }

        #[test]
        fn truncate_after_last_message_removes_nothing() {
            let mut session = session_with(3);
            let last = *session.messages()[2].id();
            assert_eq!(session.truncate_after(&last).unwrap(), 0);
            assert_eq!(session.len(), 3);
        }

        #[test]
        fn truncate_after_unknown_message_fails() {
            let mut session = session_with(2);
            let err = session.truncate_after(&MessageId::new()).unwrap_err();
            assert_eq!(err.code, ErrorCode::MessageNotFound);
            assert_eq!(session.len(), 2);
        }

        #[test]
        fn truncating_away_the_placeholder_supersedes_the_turn() {
            let mut session = session_with(1);
            let generation = session.begin_turn().unwrap();
            session.apply_chunk(generation, "partial");
            let first = *session.messages()[0].id();

            session.truncate_after(&first).unwrap();

            assert!(!session.is_busy());
            assert_eq!(session.apply_chunk(generation, "more"), ChunkOutcome::Stale);
        }

        #[test]
        fn snapshot_and_restore_round_trip_turn_state() {
            let mut session = session_with(2);
            let generation = session.begin_turn().unwrap();
            session.apply_chunk(generation, "abc");
            let snapshot = session.snapshot();

            let first = *session.messages()[0].id();
            session.edit(&first, "changed").unwrap();
            session.restore(snapshot.clone());

            assert_eq!(session.snapshot(), snapshot);
            assert_eq!(session.apply_chunk(generation, "d"), ChunkOutcome::Applied);
            assert_eq!(session.placeholder().unwrap().content(), "abcd");
        }
    }

    mod turns {
        use super::*;

        #[test]
        fn chunks_accumulate_into_one_reply() {
            let mut session = session_with(1);
            let generation = session.begin_turn().unwrap();
            assert_eq!(session.state(), StreamState::Requesting);

            assert_eq!(session.apply_chunk(generation, "Hel"), ChunkOutcome::Applied);
            assert_eq!(session.state(), StreamState::Streaming);
            assert_eq!(session.apply_chunk(generation, "lo!"), ChunkOutcome::Applied);

            assert_eq!(session.end_of_stream(generation), StreamEnd::Ready("Hello!".into()));

            let persisted = persisted_reply(&session, "Hello!");
            let persisted_id = *persisted.id();
            assert!(session.complete_turn(generation, persisted).unwrap());

            assert_eq!(session.len(), 2);
            assert_eq!(session.messages()[1].id(), &persisted_id);
            assert_eq!(session.messages()[1].content(), "Hello!");
            assert_eq!(session.state(), StreamState::Completed);
            assert!(session.placeholder().is_none());
        }

        #[test]
        fn placeholder_appears_on_first_chunk_only() {
            let mut session = session_with(1);
            let generation = session.begin_turn().unwrap();
            assert_eq!(session.len(), 1);

            assert_eq!(session.apply_chunk(generation, ""), ChunkOutcome::Skipped);
            assert_eq!(session.len(), 1);
            assert_eq!(session.state(), StreamState::Requesting);

            session.apply_chunk(generation, "x");
            let placeholder = session.placeholder().unwrap();
            assert!(placeholder.is_assistant());
            assert_eq!(placeholder.position(), 1);
        }

        #[test]
        fn second_turn_while_streaming_is_busy() {
            let mut session = session_with(1);
            let generation = session.begin_turn().unwrap();
            session.apply_chunk(generation, "Hel");

            let err = session.begin_turn().unwrap_err();

            assert_eq!(err.code, ErrorCode::GenerationInFlight);
            assert_eq!(session.generation(), generation);
            assert_eq!(session.apply_chunk(generation, "lo"), ChunkOutcome::Applied);
            assert_eq!(session.placeholder().unwrap().content(), "Hello");
        }

        #[test]
        fn second_turn_while_requesting_is_busy() {
            let mut session = session_with(1);
            session.begin_turn().unwrap();
            assert!(session.begin_turn().is_err());
        }

        #[test]
        fn finished_turn_admits_the_next() {
            let mut session = session_with(1);
            let first = session.begin_turn().unwrap();
            session.apply_chunk(first, "ok");
            let reply = persisted_reply(&session, "ok");
            session.complete_turn(first, reply).unwrap();

            let second = session.begin_turn().unwrap();
            assert!(second > first);
        }

        #[test]
        fn failure_removes_placeholder_and_keeps_history() {
            let mut session = session_with(1);
            let generation = session.begin_turn().unwrap();
            session.apply_chunk(generation, "half an ans");

            assert!(session.fail_turn(generation).unwrap());

            assert_eq!(session.len(), 1);
            assert!(session.messages()[0].is_user());
            assert_eq!(session.state(), StreamState::Failed);
            assert!(session.begin_turn().is_ok());
        }

        #[test]
        fn failure_before_any_chunk() {
            let mut session = session_with(1);
            let generation = session.begin_turn().unwrap();
            assert!(session.fail_turn(generation).unwrap());
            assert_eq!(session.state(), StreamState::Failed);
        }

        #[test]
        fn stream_without_text_is_empty() {
            let mut session = session_with(1);
            let generation = session.begin_turn().unwrap();
            assert_eq!(session.end_of_stream(generation), StreamEnd::Empty);

            session.apply_chunk(generation, "  ");
            assert_eq!(session.end_of_stream(generation), StreamEnd::Empty);
        }

        #[test]
        fn superseded_turn_is_ignored_everywhere() {
            let mut session = session_with(1);
            let old = session.begin_turn().unwrap();
            session.apply_chunk(old, "old");
            session.supersede();

            assert_eq!(session.state(), StreamState::Idle);
            assert_eq!(session.len(), 1);
            assert_eq!(session.apply_chunk(old, "late"), ChunkOutcome::Stale);
            assert_eq!(session.end_of_stream(old), StreamEnd::Stale);
            let reply = Message::new(*session.id(), Role::Assistant, "old", 1).unwrap();
            assert!(!session.complete_turn(old, reply).unwrap());
            assert!(!session.fail_turn(old).unwrap());
            assert_eq!(session.len(), 1);
        }

        #[test]
        fn chunks_after_completion_are_stale() {
            let mut session = session_with(1);
            let generation = session.begin_turn().unwrap();
            session.apply_chunk(generation, "done");
            let reply = persisted_reply(&session, "done");
            session.complete_turn(generation, reply).unwrap();

            assert_eq!(session.apply_chunk(generation, "extra"), ChunkOutcome::Stale);
            assert_eq!(session.messages()[1].content(), "done");
        }
    }

    mod edit {
        use super::*;

        #[test]
        fn edit_truncates_and_replaces() {
            let mut session = session_with(4);
            let target = *session.messages()[2].id();

            let edited = session.edit(&target, "new question").unwrap();

            assert_eq!(session.len(), 3);
            assert_eq!(edited.id(), &target);
            assert_eq!(edited.content(), "new question");
            assert_eq!(session.messages()[2].content(), "new question");
            assert_eq!(edited.position(), 2);
        }

        #[test]
        fn edit_on_assistant_message_is_invalid_role() {
            let mut session = session_with(4);
            let before = session.snapshot();
            let target = *session.messages()[1].id();

            let err = session.edit(&target, "rewrite").unwrap_err();

            assert_eq!(err.code, ErrorCode::InvalidRole);
            assert_eq!(session.snapshot(), before);
        }

        #[test]
        fn edit_unknown_message_is_not_found() {
            let mut session = session_with(2);
            let err = session.edit(&MessageId::new(), "x").unwrap_err();
            assert_eq!(err.code, ErrorCode::MessageNotFound);
        }

        #[test]
        fn edit_with_blank_content_changes_nothing() {
            let mut session = session_with(4);
            let before = session.snapshot();
            let target = *session.messages()[0].id();

            assert!(session.edit(&target, "   ").is_err());
            assert_eq!(session.snapshot(), before);
        }

        #[test]
        fn edit_supersedes_the_streaming_turn() {
            let mut session = session_with(1);
            let first = *session.messages()[0].id();
            let stale = session.begin_turn().unwrap();
            session.apply_chunk(stale, "S1 says");

            session.edit(&first, "E2").unwrap();
            let fresh = session.begin_turn().unwrap();

            assert_eq!(session.apply_chunk(stale, " more"), ChunkOutcome::Stale);
            assert_eq!(session.apply_chunk(fresh, "S2"), ChunkOutcome::Applied);
            let reply = persisted_reply(&session, "S2");
            assert!(!session.complete_turn(stale, reply.clone()).unwrap());
            assert!(session.complete_turn(fresh, reply).unwrap());

            let contents: Vec<_> = session.messages().iter().map(|m| m.content()).collect();
            assert_eq!(contents, vec!["E2", "S2"]);
        }
    }

    proptest! {
        #[test]
        fn streamed_content_only_grows(chunks in proptest::collection::vec(".{0,8}", 1..20)) {
            let mut session = session_with(1);
            let generation = session.begin_turn().unwrap();
            let mut previous = String::new();

            for chunk in &chunks {
                session.apply_chunk(generation, chunk);
                let current = session
                    .placeholder()
                    .map(|m| m.content().to_string())
                    .unwrap_or_default();
                prop_assert!(current.starts_with(&previous));
                previous = current;
            }

            prop_assert_eq!(previous, chunks.concat());
        }

        #[test]
        fn truncate_after_leaves_exact_prefix(len in 1u32..12, pick in 0usize..12) {
            let mut session = session_with(len);
            let index = pick % len as usize;
            let before: Vec<_> = session.messages().to_vec();
            let target = *before[index].id();

            session.truncate_after(&target).unwrap();

            prop_assert_eq!(session.messages(), &before[..=index]);
        }
    }
}
