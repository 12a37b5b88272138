//! Registry of open conversation sessions.
//!
//! Each conversation that a client is viewing or generating into has exactly
//! one `ConversationSession`, shared behind an async mutex. The registry loads
//! a session from the store on first access and evicts it once it has been
//! idle long enough.
//!
//! ```text
//! open(c1) ──► miss ──► list_messages(c1) ──► insert ──► handle
//! open(c1) ──► hit ─────────────────────────────────────► same handle
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::domain::conversation::{Conversation, ConversationSession};
use crate::domain::foundation::{ConversationId, DomainError};
use crate::ports::ConversationStore;

/// Shared handle to one open session.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

struct Entry {
    session: SessionHandle,
    last_access: Instant,
}

pub struct SessionRegistry {
    store: Arc<dyn ConversationStore>,
    sessions: RwLock<HashMap<ConversationId, Entry>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the session for `conversation`, loading it if not yet open.
    ///
    /// Ownership must already have been checked by the caller.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` if the messages cannot be loaded
    pub async fn open(&self, conversation: &Conversation) -> Result<SessionHandle, DomainError> {
        let id = *conversation.id();
        if let Some(handle) = self.touch(&id).await {
            return Ok(handle);
        }

        // Load outside the lock; a concurrent open of the same id keeps
        // whichever entry was inserted first.
        let messages = self.store.list_messages(&id).await?;
        let loaded = ConversationSession::load(conversation.clone(), messages);

        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(id).or_insert_with(|| {
            tracing::debug!(conversation_id = %id, "session opened");
            Entry {
                session: Arc::new(Mutex::new(loaded)),
                last_access: Instant::now(),
            }
        });
        entry.last_access = Instant::now();
        Ok(Arc::clone(&entry.session))
    }

    /// Returns the session if it is already open.
    pub async fn get(&self, id: &ConversationId) -> Option<SessionHandle> {
        self.touch(id).await
    }

    /// Drops the session. Returns true if one was open.
    pub async fn close(&self, id: &ConversationId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(conversation_id = %id, "session closed");
        }
        removed
    }

    /// Evicts sessions idle for at least `max_idle`. Sessions with a turn in
    /// flight, or currently locked by a caller, are kept.
    ///
    /// Returns the number of sessions evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, entry| {
            if entry.last_access.elapsed() < max_idle {
                return true;
            }
            match entry.session.try_lock() {
                Ok(session) => session.is_busy(),
                Err(_) => true,
            }
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Runs `evict_idle` every `interval` until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration, max_idle: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.evict_idle(max_idle).await;
            }
        })
    }

    async fn touch(&self, id: &ConversationId) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(id).map(|entry| {
            entry.last_access = Instant::now();
            Arc::clone(&entry.session)
        })
    }
}
