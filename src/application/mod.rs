//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Chat commands run against the open `ConversationSession` held by the
//! `SessionRegistry`; the `StreamReconciler` folds provider output into it.

pub mod error;
pub mod handlers;
pub mod reconciler;
pub mod seed;
pub mod session_registry;

pub use error::ChatError;
pub use reconciler::{ReconcilerConfig, StreamEvent, StreamReconciler, TurnHandle, TurnOutcome};
pub use seed::seed_demo_data;
pub use session_registry::{SessionHandle, SessionRegistry};
