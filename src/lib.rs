//! Chatterbox - streaming chat backend
//!
//! Users hold conversations with a hosted language model. Replies stream in
//! chunk by chunk and are reconciled into the conversation as they arrive.
//! Editing an earlier user message discards everything after it and
//! regenerates the reply from the edited prefix.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
