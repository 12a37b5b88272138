//! Completion Provider Adapters.
//!
//! ## Available Adapters
//!
//! - `MockCompletionProvider` - Scripted streams for testing
//! - `OpenAIProvider` - OpenAI chat completions over SSE

mod mock_provider;
mod openai_provider;

pub use mock_provider::{MockCompletionProvider, MockScript};
pub use openai_provider::{OpenAIConfig, OpenAIProvider, DEFAULT_MODEL};
