//! Chat turn handlers: submitting a message and editing one.

mod edit_message;
mod submit_message;

pub use edit_message::{EditMessageCommand, EditMessageHandler, EditMessageResult};
pub use submit_message::{SubmitMessageCommand, SubmitMessageHandler, SubmitMessageResult};
