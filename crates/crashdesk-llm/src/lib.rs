//! Model collaborator for crash report extraction.
//!
//! Sends report text to an external model (Anthropic or an OpenAI-compatible
//! API) with a fixed extraction template and returns the raw reply. Parsing
//! the reply is `crashdesk-triage`'s job.

pub mod config;
pub mod prompt;
pub mod providers;
pub mod retry;
pub mod types;

pub use config::{LLMConfig, RetryPolicy};
pub use providers::{reply_source_from_config, AnthropicClient, OpenAICompatClient, ReplySource};
pub use retry::with_retry;
pub use types::*;
