//! Bug Cascade LLM
//!
//! Provides a narrow interface to a reasoning service:
//! - `LlmProvider` trait (text in, text out, no tool execution)
//! - `OpenAIProvider` for the chat-completions protocol
//!
//! Also includes the HTTP client factory and the LLM error taxonomy.

pub mod http_client;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
pub use types::*;
