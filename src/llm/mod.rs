pub mod client;
pub mod outcome;
pub mod prompts;
pub mod provider;

pub use client::{CodeDraft, GenerationClient, LlmGenerationClient, NarrationDraft, ReviewVerdict};
pub use outcome::{FallbackReason, Outcome};
pub use provider::{ChatMessage, ChatProvider, ChatRequest, OpenAiCompatibleProvider};
