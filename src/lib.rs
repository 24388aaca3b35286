//! Generates QA artifacts (manual Allure cases and pytest automation) from UI
//! requirement text and OpenAPI specifications with an OpenAI-compatible
//! LLM, then reviews and rewrites weak automated tests.

pub mod analyzers;
pub mod config;
pub mod document_processor;
pub mod error;
pub mod generators;
pub mod llm;
pub mod models;
pub mod naming;
pub mod parsers;
pub mod pipeline;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{FileOutcome, GenerationPipeline, PipelineReport};
