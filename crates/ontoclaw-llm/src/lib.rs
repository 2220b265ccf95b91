//! Ontoclaw LLM - Collaborator contracts, prompts, and offline implementations

pub mod placeholder;
pub mod prompt;
pub mod provider;
pub mod rules;

pub use placeholder::PlaceholderLlm;
pub use provider::{ExtractionService, IntentResolver, LlmError, LlmResult};
pub use rules::RuleResolver;
