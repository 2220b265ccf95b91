//! Collaborator traits
//!
//! The executor never talks to a model directly. It calls an [`IntentResolver`]
//! to interpret a user turn and an [`ExtractionService`] for everything that
//! needs language understanding. Both are treated as slow and fallible.

use ontoclaw_core::{
    AlignmentResult, ConceptDetails, ConceptSample, ContextSnapshot, Entity, ExtractionKind,
    ExtractionOutput, GapReport, Intent, OntologyInventory, OntologySummary, QueryContext, Turn,
};

/// Result type for collaborator calls
pub type LlmResult<T> = Result<T, LlmError>;

/// Collaborator error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Turns free text into an [`Intent`].
#[async_trait::async_trait]
pub trait IntentResolver: Send + Sync {
    fn name(&self) -> &str;

    /// `history` holds the most recent turns, oldest first.
    async fn resolve(
        &self,
        text: &str,
        context: &ContextSnapshot,
        history: &[Turn],
    ) -> LlmResult<Intent>;
}

/// Language tasks over documents and ontology views.
#[async_trait::async_trait]
pub trait ExtractionService: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, content: &str, kind: ExtractionKind) -> LlmResult<ExtractionOutput>;

    async fn assess_gaps(
        &self,
        terms: &[Entity],
        inventory: &OntologyInventory,
    ) -> LlmResult<GapReport>;

    async fn suggest_alignment(
        &self,
        entity_text: &str,
        inventory: &OntologyInventory,
    ) -> LlmResult<AlignmentResult>;

    async fn explain_concept(&self, details: &ConceptDetails) -> LlmResult<String>;

    async fn summarize_ontology(
        &self,
        stats: &OntologySummary,
        sample: &ConceptSample,
        name: Option<&str>,
    ) -> LlmResult<String>;

    /// `Ok(None)` means no sensible query could be produced.
    async fn generate_query(
        &self,
        description: &str,
        context: &QueryContext,
    ) -> LlmResult<Option<String>>;
}
