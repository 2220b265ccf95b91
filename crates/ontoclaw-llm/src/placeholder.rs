//! Offline stand-in for a model-backed collaborator.
//!
//! Every call builds the prompt a real model would receive, logs it at debug
//! level, and answers with a clearly labelled placeholder. Alignment and gap
//! assessment do a plain lexical comparison against the ontology inventory so
//! the confirmation and gap flows work end to end without a model.

use crate::prompt;
use crate::provider::{ExtractionService, IntentResolver, LlmResult};
use ontoclaw_core::{
    local_name, Action, AlignmentResult, AlignmentSuggestion, ConceptDetails, ConceptSample,
    ConceptType, ContextSnapshot, Entity, ExtractionKind, ExtractionOutput, Gap, GapReport,
    GapStatus, Intent, OntologyInventory, OntologySummary, QueryContext, Turn,
};
use serde_json::Map;
use tracing::debug;

/// Suggestions returned per alignment request, sentinel excluded.
const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Default, Clone)]
pub struct PlaceholderLlm;

impl PlaceholderLlm {
    pub fn new() -> Self {
        Self
    }

    fn call(&self, prompt: &str, expected: &str) -> String {
        debug!(expected, prompt, "Placeholder collaborator call");
        placeholder_text(expected)
    }
}

/// The labelled text every placeholder answer carries.
pub fn placeholder_text(expected: &str) -> String {
    format!("[LLM Placeholder: Output for '{}']", expected)
}

#[async_trait::async_trait]
impl IntentResolver for PlaceholderLlm {
    fn name(&self) -> &str {
        "placeholder"
    }

    /// Always answers with an action the executor does not know.
    async fn resolve(
        &self,
        text: &str,
        context: &ContextSnapshot,
        history: &[Turn],
    ) -> LlmResult<Intent> {
        let explanation = self.call(&prompt::intent(text, context, history), "intent");
        Ok(Intent::new(
            Action::Unrecognized("placeholder_action".into()),
            Map::new(),
            explanation,
            0.0,
        ))
    }
}

#[async_trait::async_trait]
impl ExtractionService for PlaceholderLlm {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn extract(&self, content: &str, kind: ExtractionKind) -> LlmResult<ExtractionOutput> {
        let text = self.call(&prompt::extraction(content, kind), &format!("{} extraction", kind));
        Ok(match kind {
            ExtractionKind::Entities => {
                ExtractionOutput::Entities(vec![Entity::new(text, "PLACEHOLDER", "N/A")])
            }
            ExtractionKind::Summary | ExtractionKind::Keywords => ExtractionOutput::Text(text),
        })
    }

    async fn assess_gaps(
        &self,
        terms: &[Entity],
        inventory: &OntologyInventory,
    ) -> LlmResult<GapReport> {
        let label = self.call(&prompt::gaps(terms, inventory), "knowledge gaps");
        let names = concept_names(inventory);

        let mut gaps_found = Vec::new();
        for term in terms.iter().take(prompt::MAX_TERMS) {
            let wanted = term.text.trim().to_lowercase();
            if wanted.is_empty() || names.iter().any(|(_, n)| *n == wanted) {
                continue;
            }
            let related = names
                .iter()
                .find(|(_, n)| !n.is_empty() && (n.contains(&wanted) || wanted.contains(n.as_str())));
            let gap = match related {
                Some((uri, _)) => Gap {
                    term: term.text.clone(),
                    term_type: term.entity_type.clone(),
                    context: term.context_snippet.clone(),
                    status: GapStatus::PotentialVariant,
                    suggestion: format!("Consider a synonym or relation to <{}>", uri),
                    confidence: 0.5,
                },
                None => Gap {
                    term: term.text.clone(),
                    term_type: term.entity_type.clone(),
                    context: term.context_snippet.clone(),
                    status: GapStatus::NotFound,
                    suggestion: "Consider adding a new concept".into(),
                    confidence: 0.6,
                },
            };
            gaps_found.push(gap);
        }

        let summary = format!(
            "{} {} of {} terms have no exact match in the ontology.",
            label,
            gaps_found.len(),
            terms.len().min(prompt::MAX_TERMS)
        );
        Ok(GapReport {
            gaps_found,
            summary,
        })
    }

    async fn suggest_alignment(
        &self,
        entity_text: &str,
        inventory: &OntologyInventory,
    ) -> LlmResult<AlignmentResult> {
        self.call(&prompt::alignment(entity_text, inventory), "alignment suggestions");
        let wanted = entity_text.trim().to_lowercase();

        let typed = inventory
            .classes
            .iter()
            .map(|u| (u, ConceptType::Class))
            .chain(inventory.individuals.iter().map(|u| (u, ConceptType::Individual)));

        let mut suggestions: Vec<AlignmentSuggestion> = Vec::new();
        for (uri, concept_type) in typed {
            let name = inventory.display_name(uri);
            let score = lexical_score(&wanted, &name.to_lowercase())
                .max(lexical_score(&wanted, &local_name(uri).to_lowercase()));
            if score > 0.0 && !suggestions.iter().any(|s| &s.uri == uri) {
                suggestions.push(AlignmentSuggestion {
                    uri: uri.clone(),
                    label: name,
                    concept_type,
                    score,
                });
            }
        }
        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions.push(AlignmentSuggestion::no_match());

        Ok(AlignmentResult {
            entity_text: entity_text.to_string(),
            suggestions,
        })
    }

    async fn explain_concept(&self, details: &ConceptDetails) -> LlmResult<String> {
        Ok(self.call(&prompt::explanation(details), "concept explanation"))
    }

    async fn summarize_ontology(
        &self,
        stats: &OntologySummary,
        sample: &ConceptSample,
        name: Option<&str>,
    ) -> LlmResult<String> {
        Ok(self.call(
            &prompt::ontology_summary(stats, sample, name),
            "ontology business summary",
        ))
    }

    async fn generate_query(
        &self,
        description: &str,
        context: &QueryContext,
    ) -> LlmResult<Option<String>> {
        let text = self.call(&prompt::query(description, context), "SPARQL query");
        Ok(Some(format!(
            "# {}\nSELECT ?s ?p ?o WHERE {{ ?s ?p ?o }} LIMIT 1",
            text
        )))
    }
}

/// Lowercased display names of every class and individual.
fn concept_names(inventory: &OntologyInventory) -> Vec<(String, String)> {
    inventory
        .classes
        .iter()
        .chain(&inventory.individuals)
        .flat_map(|uri| {
            [
                (uri.clone(), inventory.display_name(uri).to_lowercase()),
                (uri.clone(), local_name(uri).to_lowercase()),
            ]
        })
        .collect()
}

/// 1.0 on an exact match, 0.7 when one contains the other, else 0.
fn lexical_score(wanted: &str, name: &str) -> f64 {
    if wanted.is_empty() || name.is_empty() {
        0.0
    } else if wanted == name {
        1.0
    } else if name.contains(wanted) || wanted.contains(name) {
        0.7
    } else {
        0.0
    }
}
