//! Records exchanged between the executor, the graph store, and collaborators.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One result row: variable/column name → plain scalar (or null when unbound).
pub type Row = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionKind {
    Entities,
    Summary,
    Keywords,
}

impl std::fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Entities => "entities",
            Self::Summary => "summary",
            Self::Keywords => "keywords",
        })
    }
}

/// A named entity found in a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type", alias = "entity_type")]
    pub entity_type: String,
    #[serde(default, alias = "doc_context", alias = "context")]
    pub context_snippet: String,
    #[serde(default, alias = "document")]
    pub source_document: String,
}

impl Entity {
    pub fn new(text: impl Into<String>, entity_type: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entity_type: entity_type.into(),
            context_snippet: context.into(),
            source_document: String::new(),
        }
    }
}

/// Result of one extraction call: an entity list, or text (summary / keyword list).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionOutput {
    Entities(Vec<Entity>),
    Text(String),
}

impl ExtractionOutput {
    pub fn entities(&self) -> Option<&[Entity]> {
        match self {
            Self::Entities(e) => Some(e),
            Self::Text(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Gap assessment
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapStatus {
    #[serde(alias = "Not Found")]
    NotFound,
    #[serde(alias = "Potential Variant/Related", alias = "potential_variant_related")]
    PotentialVariant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub term: String,
    #[serde(default)]
    pub term_type: String,
    #[serde(default)]
    pub context: String,
    pub status: GapStatus,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GapReport {
    #[serde(default)]
    pub gaps_found: Vec<Gap>,
    #[serde(default)]
    pub summary: String,
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// URI of the sentinel "no suitable match / create new" option.
pub const NO_MATCH_URI: &str = "no_match";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptType {
    #[serde(alias = "Class")]
    Class,
    #[serde(alias = "Individual")]
    Individual,
    #[serde(alias = "Action")]
    Action,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSuggestion {
    pub uri: String,
    pub label: String,
    #[serde(rename = "concept_type", alias = "type")]
    pub concept_type: ConceptType,
    pub score: f64,
}

impl AlignmentSuggestion {
    pub fn no_match() -> Self {
        Self {
            uri: NO_MATCH_URI.to_string(),
            label: "No suitable match / Create new".to_string(),
            concept_type: ConceptType::Action,
            score: 0.1,
        }
    }

    pub fn is_no_match(&self) -> bool {
        self.uri == NO_MATCH_URI
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub entity_text: String,
    #[serde(default)]
    pub suggestions: Vec<AlignmentSuggestion>,
}

impl AlignmentResult {
    /// Enforce the alignment invariants regardless of what the producer sent:
    /// exactly one `no_match` sentinel, suggestions sorted by descending score.
    pub fn normalized(mut self) -> Self {
        let mut seen_sentinel = false;
        self.suggestions.retain(|s| {
            if s.is_no_match() {
                let keep = !seen_sentinel;
                seen_sentinel = true;
                keep
            } else {
                true
            }
        });
        if !seen_sentinel {
            self.suggestions.push(AlignmentSuggestion::no_match());
        }
        for s in &mut self.suggestions {
            if s.score.is_nan() {
                s.score = 0.0;
            }
        }
        self.suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        self
    }

    /// Candidates other than the sentinel.
    pub fn candidates(&self) -> impl Iterator<Item = &AlignmentSuggestion> {
        self.suggestions.iter().filter(|s| !s.is_no_match())
    }

    pub fn find(&self, uri: &str) -> Option<&AlignmentSuggestion> {
        self.suggestions.iter().find(|s| s.uri == uri)
    }
}

// ---------------------------------------------------------------------------
// Ontology views
// ---------------------------------------------------------------------------

/// Structural counts. Individual counts are heuristic estimates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologySummary {
    pub triples: usize,
    pub classes: usize,
    pub individuals: usize,
    pub properties: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRef {
    pub uri: String,
    pub label: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSample {
    pub classes: Vec<ConceptRef>,
    pub properties: Vec<ConceptRef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub predicate: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingLink {
    pub subject: String,
    pub predicate: String,
}

/// Everything the graph knows directly about one resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConceptDetails {
    pub uri: String,
    pub label: Option<String>,
    pub comment: Option<String>,
    pub types: Vec<String>,
    pub outgoing: Vec<PropertyValue>,
    pub incoming: Vec<IncomingLink>,
}

/// Class/individual/label listings handed to gap and alignment collaborators.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyInventory {
    pub classes: Vec<String>,
    pub individuals: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

impl OntologyInventory {
    /// Truncate listings to keep collaborator prompts bounded.
    pub fn limited(mut self, limit: usize, label_limit: usize) -> Self {
        self.classes.truncate(limit);
        self.individuals.truncate(limit);
        if self.labels.len() > label_limit {
            self.labels = self.labels.into_iter().take(label_limit).collect();
        }
        self
    }

    /// Label for a URI, falling back to its local name.
    pub fn display_name(&self, uri: &str) -> String {
        self.labels
            .get(uri)
            .cloned()
            .unwrap_or_else(|| local_name(uri).to_string())
    }
}

/// Context handed to the query generator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    pub sample: ConceptSample,
    pub namespaces: BTreeMap<String, String>,
}

/// Fragment or last path segment of an IRI.
pub fn local_name(uri: &str) -> &str {
    uri.rsplit(['#', '/']).find(|s| !s.is_empty()).unwrap_or(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sugg(uri: &str, score: f64) -> AlignmentSuggestion {
        AlignmentSuggestion {
            uri: uri.into(),
            label: uri.into(),
            concept_type: ConceptType::Class,
            score,
        }
    }

    #[test]
    fn normalized_appends_sentinel_and_sorts() {
        let r = AlignmentResult {
            entity_text: "x".into(),
            suggestions: vec![sugg("a", 0.05), sugg("b", 0.9)],
        }
        .normalized();
        let uris: Vec<_> = r.suggestions.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(uris, vec!["b", NO_MATCH_URI, "a"]);
    }

    #[test]
    fn normalized_keeps_single_sentinel() {
        let r = AlignmentResult {
            entity_text: "x".into(),
            suggestions: vec![sugg(NO_MATCH_URI, 0.2), sugg(NO_MATCH_URI, 0.1)],
        }
        .normalized();
        assert_eq!(r.suggestions.len(), 1);
        assert_eq!(r.suggestions[0].score, 0.2);
    }

    #[test]
    fn local_name_handles_hash_and_slash() {
        assert_eq!(local_name("http://ex.org/onto#Company"), "Company");
        assert_eq!(local_name("http://ex.org/Acme/"), "Acme");
        assert_eq!(local_name("plain"), "plain");
    }
}
