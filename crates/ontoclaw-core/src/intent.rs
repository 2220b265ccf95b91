//! Intents: the closed action set and the structured result of interpreting a user turn.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Every action the executor knows how to run.
///
/// Names coming from a resolver are parsed leniently (snake_case or camelCase,
/// plus a few legacy aliases). Anything else becomes [`Action::Unrecognized`],
/// which the executor answers with a fallback message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Greet,
    Clarify,
    Help,
    Reset,
    LoadOntologyPrompt,
    LoadDocumentPrompt,
    ExtractEntities,
    SummarizeDocument,
    GenerateOntologySummary,
    QueryOntology,
    ExplainConcept,
    AssessGaps,
    AlignEntity,
    SuggestOntologyModification,
    Unrecognized(String),
}

impl Action {
    /// All recognised actions, in help-text order.
    pub const KNOWN: [Action; 14] = [
        Action::Greet,
        Action::Help,
        Action::Reset,
        Action::Clarify,
        Action::LoadOntologyPrompt,
        Action::LoadDocumentPrompt,
        Action::ExtractEntities,
        Action::SummarizeDocument,
        Action::GenerateOntologySummary,
        Action::QueryOntology,
        Action::ExplainConcept,
        Action::AssessGaps,
        Action::AlignEntity,
        Action::SuggestOntologyModification,
    ];

    pub fn parse(name: &str) -> Self {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "greet" => Self::Greet,
            "clarify" => Self::Clarify,
            "help" => Self::Help,
            "reset" => Self::Reset,
            "loadontologyprompt" => Self::LoadOntologyPrompt,
            "loaddocumentprompt" => Self::LoadDocumentPrompt,
            "extractentities" => Self::ExtractEntities,
            "summarizedocument" => Self::SummarizeDocument,
            "generateontologysummary" | "generateontologybusinesssummary" => {
                Self::GenerateOntologySummary
            }
            "queryontology" => Self::QueryOntology,
            "explainconcept" | "explainontologyconcept" => Self::ExplainConcept,
            "assessgaps" => Self::AssessGaps,
            "alignentity" => Self::AlignEntity,
            "suggestontologymodification" => Self::SuggestOntologyModification,
            _ => Self::Unrecognized(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Greet => "greet",
            Self::Clarify => "clarify",
            Self::Help => "help",
            Self::Reset => "reset",
            Self::LoadOntologyPrompt => "load_ontology_prompt",
            Self::LoadDocumentPrompt => "load_document_prompt",
            Self::ExtractEntities => "extract_entities",
            Self::SummarizeDocument => "summarize_document",
            Self::GenerateOntologySummary => "generate_ontology_summary",
            Self::QueryOntology => "query_ontology",
            Self::ExplainConcept => "explain_concept",
            Self::AssessGaps => "assess_gaps",
            Self::AlignEntity => "align_entity",
            Self::SuggestOntologyModification => "suggest_ontology_modification",
            Self::Unrecognized(name) => name,
        }
    }

    /// Conversational actions run without an explanation turn.
    pub fn is_conversational(&self) -> bool {
        matches!(
            self,
            Self::Greet
                | Self::Clarify
                | Self::Help
                | Self::Reset
                | Self::LoadOntologyPrompt
                | Self::LoadDocumentPrompt
                | Self::Unrecognized(_)
        )
    }

    /// One-line description used by help text and resolver prompts.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Greet => "say hello",
            Self::Clarify => "ask the user to rephrase an unclear request",
            Self::Help => "list what the assistant can do",
            Self::Reset => "clear the session and start over",
            Self::LoadOntologyPrompt => "explain how to load an ontology file",
            Self::LoadDocumentPrompt => "explain how to load documents",
            Self::ExtractEntities => "extract named entities (target_document: name or 'all')",
            Self::SummarizeDocument => "summarize documents (target_document: name or 'all')",
            Self::GenerateOntologySummary => "describe the loaded ontology's domain and scope",
            Self::QueryOntology => "query the ontology (query_description, or raw sparql)",
            Self::ExplainConcept => "explain a concept (concept_uri or concept_term)",
            Self::AssessGaps => "compare document terms with the ontology (target_document)",
            Self::AlignEntity => "suggest ontology concepts for a term (entity_to_align)",
            Self::SuggestOntologyModification => "propose a new triple for the ontology",
            Self::Unrecognized(_) => "unrecognized action",
        }
    }
}

impl From<String> for Action {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Action> for String {
    fn from(a: Action) -> Self {
        a.as_str().to_string()
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the resolver is allowed to see about the session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub ontology_loaded: bool,
    pub ontology_path: Option<String>,
    pub document_names: Vec<String>,
    pub has_extraction_results: bool,
    pub has_gap_assessment: bool,
}

/// Structured interpretation of one user turn. Produced once, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Intent {
    pub action: Action,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub confidence: f32,
}

impl Intent {
    pub fn new(action: Action, parameters: Map<String, Value>, explanation: impl Into<String>, confidence: f32) -> Self {
        Self {
            action,
            parameters,
            explanation: explanation.into(),
            confidence: clamp_confidence(confidence),
        }
    }

    /// Fallback used whenever the resolver fails or times out.
    pub fn clarify(original_query: &str, explanation: impl Into<String>) -> Self {
        let mut parameters = Map::new();
        parameters.insert(
            "original_query".to_string(),
            Value::String(original_query.to_string()),
        );
        Self::new(Action::Clarify, parameters, explanation, 0.0)
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    /// Clamp confidence into [0, 1]; resolvers are not trusted to do it.
    pub fn normalized(mut self) -> Self {
        self.confidence = clamp_confidence(self.confidence);
        self
    }

    /// Look up a parameter by its snake_case name, also accepting the camelCase spelling.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.parameters
            .get(name)
            .or_else(|| self.parameters.get(&camel_case(name)))
            .filter(|v| !v.is_null())
    }

    /// String parameter; blank strings count as absent.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.param(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn clamp_confidence(c: f32) -> f32 {
    if c.is_nan() {
        0.0
    } else {
        c.clamp(0.0, 1.0)
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings() {
        assert_eq!(Action::parse("extract_entities"), Action::ExtractEntities);
        assert_eq!(Action::parse("extractEntities"), Action::ExtractEntities);
        assert_eq!(
            Action::parse("generate_ontology_business_summary"),
            Action::GenerateOntologySummary
        );
        assert_eq!(
            Action::parse("placeholder_action"),
            Action::Unrecognized("placeholder_action".into())
        );
    }

    #[test]
    fn camel_case_lookup() {
        let mut params = Map::new();
        params.insert("entityToAlign".into(), Value::String("Acme Corp".into()));
        let intent = Intent::new(Action::AlignEntity, params, "", 0.9);
        assert_eq!(intent.param_str("entity_to_align"), Some("Acme Corp"));
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(Intent::new(Action::Greet, Map::new(), "", 3.0).confidence, 1.0);
        assert_eq!(Intent::new(Action::Greet, Map::new(), "", f32::NAN).confidence, 0.0);
    }
}
