//! Rule-based intent resolver.
//!
//! Deterministic pattern matching over the user's text. Rules are tried in
//! order and the first match wins. Named capture groups become parameters:
//!
//! | group    | parameter         |
//! |----------|-------------------|
//! | `sparql` | `sparql`          |
//! | `entity` | `entity_to_align` |
//! | `uri`    | `concept_uri`     |
//! | `term`   | `concept_term`    |
//!
//! Document-scoped actions also get `target_document`: a loaded document named
//! in the text, else a file name mentioned in the text, else `"all"`.

use crate::provider::{IntentResolver, LlmResult};
use ontoclaw_core::{Action, ContextSnapshot, Intent, Turn};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const RULES: &[(&str, Action, f32)] = &[
    (
        r"(?is)^\s*(?P<sparql>(?:(?:PREFIX|BASE)\s+[^\n]*\s+)*(?:SELECT|ASK|CONSTRUCT|DESCRIBE)\b[^{]*?(?:\{|\bWHERE\b).*)$",
        Action::QueryOntology,
        0.95,
    ),
    (
        r"(?i)^\s*(?:reset|start\s+over|clear\s+(?:everything|all|the\s+session))\s*[.!]*\s*$",
        Action::Reset,
        0.95,
    ),
    (
        r"(?i)^\s*(?:help|\?|what\s+can\s+you\s+do)\b",
        Action::Help,
        0.9,
    ),
    (
        r"(?i)^\s*(?:hi|hello|hey|greetings|good\s+(?:morning|afternoon|evening))\b",
        Action::Greet,
        0.9,
    ),
    (
        r#"(?i)\balign\s+(?:the\s+)?(?:entity\s+|term\s+)?['"‘“](?P<entity>[^'"’”]+)['"’”]"#,
        Action::AlignEntity,
        0.9,
    ),
    (
        r"(?i)\balign\s+(?:the\s+)?(?:entity\s+|term\s+)?(?P<entity>\S.*?)\s*[.?!]*\s*$",
        Action::AlignEntity,
        0.7,
    ),
    (
        r"(?i)\b(?:load|upload|open|import)\b.*\bontolog(?:y|ies)\b",
        Action::LoadOntologyPrompt,
        0.85,
    ),
    (
        r"(?i)\b(?:summar\w*|describe|overview|tell\s+me\s+about)\b.*\bontology\b",
        Action::GenerateOntologySummary,
        0.85,
    ),
    (
        r"(?i)\bgaps?\b|\bmissing\s+from\s+the\s+ontology\b|\bcompare\b.*\bontology\b",
        Action::AssessGaps,
        0.85,
    ),
    (
        r"(?i)\b(?:extract|find|list|get|identify)\b.*\bentit(?:y|ies)\b",
        Action::ExtractEntities,
        0.85,
    ),
    (
        r"(?i)\bsummar(?:ize|ise|y)\b",
        Action::SummarizeDocument,
        0.8,
    ),
    (
        r"(?i)\b(?:load|upload|add|open)\b.*\b(?:documents?|docs?|files?|texts?)\b",
        Action::LoadDocumentPrompt,
        0.8,
    ),
    (
        r"(?i)\b(?:add|create|insert)\b.*\b(?:triples?|class|property|individual|relation)\b|\bmodify\b.*\bontology\b",
        Action::SuggestOntologyModification,
        0.7,
    ),
    (
        r"(?i)\b(?:explain|describe|what\s+is|what's)\s+(?:the\s+)?(?:concept\s+)?<?(?P<uri>[a-z][a-z0-9+.\-]*://[^\s>]+)>?",
        Action::ExplainConcept,
        0.9,
    ),
    (
        r#"(?i)\b(?:explain|describe|what\s+is|what's)\s+(?:the\s+)?(?:concept\s+)?(?:an?\s+)?['"]?(?P<term>[^'"?]+?)['"]?\s*\??\s*$"#,
        Action::ExplainConcept,
        0.75,
    ),
    (
        r"(?i)^\s*(?:query|find|show|list|which|who|where|how\s+many|search)\b",
        Action::QueryOntology,
        0.6,
    ),
];

const FILE_NAME: &str = r"(?i)(?P<name>[\w\-]+\.(?:txt|md|pdf|docx?|csv|json|html?))\b";

struct Rule {
    pattern: Regex,
    action: Action,
    confidence: f32,
}

/// Pattern-matching [`IntentResolver`]. Not a classifier; a predictable stand-in.
pub struct RuleResolver {
    rules: Vec<Rule>,
    file_name: Option<Regex>,
}

impl Default for RuleResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleResolver {
    pub fn new() -> Self {
        let rules = RULES
            .iter()
            .filter_map(|(pattern, action, confidence)| match Regex::new(pattern) {
                Ok(pattern) => Some(Rule {
                    pattern,
                    action: action.clone(),
                    confidence: *confidence,
                }),
                Err(e) => {
                    warn!(action = %action, error = %e, "Skipping invalid intent rule");
                    None
                }
            })
            .collect();
        Self {
            rules,
            file_name: Regex::new(FILE_NAME).ok(),
        }
    }

    /// Interpret `text` without any async machinery.
    pub fn interpret(&self, text: &str, context: &ContextSnapshot) -> Intent {
        for rule in &self.rules {
            let Some(caps) = rule.pattern.captures(text) else {
                continue;
            };
            let mut params = Map::new();
            for (group, param) in [
                ("sparql", "sparql"),
                ("entity", "entity_to_align"),
                ("uri", "concept_uri"),
                ("term", "concept_term"),
            ] {
                if let Some(m) = caps.name(group) {
                    let value = m.as_str().trim();
                    if !value.is_empty() {
                        params.insert(param.into(), Value::String(value.to_string()));
                    }
                }
            }

            match rule.action {
                Action::ExtractEntities | Action::SummarizeDocument | Action::AssessGaps => {
                    params.insert(
                        "target_document".into(),
                        Value::String(self.target_document(text, context)),
                    );
                }
                Action::QueryOntology if !params.contains_key("sparql") => {
                    params.insert("query_description".into(), Value::String(text.trim().into()));
                }
                Action::SuggestOntologyModification => {
                    params.insert("raw_request".into(), Value::String(text.trim().into()));
                }
                _ => {}
            }

            debug!(action = %rule.action, "Intent rule matched");
            return Intent::new(
                rule.action.clone(),
                params,
                format!("Understood as '{}': {}.", rule.action, rule.action.describe()),
                rule.confidence,
            );
        }

        Intent::clarify(text, "I'm not sure what you'd like me to do.")
            .with_confidence(0.2)
    }

    fn target_document(&self, text: &str, context: &ContextSnapshot) -> String {
        let lower = text.to_lowercase();
        if let Some(name) = context
            .document_names
            .iter()
            .find(|n| !n.is_empty() && lower.contains(&n.to_lowercase()))
        {
            return name.clone();
        }
        self.file_name
            .as_ref()
            .and_then(|re| re.captures(text))
            .and_then(|c| c.name("name").map(|m| m.as_str().to_string()))
            .unwrap_or_else(|| "all".to_string())
    }
}

#[async_trait::async_trait]
impl IntentResolver for RuleResolver {
    fn name(&self) -> &str {
        "rules"
    }

    async fn resolve(
        &self,
        text: &str,
        context: &ContextSnapshot,
        _history: &[Turn],
    ) -> LlmResult<Intent> {
        Ok(self.interpret(text, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rule_compiles() {
        assert_eq!(RuleResolver::new().rules.len(), RULES.len());
    }
}
