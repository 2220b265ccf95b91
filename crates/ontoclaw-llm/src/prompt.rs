//! Prompt builders for model-backed collaborators.

use ontoclaw_core::{
    Action, ConceptDetails, ConceptSample, ContextSnapshot, Entity, ExtractionKind,
    OntologyInventory, OntologySummary, QueryContext, Turn, NO_MATCH_URI,
};
use serde::Serialize;

/// Document text beyond this many characters is cut from prompts.
pub const MAX_CONTENT_CHARS: usize = 4000;
/// Extracted terms sent to gap assessment.
pub const MAX_TERMS: usize = 50;

pub fn intent(text: &str, context: &ContextSnapshot, history: &[Turn]) -> String {
    let actions: String = Action::KNOWN
        .iter()
        .map(|a| format!("- {}: {}\n", a.as_str(), a.describe()))
        .collect();
    let history: Vec<_> = history
        .iter()
        .map(|t| serde_json::json!({ "role": t.role, "content": t.content }))
        .collect();
    format!(
        "Determine the action the user wants and its parameters, given the session context \
and recent conversation.\n\n\
Available actions:\n{actions}\n\
Context:\n\
- Ontology loaded: {loaded}\n\
- Ontology name: {name}\n\
- Loaded documents: {docs}\n\
- Extraction results available: {extraction}\n\
- Gap assessment available: {gaps}\n\n\
Recent conversation:\n{history}\n\n\
User request: \"{text}\"\n\n\
Respond with a JSON object with keys 'action', 'parameters' (object), 'explanation' \
and 'confidence' (0.0 to 1.0). Use 'clarify' when the request is ambiguous.\n",
        loaded = context.ontology_loaded,
        name = context.ontology_path.as_deref().unwrap_or("N/A"),
        docs = json(&context.document_names),
        extraction = context.has_extraction_results,
        gaps = context.has_gap_assessment,
        history = json(&history),
    )
}

pub fn extraction(content: &str, kind: ExtractionKind) -> String {
    let body = truncate(content, MAX_CONTENT_CHARS);
    let task = match kind {
        ExtractionKind::Entities => {
            "Extract named entities from the text. For each give the entity text, its type \
(PERSON, ORGANIZATION, PRODUCT, LOCATION, DATE, DOMAIN_TERM) and a context snippet of about \
50 characters. Return a JSON list of objects with keys \"text\", \"type\", \"context_snippet\"."
        }
        ExtractionKind::Keywords => {
            "Extract the most relevant keywords or key phrases of the text. \
Return a JSON list of strings."
        }
        ExtractionKind::Summary => {
            "Summarize the text in 2-4 sentences, keeping the main points."
        }
    };
    format!("{task}\n\nText:\n---\n{body}\n---\n")
}

pub fn gaps(terms: &[Entity], inventory: &OntologyInventory) -> String {
    let terms = &terms[..terms.len().min(MAX_TERMS)];
    format!(
        "You are a knowledge engineer comparing terms extracted from documents with an \
existing ontology.\n\n\
Ontology classes: {classes}\n\
Ontology individuals: {individuals}\n\
Labels (URI -> label): {labels}\n\n\
Extracted terms: {terms}\n\n\
Compare each term's text with the concept labels and IRI fragments. Report terms that are \
'not_found' (no case-insensitive match) or 'potential_variant' (plural, acronym, substring or \
other near match). Return a JSON object with 'gaps_found' (list of objects with keys term, \
term_type, context, status, suggestion, confidence) and 'summary' (1-2 sentences).\n",
        classes = json(&inventory.classes),
        individuals = json(&inventory.individuals),
        labels = json(&inventory.labels),
        terms = json(&terms),
    )
}

pub fn alignment(entity_text: &str, inventory: &OntologyInventory) -> String {
    format!(
        "Find the ontology classes or individuals that best match the entity \"{entity_text}\". \
Consider exact, partial and semantic matches against labels and IRI fragments.\n\n\
Classes: {classes}\n\
Individuals: {individuals}\n\
Labels (URI -> label): {labels}\n\n\
Return a JSON object with 'entity_text' and 'suggestions': up to 5 objects with keys uri, \
label, type ('class' or 'individual') and score (0.0 to 1.0), sorted by score descending. \
Include {{\"uri\": \"{NO_MATCH_URI}\", \"label\": \"No suitable match / Create new\", \
\"type\": \"action\", \"score\": 0.1}}.\n",
        classes = json(&inventory.classes),
        individuals = json(&inventory.individuals),
        labels = json(&inventory.labels),
    )
}

pub fn query(description: &str, context: &QueryContext) -> String {
    format!(
        "Write a SPARQL SELECT query for the request below. Use the prefixes listed when \
possible. If no sensible query exists, return an empty string.\n\n\
Classes (sample): {classes}\n\
Properties (sample): {properties}\n\
Namespaces: {namespaces}\n\n\
Request: \"{description}\"\n",
        classes = json(&context.sample.classes),
        properties = json(&context.sample.properties),
        namespaces = json(&context.namespaces),
    )
}

pub fn explanation(details: &ConceptDetails) -> String {
    format!(
        "Explain this ontology concept in plain language: its type, likely purpose and key \
relationships.\n\nConcept details:\n{}\n",
        json(details)
    )
}

pub fn ontology_summary(stats: &OntologySummary, sample: &ConceptSample, name: Option<&str>) -> String {
    format!(
        "Summarize the ontology below in 3-5 sentences: the business domain it models, how it \
could support knowledge management, and whether it is high-level or detailed.\n\n\
Ontology name: {name}\n\
Statistics: {stats}\n\
Classes (sample): {classes}\n\
Properties (sample): {properties}\n",
        name = name.unwrap_or("Unnamed Ontology"),
        stats = json(stats),
        classes = json(&sample.classes),
        properties = json(&sample.properties),
    )
}

/// Cut `s` to at most `max` characters, marking the cut.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}... (truncated)", &s[..idx]),
        None => s.to_string(),
    }
}

fn json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
