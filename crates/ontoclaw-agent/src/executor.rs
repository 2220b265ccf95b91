//! Task executor: interprets a turn, checks preconditions, calls collaborators,
//! and leaves its answer in the session as turns plus pending UI specs.
//!
//! Every entry point runs the same cycle: append the triggering turn, end the
//! previous render cycle (pending widgets and their selections go together),
//! then dispatch. Failures never escape as errors; they become an assistant
//! message plus an info/warning/error spec, and the session stays usable.

use crate::guard::with_timeout;
use crate::session::Session;
use futures::future::join_all;
use ontoclaw_core::config::LimitsConfig;
use ontoclaw_core::ui::{digest_hex, purpose, LINKED_RADIO_KEY};
use ontoclaw_core::{
    json_block, Action, AlignmentResult, CallbackAction, CallbackEvent, Entity, ExtractionKind,
    ExtractionOutput, FormField, Intent, OntoclawConfig, RadioOption, Row, Turn, UiElement,
    UiSpec, NO_MATCH_URI,
};
use ontoclaw_graph::vocab::skos;
use ontoclaw_graph::{GraphError, OntologyFormat};
use ontoclaw_llm::{ExtractionService, IntentResolver, LlmError, LlmResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ExecutorConfig {
    pub collaborator_timeout: Duration,
    pub low_confidence_threshold: f32,
    pub history_window: usize,
    pub record_alignments: bool,
    pub limits: LimitsConfig,
    pub default_format: OntologyFormat,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from(&OntoclawConfig::default())
    }
}

impl From<&OntoclawConfig> for ExecutorConfig {
    fn from(config: &OntoclawConfig) -> Self {
        let default_format = config
            .ontology
            .default_format
            .parse()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Unknown default ontology format, using turtle");
                OntologyFormat::Turtle
            });
        Self {
            collaborator_timeout: config.agent.collaborator_timeout(),
            low_confidence_threshold: config.agent.low_confidence_threshold,
            history_window: config.agent.history_window,
            record_alignments: config.agent.record_alignments,
            limits: config.limits.clone(),
            default_format,
        }
    }
}

/// What one cycle added, for surfaces that render incrementally.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Turns appended this cycle. After a reset, the whole (fresh) history.
    pub turns: Vec<Turn>,
    /// Specs pending after the cycle.
    pub ui: Vec<UiSpec>,
    pub reset: bool,
}

/// Position in a session's history, taken before a cycle starts.
struct Mark {
    epoch: u64,
    len: usize,
}

impl Mark {
    fn of(session: &Session) -> Self {
        Self {
            epoch: session.epoch(),
            len: session.history().len(),
        }
    }

    fn outcome(self, session: &Session) -> TurnOutcome {
        let reset = session.epoch() != self.epoch;
        let from = if reset { 0 } else { self.len.min(session.history().len()) };
        TurnOutcome {
            turns: session.history()[from..].to_vec(),
            ui: session.pending_ui().to_vec(),
            reset,
        }
    }
}

pub struct TaskExecutor {
    resolver: Arc<dyn IntentResolver>,
    extractor: Arc<dyn ExtractionService>,
    config: ExecutorConfig,
}

impl TaskExecutor {
    pub fn new(
        resolver: Arc<dyn IntentResolver>,
        extractor: Arc<dyn ExtractionService>,
        config: ExecutorConfig,
    ) -> Self {
        info!(
            resolver = resolver.name(),
            extractor = extractor.name(),
            timeout_ms = config.collaborator_timeout.as_millis() as u64,
            "Task executor ready"
        );
        Self {
            resolver,
            extractor,
            config,
        }
    }

    /// One collaborator serving both roles.
    pub fn with_collaborator<C>(collaborator: Arc<C>, config: ExecutorConfig) -> Self
    where
        C: IntentResolver + ExtractionService + 'static,
    {
        Self::new(collaborator.clone(), collaborator, config)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    // -- entry points -------------------------------------------------------

    /// Handle a free-text request.
    pub async fn handle_user_input(&self, session: &mut Session, text: &str) -> TurnOutcome {
        let mark = Mark::of(session);
        let history = session.recent_history(self.config.history_window).to_vec();
        session.push(Turn::user(text));
        session.clear_pending_ui();

        let context = session.context_snapshot();
        let intent = match with_timeout(
            self.config.collaborator_timeout,
            "resolve",
            self.resolver.resolve(text, &context, &history),
        )
        .await
        {
            Ok(intent) => intent.normalized(),
            Err(e) => {
                warn!(session = %session.key, error = %e, "Intent resolution failed");
                session.push_ui(UiSpec::warning("Could not interpret the request."));
                Intent::clarify(text, format!("I couldn't interpret that request ({}).", e))
            }
        };
        info!(
            session = %session.key,
            action = %intent.action,
            confidence = intent.confidence,
            "Intent resolved"
        );

        if !intent.action.is_conversational() {
            session.explain(self.explanation_for(&intent));
        } else if matches!(intent.action, Action::Clarify | Action::Unrecognized(_))
            && !intent.explanation.is_empty()
        {
            session.say(intent.explanation.clone());
        }

        self.execute(session, &intent).await;
        mark.outcome(session)
    }

    /// Handle a button click or form submission from the current render cycle.
    pub async fn handle_callback(&self, session: &mut Session, event: CallbackEvent) -> TurnOutcome {
        let mark = Mark::of(session);
        let label = event
            .spec
            .label()
            .map(str::to_string)
            .unwrap_or_else(|| event.element_id.clone());
        session.explain(format!("Processing your interaction with element '{}'...", label));
        let selections = session.clear_pending_ui();
        info!(
            session = %session.key,
            element = %event.element_id,
            action = ?event.action,
            purpose = event.spec.purpose().unwrap_or("none"),
            "Callback received"
        );

        match event.action {
            CallbackAction::ButtonClick => match event.spec.purpose() {
                Some(purpose::CONFIRM_ALIGNMENT) => {
                    self.confirm_alignment(session, &event.spec, &selections)
                }
                _ => session.say(format!(
                    "Button '{}' clicked. Nothing is attached to it.",
                    label
                )),
            },
            CallbackAction::FormSubmit => match event.spec.purpose() {
                Some(purpose::ADD_TRIPLE) => self.submit_triple(session, &event.data),
                _ => {
                    session.say(format!("Received data from form '{}':", label));
                    session.push_ui(UiSpec::markdown(json_block(&Value::Object(event.data))));
                }
            },
        }
        mark.outcome(session)
    }

    /// Load an ontology file, replacing any loaded graph.
    pub fn load_ontology(
        &self,
        session: &mut Session,
        path: &Path,
        format: Option<OntologyFormat>,
    ) -> TurnOutcome {
        let mark = Mark::of(session);
        session.clear_pending_ui();
        let format = format
            .or_else(|| OntologyFormat::from_path(path))
            .unwrap_or(self.config.default_format);
        let name = display_name(path);
        let result = session.graph.try_load(path, format);
        self.finish_load(session, &name, result);
        mark.outcome(session)
    }

    /// Load ontology text sent inline by a surface.
    pub fn load_ontology_text(
        &self,
        session: &mut Session,
        name: &str,
        data: &str,
        format: Option<OntologyFormat>,
    ) -> TurnOutcome {
        let mark = Mark::of(session);
        session.clear_pending_ui();
        let format = format
            .or_else(|| OntologyFormat::from_path(Path::new(name)))
            .unwrap_or(self.config.default_format);
        let result = session.graph.try_load_str(data, format);
        self.finish_load(session, name, result);
        mark.outcome(session)
    }

    fn finish_load(&self, session: &mut Session, name: &str, result: Result<usize, GraphError>) {
        match result {
            Ok(_) => {
                let stats = session.graph.summary();
                info!(session = %session.key, ontology = name, triples = stats.triples, "Ontology loaded");
                session.ontology_path = Some(name.to_string());
                session.say(format!(
                    "Ontology '{}' loaded: {} triples, {} classes, {} individuals, {} properties.",
                    name, stats.triples, stats.classes, stats.individuals, stats.properties
                ));
                session.push_ui(UiSpec::info(format!("Ontology '{}' loaded.", name)));
            }
            Err(e) => {
                warn!(session = %session.key, ontology = name, error = %e, "Ontology load failed");
                session.ontology_path = None;
                session.say(format!("Failed to load ontology '{}': {}", name, e));
                session.push_ui(UiSpec::error("Ontology load failed."));
            }
        }
    }

    /// Add (or replace) a document.
    pub fn add_document(&self, session: &mut Session, name: &str, content: &str) -> TurnOutcome {
        let mark = Mark::of(session);
        session.clear_pending_ui();
        let name = name.trim();
        if name.is_empty() {
            session.say("A document needs a name.");
            session.push_ui(UiSpec::error("Document not added."));
            return mark.outcome(session);
        }
        let replaced = session
            .documents
            .insert(name.to_string(), content.to_string())
            .is_some();
        let chars = content.chars().count();
        info!(session = %session.key, document = name, chars, replaced, "Document added");
        session.say(format!(
            "Document '{}' {} ({} characters).",
            name,
            if replaced { "replaced" } else { "added" },
            chars
        ));
        if content.trim().is_empty() {
            session.push_ui(UiSpec::warning(format!("Document '{}' is empty.", name)));
        }
        mark.outcome(session)
    }

    // -- dispatch -----------------------------------------------------------

    fn explanation_for(&self, intent: &Intent) -> String {
        let mut text = format!("Okay, proceeding with '{}'.", intent.action);
        if !intent.explanation.is_empty() {
            text.push(' ');
            text.push_str(&intent.explanation);
        }
        if intent.confidence < self.config.low_confidence_threshold {
            text.push_str(&format!(
                " (I'm only {:.0}% sure I understood; rephrase if this isn't what you meant.)",
                intent.confidence * 100.0
            ));
        }
        text
    }

    async fn execute(&self, session: &mut Session, intent: &Intent) {
        match &intent.action {
            Action::Greet => session.say("Hello! How can I help with your ontology or documents?"),
            Action::Help => {
                session.say("Here is what I can do:");
                session.push_ui(UiSpec::markdown(help_markdown()));
            }
            Action::Reset => session.reset(),
            Action::Clarify => session.say("Could you please rephrase or provide more details?"),
            Action::LoadOntologyPrompt => session.say(
                "Load an ontology with `/load <path> [format]` in the terminal or the \
                 `ontology.load` method. Turtle, N-Triples, N-Quads, TriG and RDF/XML are supported.",
            ),
            Action::LoadDocumentPrompt => session.say(
                "Add a text document with `/doc <path>` in the terminal or the `document.add` method.",
            ),
            Action::ExtractEntities => {
                let kind = match intent.param_str("extraction_type") {
                    Some(k) if k.eq_ignore_ascii_case("keywords") => ExtractionKind::Keywords,
                    _ => ExtractionKind::Entities,
                };
                self.extract(session, intent, kind).await
            }
            Action::SummarizeDocument => self.extract(session, intent, ExtractionKind::Summary).await,
            Action::GenerateOntologySummary => self.summarize_ontology(session).await,
            Action::QueryOntology => self.query(session, intent).await,
            Action::ExplainConcept => self.explain_concept(session, intent).await,
            Action::AssessGaps => self.assess_gaps(session, intent).await,
            Action::AlignEntity => self.align(session, intent).await,
            Action::SuggestOntologyModification => self.suggest_modification(session, intent),
            Action::Unrecognized(name) => session.say(format!(
                "Unknown action '{}' received. Please try again.",
                name
            )),
        }
    }

    // -- preconditions ------------------------------------------------------

    fn require(&self, session: &mut Session, ontology: bool, documents: bool) -> bool {
        let missing_ontology = ontology && !session.ontology_loaded();
        let missing_documents = documents && session.documents.is_empty();
        let (message, warning) = match (missing_ontology, missing_documents) {
            (true, true) => (
                "This action requires a loaded ontology and documents.",
                "Ontology or documents missing.",
            ),
            (true, false) => ("This action requires a loaded ontology.", "Ontology not loaded."),
            (false, true) => ("This action requires loaded documents.", "No documents loaded."),
            (false, false) => return true,
        };
        debug!(session = %session.key, ontology, documents, "Precondition failed");
        session.say(message);
        session.push_ui(UiSpec::warning(warning));
        false
    }

    /// Documents named by `target`, in name order. `"all"` selects every one.
    fn select_documents(&self, session: &mut Session, target: &str) -> Option<Vec<(String, String)>> {
        if target.eq_ignore_ascii_case("all") {
            return Some(
                session
                    .documents
                    .iter()
                    .map(|(n, c)| (n.clone(), c.clone()))
                    .collect(),
            );
        }
        match session.documents.get(target) {
            Some(content) => Some(vec![(target.to_string(), content.clone())]),
            None => {
                session.say(format!("Document '{}' not found.", target));
                session.push_ui(UiSpec::warning(format!("Document not found: {}", target)));
                None
            }
        }
    }

    fn collaborator_failed(&self, session: &mut Session, what: &str, error: &LlmError) {
        warn!(session = %session.key, call = what, error = %error, "Collaborator call failed");
        session.say(format!("Sorry, the {} step failed: {}", what, error));
        session.push_ui(UiSpec::warning(match error {
            LlmError::Timeout(_) => format!("The {} step timed out.", what),
            _ => format!("The {} step failed.", what),
        }));
    }

    /// Run one extraction per document concurrently. Results come back in
    /// the order of `docs`.
    async fn extract_each(
        &self,
        docs: &[(String, String)],
        kind: ExtractionKind,
    ) -> Vec<(String, LlmResult<ExtractionOutput>)> {
        let calls = docs.iter().map(|(name, content)| async move {
            let result = with_timeout(
                self.config.collaborator_timeout,
                "extract",
                self.extractor.extract(content, kind),
            )
            .await
            .map(|output| attribute(output, name));
            (name.clone(), result)
        });
        join_all(calls).await
    }

    /// Drop empty documents, telling the user which ones were skipped.
    fn non_empty(session: &mut Session, docs: Vec<(String, String)>) -> Vec<(String, String)> {
        let (usable, empty): (Vec<_>, Vec<_>) =
            docs.into_iter().partition(|(_, c)| !c.trim().is_empty());
        for (name, _) in empty {
            session.say(format!("Skipping '{}' (no content).", name));
        }
        usable
    }

    // -- actions ------------------------------------------------------------

    async fn extract(&self, session: &mut Session, intent: &Intent, kind: ExtractionKind) {
        if !self.require(session, false, true) {
            return;
        }
        let target = intent.param_str("target_document").unwrap_or("all").to_string();
        let Some(docs) = self.select_documents(session, &target) else {
            return;
        };
        session.explain(format!("Running {} extraction on '{}'...", kind, target));
        let docs = Self::non_empty(session, docs);
        if docs.is_empty() {
            session.push_ui(UiSpec::info("Nothing to extract from."));
            return;
        }

        let mut results = BTreeMap::new();
        for (name, result) in self.extract_each(&docs, kind).await {
            match result {
                Ok(output) => {
                    results.insert(name, output);
                }
                Err(e) => {
                    self.collaborator_failed(session, &format!("{} extraction for '{}'", kind, name), &e);
                    return;
                }
            }
        }

        session.say(format!("Extraction results ({}):", kind));
        let mut rows = Vec::new();
        for (name, output) in &results {
            match output {
                ExtractionOutput::Entities(list) => rows.extend(list.iter().map(entity_row)),
                ExtractionOutput::Text(text) => {
                    session.push_ui(UiSpec::markdown(format!("**{}:**\n\n{}", name, text)))
                }
            }
        }
        if !rows.is_empty() {
            session.push_ui(UiSpec::with_id(
                "extraction_results_table",
                UiElement::Dataframe { rows },
            ));
        } else if results.values().all(|o| o.entities().is_some()) {
            session.push_ui(UiSpec::info("No entities found."));
        }
        session.last_extraction_results = results;
        session.last_extraction_kind = Some(kind);
    }

    async fn summarize_ontology(&self, session: &mut Session) {
        if !self.require(session, true, false) {
            return;
        }
        session.explain("Gathering ontology statistics and a sample of key concepts...");
        let stats = session.graph.summary();
        let sample = session
            .graph
            .key_concepts_sample(self.config.limits.concept_sample_size);
        let name = session.ontology_path.clone();
        match with_timeout(
            self.config.collaborator_timeout,
            "summarize_ontology",
            self.extractor.summarize_ontology(&stats, &sample, name.as_deref()),
        )
        .await
        {
            Ok(text) => {
                session.say("Ontology summary:");
                if let Some(row) = to_row(&stats) {
                    session.push_ui(UiSpec::table(vec![row]));
                }
                session.push_ui(UiSpec::with_id(
                    "ontology_summary_text",
                    UiElement::Markdown {
                        content: text,
                        allow_raw_markup: false,
                    },
                ));
            }
            Err(e) => self.collaborator_failed(session, "ontology summary", &e),
        }
    }

    async fn query(&self, session: &mut Session, intent: &Intent) {
        if !self.require(session, true, false) {
            return;
        }
        let query = match intent.param_str("sparql") {
            Some(sparql) => {
                session.explain("Running your SPARQL query...");
                sparql.to_string()
            }
            None => {
                let description = intent
                    .param_str("query_description")
                    .unwrap_or("unknown topic")
                    .to_string();
                session.explain(format!("Generating a SPARQL query for '{}'...", description));
                let context = session
                    .graph
                    .query_context(self.config.limits.concept_sample_size);
                match with_timeout(
                    self.config.collaborator_timeout,
                    "generate_query",
                    self.extractor.generate_query(&description, &context),
                )
                .await
                {
                    Ok(Some(q)) if !q.trim().is_empty() => {
                        session.say("Generated SPARQL query:");
                        session.push_ui(UiSpec::markdown(format!("```sparql\n{}\n```", q.trim())));
                        q
                    }
                    Ok(_) => {
                        session.say("I couldn't turn that into a SPARQL query.");
                        session.push_ui(UiSpec::warning("SPARQL generation failed"));
                        return;
                    }
                    Err(e) => {
                        self.collaborator_failed(session, "query generation", &e);
                        return;
                    }
                }
            }
        };

        session.say("Executing the query...");
        match session.graph.try_query(&query) {
            Ok(rows) => {
                info!(session = %session.key, rows = rows.len(), "Query executed");
                session.say("Query results:");
                if rows.is_empty() {
                    session.push_ui(UiSpec::info("Query executed, no results returned."));
                } else {
                    session.push_ui(UiSpec::with_id(
                        "query_results_table",
                        UiElement::Dataframe { rows: rows.clone() },
                    ));
                }
                session.last_query_results = Some(rows);
            }
            Err(e) => {
                warn!(session = %session.key, error = %e, "Query failed");
                session.say(format!(
                    "Query execution failed (check query syntax or ontology): {}",
                    e
                ));
                session.push_ui(UiSpec::error("Query execution failed"));
            }
        }
    }

    async fn explain_concept(&self, session: &mut Session, intent: &Intent) {
        if !self.require(session, true, false) {
            return;
        }
        let term = intent.param_str("concept_term").map(str::to_string);
        let uri = match intent.param_str("concept_uri") {
            Some(uri) => uri.trim_start_matches('<').trim_end_matches('>').to_string(),
            None => match term.as_deref() {
                Some(term) => match session.graph.find_by_label(term) {
                    Some(uri) => uri,
                    None => {
                        session.say(format!("No concept labelled '{}' was found in the ontology.", term));
                        session.push_ui(UiSpec::error(format!("Concept not found: {}", term)));
                        return;
                    }
                },
                None => {
                    session.say("Which concept? Give me its URI or label.");
                    session.push_ui(UiSpec::error("Missing URI"));
                    return;
                }
            },
        };

        session.explain(format!("Looking up <{}> in the ontology...", uri));
        let Some(details) = session.graph.entity_details(&uri) else {
            session.say(format!("The ontology says nothing about <{}>.", uri));
            session.push_ui(UiSpec::error(format!("Details not found for {}", uri)));
            return;
        };
        let shown = term
            .or_else(|| details.label.clone())
            .unwrap_or_else(|| ontoclaw_core::local_name(&uri).to_string());
        match with_timeout(
            self.config.collaborator_timeout,
            "explain_concept",
            self.extractor.explain_concept(&details),
        )
        .await
        {
            Ok(text) => {
                session.say(format!("Explanation for {} (<{}>):", shown, uri));
                session.push_ui(UiSpec::markdown(text));
            }
            Err(e) => self.collaborator_failed(session, "concept explanation", &e),
        }
    }

    async fn assess_gaps(&self, session: &mut Session, intent: &Intent) {
        if !self.require(session, true, true) {
            return;
        }
        let target = intent.param_str("target_document").unwrap_or("all").to_string();
        let Some(docs) = self.select_documents(session, &target) else {
            return;
        };
        session.explain(format!("Step 1: extracting terms from '{}'...", target));
        let docs = Self::non_empty(session, docs);

        let mut terms: Vec<Entity> = Vec::new();
        for (name, result) in self.extract_each(&docs, ExtractionKind::Entities).await {
            match result {
                Ok(ExtractionOutput::Entities(list)) => terms.extend(list),
                Ok(ExtractionOutput::Text(_)) => {
                    debug!(document = %name, "Extraction returned text, no terms")
                }
                Err(e) => {
                    self.collaborator_failed(session, &format!("term extraction for '{}'", name), &e);
                    return;
                }
            }
        }
        if terms.is_empty() {
            session.say("Term extraction gave nothing usable for a gap assessment.");
            session.push_ui(UiSpec::info("No terms were extracted."));
            return;
        }

        session.explain(format!(
            "Step 2: comparing {} extracted terms with the ontology...",
            terms.len()
        ));
        let inventory = session
            .graph
            .inventory()
            .limited(self.config.limits.inventory_limit, self.config.limits.label_limit);
        match with_timeout(
            self.config.collaborator_timeout,
            "assess_gaps",
            self.extractor.assess_gaps(&terms, &inventory),
        )
        .await
        {
            Ok(report) => {
                session.say("Knowledge gap assessment:");
                session.push_ui(UiSpec::markdown(format!("**Summary:** {}", report.summary)));
                if report.gaps_found.is_empty() {
                    session.push_ui(UiSpec::info("No gaps found."));
                } else {
                    let rows = report.gaps_found.iter().filter_map(to_row).collect();
                    session.push_ui(UiSpec::with_id("gaps_table", UiElement::Dataframe { rows }));
                }
                session.last_gap_assessment = Some(report);
            }
            Err(e) => self.collaborator_failed(session, "gap assessment", &e),
        }
    }

    async fn align(&self, session: &mut Session, intent: &Intent) {
        if !self.require(session, true, false) {
            return;
        }
        let Some(entity) = intent.param_str("entity_to_align").map(str::to_string) else {
            session.say("Missing 'entity_to_align' parameter.");
            session.push_ui(UiSpec::error("Missing parameter"));
            return;
        };
        session.explain(format!("Looking for ontology concepts matching '{}'...", entity));
        let inventory = session
            .graph
            .inventory()
            .limited(self.config.limits.inventory_limit, self.config.limits.label_limit);
        let result = match with_timeout(
            self.config.collaborator_timeout,
            "suggest_alignment",
            self.extractor.suggest_alignment(&entity, &inventory),
        )
        .await
        {
            Ok(result) => AlignmentResult {
                entity_text: entity.clone(),
                ..result
            }
            .normalized(),
            Err(e) => {
                self.collaborator_failed(session, "alignment", &e);
                return;
            }
        };

        let digest = digest_hex(&entity);
        let radio_key = format!("radio_align_{}", &digest[..16]);
        session.say(format!("Alignment suggestions for '{}':", entity));
        if result.candidates().next().is_none() {
            session.push_ui(UiSpec::info(format!(
                "No existing concept looks like '{}'.",
                entity
            )));
        }
        session.push_ui(UiSpec::with_id(
            radio_key.clone(),
            UiElement::Radio {
                label: format!("Select match for '{}':", entity),
                options: result
                    .suggestions
                    .iter()
                    .cloned()
                    .map(RadioOption::Concept)
                    .collect(),
                default_index: 0,
            },
        ));
        let mut extra = BTreeMap::new();
        extra.insert(LINKED_RADIO_KEY.to_string(), Value::String(radio_key));
        session.push_ui(UiSpec::with_id(
            format!("button_confirm_align_{}", &digest[..16]),
            UiElement::Button {
                label: format!("Confirm Alignment for '{}'", entity),
                purpose: Some(purpose::CONFIRM_ALIGNMENT.to_string()),
                extra,
            },
        ));
        session.last_alignment_suggestion = Some(result);
    }

    fn suggest_modification(&self, session: &mut Session, intent: &Intent) {
        if !self.require(session, true, false) {
            return;
        }
        let request = intent.param_str("raw_request").unwrap_or("your request");
        session.explain(format!("Preparing an ontology change for: '{}'", request));
        session.say(
            "Fill in the triple to add. Use full IRIs for subject and predicate; set \
             'object_is_literal' to true when the object is plain text.",
        );
        let field = |id: &str, label: &str| {
            FormField::text(id, label).with_default(intent.param_str(id).unwrap_or_default())
        };
        session.push_ui(UiSpec::new(UiElement::Form {
            label: "Add a triple to the ontology".into(),
            fields: vec![
                field("subject", "Subject IRI"),
                field("predicate", "Predicate IRI"),
                field("object", "Object (IRI or text)"),
                FormField::text("object_is_literal", "Object is literal (true/false)")
                    .with_default(intent.param_str("object_is_literal").unwrap_or("false")),
            ],
            submit_label: "Add triple".into(),
            purpose: Some(purpose::ADD_TRIPLE.to_string()),
        }));
    }

    // -- callbacks ----------------------------------------------------------

    fn confirm_alignment(
        &self,
        session: &mut Session,
        button: &UiSpec,
        selections: &HashMap<String, Value>,
    ) {
        let selected = button
            .extra_str(LINKED_RADIO_KEY)
            .and_then(|key| selections.get(key))
            .and_then(Value::as_str)
            .map(str::to_string);
        let context = session.last_alignment_suggestion.as_ref();
        let confirmed = match (selected, context) {
            (Some(uri), Some(ctx)) if ctx.find(&uri).is_some() => Some((ctx.entity_text.clone(), uri)),
            _ => None,
        };
        let Some((entity, uri)) = confirmed else {
            warn!(session = %session.key, "Alignment confirmation without selection or context");
            session.say("Sorry, could not process alignment confirmation (missing selection or context).");
            session.push_ui(UiSpec::error("Alignment confirmation failed."));
            return;
        };

        info!(session = %session.key, entity = %entity, uri = %uri, "Alignment confirmed");
        if uri == NO_MATCH_URI {
            session.say(format!(
                "Understood. '**{}**' has no match in the ontology; it is a candidate for a new concept.",
                entity
            ));
        } else {
            session.say(format!(
                "Confirmed: '**{}**' alignment with <{}> selected.",
                entity, uri
            ));
            if self.config.record_alignments {
                if session
                    .graph
                    .add_triple(&uri, skos::ALT_LABEL.as_str(), &entity, true)
                {
                    session.say(format!("Recorded '{}' as an alternative label of <{}>.", entity, uri));
                } else {
                    session.push_ui(UiSpec::warning("The alignment could not be recorded in the ontology."));
                }
            }
        }
        session.last_alignment_suggestion = None;
    }

    fn submit_triple(&self, session: &mut Session, data: &Map<String, Value>) {
        if !self.require(session, true, false) {
            return;
        }
        let field = |key: &str| {
            data.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };
        let (subject, predicate, object) = (field("subject"), field("predicate"), field("object"));
        let literal = match data.get("object_is_literal") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
            _ => false,
        };
        if subject.is_empty() || predicate.is_empty() || object.is_empty() {
            session.say("Subject, predicate and object are all required.");
            session.push_ui(UiSpec::warning("Triple not added."));
            return;
        }
        if session.graph.add_triple(&subject, &predicate, &object, literal) {
            let shown = if literal {
                format!("\"{}\"", object)
            } else {
                format!("<{}>", object)
            };
            session.say(format!("Added <{}> <{}> {}.", subject, predicate, shown));
            session.push_ui(UiSpec::info("Triple added."));
        } else {
            session.say("Could not add the triple; subject and predicate must be absolute IRIs.");
            session.push_ui(UiSpec::error("Triple not added."));
        }
    }
}

/// Stamp extracted entities with the document they came from.
fn attribute(output: ExtractionOutput, document: &str) -> ExtractionOutput {
    match output {
        ExtractionOutput::Entities(list) => ExtractionOutput::Entities(
            list.into_iter()
                .map(|mut e| {
                    if e.source_document.is_empty() {
                        e.source_document = document.to_string();
                    }
                    e
                })
                .collect(),
        ),
        text => text,
    }
}

fn entity_row(e: &Entity) -> Row {
    let mut row = Row::new();
    row.insert("text".into(), Value::String(e.text.clone()));
    row.insert("type".into(), Value::String(e.entity_type.clone()));
    row.insert("context".into(), Value::String(e.context_snippet.clone()));
    row.insert("document".into(), Value::String(e.source_document.clone()));
    row
}

fn to_row<T: Serialize>(value: &T) -> Option<Row> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn help_markdown() -> String {
    let mut out = String::from("**Requests I understand**\n\n");
    for action in Action::KNOWN.iter().filter(|a| **a != Action::Clarify) {
        out.push_str(&format!("- `{}`: {}\n", action, action.describe()));
    }
    out.push_str(
        "\n**Examples**\n\n\
         - summarize the ontology\n\
         - extract entities from report.txt\n\
         - find the gaps in all documents\n\
         - align 'Acme Corp'\n\
         - explain <http://example.org/Acme>\n\
         - SELECT ?s WHERE { ?s a ?type } LIMIT 10\n",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_actions() {
        let help = help_markdown();
        assert!(help.contains("`align_entity`"));
        assert!(help.contains("`query_ontology`"));
        assert!(!help.contains("`clarify`"));
    }

    #[test]
    fn attribute_keeps_existing_source() {
        let mut keep = Entity::new("A", "ORG", "");
        keep.source_document = "other.txt".into();
        let out = attribute(
            ExtractionOutput::Entities(vec![Entity::new("B", "ORG", ""), keep]),
            "doc.txt",
        );
        let list = out.entities().unwrap();
        assert_eq!(list[0].source_document, "doc.txt");
        assert_eq!(list[1].source_document, "other.txt");
    }
}
