//! Conversation sessions
//!
//! A [`Session`] owns everything one conversation knows: its ontology graph,
//! uploaded documents, the append-only turn history, the results of earlier
//! actions, and the widgets pending for the current render cycle. Sessions
//! share nothing; the registry hands each one out behind its own async mutex,
//! which serialises turns within a session.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ontoclaw_core::{
    AlignmentResult, ContextSnapshot, Error, ExtractionKind, ExtractionOutput, GapReport, Result,
    Row, Turn, UiSpec,
};
use ontoclaw_graph::GraphStore;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

pub use ontoclaw_core::SessionKey;

/// First turn of every fresh session.
pub const GREETING: &str =
    "Hello! I am your ontology assistant. Load an ontology and some documents, then ask me to \
summarize, query, assess knowledge gaps or align entities. Type 'help' to see everything I can do.";

pub type SharedSession = Arc<Mutex<Session>>;

pub struct SessionRegistry {
    sessions: DashMap<SessionKey, SharedSession>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn get_or_create(&self, key: &SessionKey) -> SharedSession {
        self.sessions
            .entry(key.clone())
            .or_insert_with(|| {
                info!(session = %key, "Session created");
                Arc::new(Mutex::new(Session::new(key.clone())))
            })
            .clone()
    }

    pub fn get(&self, key: &SessionKey) -> Option<SharedSession> {
        self.sessions.get(key).map(|s| s.clone())
    }

    /// Session keys, sorted.
    pub fn list(&self) -> Vec<SessionKey> {
        let mut keys: Vec<SessionKey> = self.sessions.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn remove(&self, key: &SessionKey) -> Option<SharedSession> {
        let removed = self.sessions.remove(key).map(|(_, s)| s);
        if removed.is_some() {
            info!(session = %key, "Session removed");
        }
        removed
    }

    /// Drop sessions whose last turn is older than `max_idle`. Sessions busy
    /// with a turn are kept. Returns how many were dropped.
    pub fn evict_idle(&self, max_idle: chrono::Duration) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|key, shared| match shared.try_lock() {
            Ok(session) => {
                let keep = now - session.last_active() < max_idle;
                if !keep {
                    info!(session = %key, "Idle session evicted");
                }
                keep
            }
            Err(_) => true,
        });
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

pub struct Session {
    pub key: SessionKey,
    pub graph: GraphStore,
    /// Display name of the loaded ontology file.
    pub ontology_path: Option<String>,
    /// File name → text.
    pub documents: BTreeMap<String, String>,
    pub last_extraction_results: BTreeMap<String, ExtractionOutput>,
    pub last_extraction_kind: Option<ExtractionKind>,
    pub last_gap_assessment: Option<GapReport>,
    /// Context for a later alignment confirmation. At most one is pending.
    pub last_alignment_suggestion: Option<AlignmentResult>,
    pub last_query_results: Option<Vec<Row>>,
    history: Vec<Turn>,
    pending_ui: Vec<UiSpec>,
    selections: HashMap<String, Value>,
    epoch: u64,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            graph: GraphStore::new(),
            ontology_path: None,
            documents: BTreeMap::new(),
            last_extraction_results: BTreeMap::new(),
            last_extraction_kind: None,
            last_gap_assessment: None,
            last_alignment_suggestion: None,
            last_query_results: None,
            history: vec![Turn::assistant(GREETING)],
            pending_ui: Vec::new(),
            selections: HashMap::new(),
            epoch: 0,
        }
    }

    /// Forget everything but the key. Leaves exactly one greeting turn.
    pub fn reset(&mut self) {
        let key = self.key.clone();
        let epoch = self.epoch + 1;
        *self = Self::new(key);
        self.epoch = epoch;
        info!(session = %self.key, epoch, "Session reset");
    }

    /// Bumped by every reset.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn ontology_loaded(&self) -> bool {
        self.graph.is_loaded()
    }

    // -- history ------------------------------------------------------------

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The last `n` turns, oldest first.
    pub fn recent_history(&self, n: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Time of the latest turn.
    pub fn last_active(&self) -> DateTime<Utc> {
        self.history.last().map(|t| t.at).unwrap_or_else(Utc::now)
    }

    pub fn push(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    /// Append a plain assistant message.
    pub fn say(&mut self, content: impl Into<String>) {
        self.push(Turn::assistant(content));
    }

    /// Append an assistant turn narrating what is about to happen.
    pub fn explain(&mut self, content: impl Into<String>) {
        self.push(Turn::explanation(content));
    }

    // -- pending UI ---------------------------------------------------------

    pub fn pending_ui(&self) -> &[UiSpec] {
        &self.pending_ui
    }

    pub fn push_ui(&mut self, spec: UiSpec) {
        self.pending_ui.push(spec);
    }

    pub fn selections(&self) -> &HashMap<String, Value> {
        &self.selections
    }

    pub fn selection(&self, key: &str) -> Option<&Value> {
        self.selections.get(key)
    }

    /// End the render cycle: drop pending widgets and their selections
    /// together. Returns the selections as they were.
    pub fn clear_pending_ui(&mut self) -> HashMap<String, Value> {
        self.pending_ui.clear();
        std::mem::take(&mut self.selections)
    }

    /// Record the value chosen on a pending radio. The value must be one of
    /// that radio's underlying option values.
    pub fn select(&mut self, key: &str, value: Value) -> Result<()> {
        let radio = self.pending_radio(key)?;
        if !radio.offers_value(&value) {
            return Err(Error::invalid_selection(key, format!("{} is not an option", value)));
        }
        self.selections.insert(key.to_string(), value);
        Ok(())
    }

    /// Select the option at `index`. Returns the published value.
    pub fn select_index(&mut self, key: &str, index: usize) -> Result<Value> {
        let value = self
            .pending_radio(key)?
            .option_value(index)
            .ok_or_else(|| Error::invalid_selection(key, format!("no option at index {}", index)))?;
        self.selections.insert(key.to_string(), value.clone());
        Ok(value)
    }

    /// Publish each pending radio's default value, as a surface does when it
    /// first draws the radio. Existing selections are kept.
    pub fn publish_defaults(&mut self) {
        for spec in &self.pending_ui {
            if let Some(value) = spec.default_value() {
                self.selections.entry(spec.id()).or_insert(value);
            }
        }
    }

    fn pending_radio(&self, key: &str) -> Result<&UiSpec> {
        self.pending_ui
            .iter()
            .find(|s| s.is_radio() && s.id() == key)
            .ok_or_else(|| Error::invalid_selection(key, "no such radio is pending"))
    }

    // -- views --------------------------------------------------------------

    /// What the intent resolver may see.
    pub fn context_snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            ontology_loaded: self.ontology_loaded(),
            ontology_path: self.ontology_path.clone(),
            document_names: self.documents.keys().cloned().collect(),
            has_extraction_results: !self.last_extraction_results.is_empty(),
            has_gap_assessment: self.last_gap_assessment.is_some(),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            key: self.key.clone(),
            epoch: self.epoch,
            ontology_loaded: self.ontology_loaded(),
            ontology_path: self.ontology_path.clone(),
            triples: self.graph.len(),
            documents: self.documents.keys().cloned().collect(),
            turns: self.history.len(),
            pending_ui: self.pending_ui.clone(),
            selections: self.selections.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            last_extraction_kind: self.last_extraction_kind,
            extraction_results: self.last_extraction_results.keys().cloned().collect(),
            has_gap_assessment: self.last_gap_assessment.is_some(),
            pending_alignment: self
                .last_alignment_suggestion
                .as_ref()
                .map(|a| a.entity_text.clone()),
            last_query_rows: self.last_query_results.as_ref().map(Vec::len),
        }
    }
}

/// Serializable overview of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub key: SessionKey,
    pub epoch: u64,
    pub ontology_loaded: bool,
    pub ontology_path: Option<String>,
    pub triples: usize,
    pub documents: Vec<String>,
    pub turns: usize,
    pub pending_ui: Vec<UiSpec>,
    pub selections: BTreeMap<String, Value>,
    pub last_extraction_kind: Option<ExtractionKind>,
    pub extraction_results: Vec<String>,
    pub has_gap_assessment: bool,
    pub pending_alignment: Option<String>,
    pub last_query_rows: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoclaw_core::{RadioOption, UiElement};
    use serde_json::json;

    fn radio(id: &str) -> UiSpec {
        UiSpec::with_id(
            id,
            UiElement::Radio {
                label: "Pick".into(),
                options: vec![RadioOption::Scalar(json!("a")), RadioOption::Scalar(json!("b"))],
                default_index: 1,
            },
        )
    }

    #[test]
    fn new_session_has_greeting() {
        let s = Session::new("k".into());
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.history()[0].content, GREETING);
    }

    #[test]
    fn select_validates_key_and_value() {
        let mut s = Session::new("k".into());
        s.push_ui(radio("r1"));
        assert!(s.select("r1", json!("a")).is_ok());
        assert!(s.select("r1", json!("zzz")).is_err());
        assert!(s.select("r2", json!("a")).is_err());
        assert_eq!(s.select_index("r1", 1).unwrap(), json!("b"));
        assert!(s.select_index("r1", 9).is_err());
    }

    #[test]
    fn clear_returns_snapshot_and_empties_both() {
        let mut s = Session::new("k".into());
        s.push_ui(radio("r1"));
        s.publish_defaults();
        assert_eq!(s.selection("r1"), Some(&json!("b")));
        let snapshot = s.clear_pending_ui();
        assert_eq!(snapshot.get("r1"), Some(&json!("b")));
        assert!(s.pending_ui().is_empty());
        assert!(s.selections().is_empty());
    }

    #[test]
    fn recent_history_window() {
        let mut s = Session::new("k".into());
        for i in 0..10 {
            s.say(format!("m{}", i));
        }
        let recent = s.recent_history(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[2].content, "m9");
        assert_eq!(s.recent_history(100).len(), 11);
    }
}
