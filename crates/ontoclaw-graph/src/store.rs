//! GraphStore: custodian of one in-memory RDF graph.
//!
//! A load parses the whole file into a fresh store and only then swaps it in,
//! so a failed load never leaves a half-parsed graph behind. On failure the
//! store reverts to "no graph".
//!
//! Class, individual and property views follow OWL/RDFS conventions loosely.
//! Individuals are found with a two-pass heuristic: subjects typed
//! `owl:NamedIndividual`, plus every subject whose asserted type is not a
//! schema meta-type (see [`vocab::is_meta_type`]). This recovers individuals
//! typed only through a domain class, at the price of occasional miscounts.
//! Treat the counts as estimates.

use crate::error::{GraphError, GraphResult};
use crate::vocab::{self, owl};
use ontoclaw_core::records::{
    ConceptDetails, ConceptRef, ConceptSample, IncomingLink, OntologyInventory, OntologySummary,
    PropertyValue, QueryContext, Row,
};
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::vocab::{rdf, rdfs, xsd};
use oxigraph::model::{
    GraphName, Literal, NamedNode, NamedNodeRef, Quad, Subject, SubjectRef, Term, TermRef,
};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Outgoing/incoming links returned by [`GraphStore::entity_details`].
const DETAIL_LINK_CAP: usize = 50;

/// Supported RDF serializations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OntologyFormat {
    Turtle,
    NTriples,
    NQuads,
    TriG,
    RdfXml,
}

impl OntologyFormat {
    /// Guess from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ttl" | "turtle" => Some(Self::Turtle),
            "nt" => Some(Self::NTriples),
            "nq" => Some(Self::NQuads),
            "trig" => Some(Self::TriG),
            "rdf" | "owl" | "xml" => Some(Self::RdfXml),
            _ => None,
        }
    }

    fn rdf_format(self) -> RdfFormat {
        match self {
            Self::Turtle => RdfFormat::Turtle,
            Self::NTriples => RdfFormat::NTriples,
            Self::NQuads => RdfFormat::NQuads,
            Self::TriG => RdfFormat::TriG,
            Self::RdfXml => RdfFormat::RdfXml,
        }
    }
}

impl FromStr for OntologyFormat {
    type Err = GraphError;

    fn from_str(s: &str) -> GraphResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "turtle" | "ttl" | "text/turtle" => Ok(Self::Turtle),
            "nt" | "ntriples" | "n-triples" | "application/n-triples" => Ok(Self::NTriples),
            "nq" | "nquads" | "n-quads" | "application/n-quads" => Ok(Self::NQuads),
            "trig" | "application/trig" => Ok(Self::TriG),
            "xml" | "rdfxml" | "rdf/xml" | "rdf-xml" | "owl" | "application/rdf+xml" => {
                Ok(Self::RdfXml)
            }
            other => Err(GraphError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for OntologyFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Turtle => "turtle",
            Self::NTriples => "ntriples",
            Self::NQuads => "nquads",
            Self::TriG => "trig",
            Self::RdfXml => "rdfxml",
        })
    }
}

/// One ontology graph plus the prefix table of the file it came from.
#[derive(Default)]
pub struct GraphStore {
    store: Option<Store>,
    namespaces: BTreeMap<String, String>,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("loaded", &self.is_loaded())
            .field("triples", &self.len())
            .finish()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_some()
    }

    /// Number of triples, 0 when nothing is loaded.
    pub fn len(&self) -> usize {
        self.store
            .as_ref()
            .and_then(|s| s.len().ok())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the graph.
    pub fn clear(&mut self) {
        self.store = None;
        self.namespaces.clear();
    }

    // -- loading ------------------------------------------------------------

    /// Replace the graph with the contents of `path`. Returns false (and leaves
    /// no graph loaded) on any read or parse failure.
    pub fn load(&mut self, path: &Path, format: OntologyFormat) -> bool {
        match self.try_load(path, format) {
            Ok(count) => {
                info!(path = %path.display(), %format, triples = count, "Ontology loaded");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), %format, error = %e, "Error loading ontology");
                false
            }
        }
    }

    pub fn try_load(&mut self, path: &Path, format: OntologyFormat) -> GraphResult<usize> {
        self.clear();
        let file = std::fs::File::open(path).map_err(|source| GraphError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let (store, namespaces) = parse_graph(BufReader::new(file), format)?;
        let count = store.len()?;
        self.store = Some(store);
        self.namespaces = namespaces;
        Ok(count)
    }

    /// Replace the graph with RDF text held in memory.
    pub fn try_load_str(&mut self, data: &str, format: OntologyFormat) -> GraphResult<usize> {
        self.clear();
        let (store, namespaces) = parse_graph(data.as_bytes(), format)?;
        let count = store.len()?;
        self.store = Some(store);
        self.namespaces = namespaces;
        Ok(count)
    }

    // -- structural views ---------------------------------------------------

    /// Triple/class/individual/property counts. All zero when nothing is loaded.
    pub fn summary(&self) -> OntologySummary {
        let Some(store) = &self.store else {
            return OntologySummary::default();
        };
        OntologySummary {
            triples: store.len().unwrap_or(0),
            classes: subjects_of_type(store, owl::CLASS).len(),
            individuals: individual_subjects(store).len(),
            properties: property_subjects(store).len(),
        }
    }

    pub fn list_classes(&self) -> Vec<String> {
        match &self.store {
            Some(store) => named(subjects_of_type(store, owl::CLASS)),
            None => Vec::new(),
        }
    }

    /// Named individuals by the two-pass heuristic. Blank subjects are left out.
    pub fn list_individuals(&self) -> Vec<String> {
        match &self.store {
            Some(store) => named(individual_subjects(store)),
            None => Vec::new(),
        }
    }

    pub fn list_properties(&self) -> Vec<String> {
        match &self.store {
            Some(store) => named(property_subjects(store)),
            None => Vec::new(),
        }
    }

    /// First `rdfs:label` of `uri`. Absent when there is none or the IRI is malformed.
    pub fn label_for(&self, uri: &str) -> Option<String> {
        self.first_object_text(uri, rdfs::LABEL)
    }

    pub fn comment_for(&self, uri: &str) -> Option<String> {
        self.first_object_text(uri, rdfs::COMMENT)
    }

    /// Every labelled named resource, first label wins.
    pub fn all_labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        let Some(store) = &self.store else {
            return labels;
        };
        for quad in quads(store, None, Some(rdfs::LABEL), None) {
            if let Subject::NamedNode(s) = &quad.subject {
                labels
                    .entry(s.as_str().to_string())
                    .or_insert_with(|| term_text(&quad.object));
            }
        }
        labels
    }

    /// Prefix → namespace IRI, from the loaded file plus the standard vocabularies.
    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }

    /// A few classes and properties with their labels, for prompts.
    pub fn key_concepts_sample(&self, n: usize) -> ConceptSample {
        let refs = |uris: Vec<String>| -> Vec<ConceptRef> {
            uris.into_iter()
                .take(n)
                .map(|uri| ConceptRef {
                    label: self.label_for(&uri),
                    uri,
                })
                .collect()
        };
        ConceptSample {
            classes: refs(self.list_classes()),
            properties: refs(self.list_properties()),
        }
    }

    /// Classes, individuals and labels in one bundle.
    pub fn inventory(&self) -> OntologyInventory {
        OntologyInventory {
            classes: self.list_classes(),
            individuals: self.list_individuals(),
            labels: self.all_labels(),
        }
    }

    pub fn query_context(&self, sample_size: usize) -> QueryContext {
        QueryContext {
            sample: self.key_concepts_sample(sample_size),
            namespaces: self.namespaces.clone(),
        }
    }

    /// Everything asserted directly about `uri`. Absent when nothing mentions it.
    pub fn entity_details(&self, uri: &str) -> Option<ConceptDetails> {
        let store = self.store.as_ref()?;
        let node = NamedNode::new(uri).ok()?;

        let mut types = Vec::new();
        let mut outgoing = Vec::new();
        for quad in quads(store, Some(node.as_ref().into()), None, None) {
            if quad.predicate == rdf::TYPE {
                types.push(term_text(&quad.object));
            } else if outgoing.len() < DETAIL_LINK_CAP {
                outgoing.push(PropertyValue {
                    predicate: quad.predicate.as_str().to_string(),
                    value: term_to_json(&quad.object),
                });
            }
        }

        let incoming: Vec<IncomingLink> = quads(store, None, None, Some(node.as_ref().into()))
            .take(DETAIL_LINK_CAP)
            .map(|quad| IncomingLink {
                subject: subject_text(&quad.subject),
                predicate: quad.predicate.as_str().to_string(),
            })
            .collect();

        if types.is_empty() && outgoing.is_empty() && incoming.is_empty() {
            return None;
        }

        Some(ConceptDetails {
            uri: uri.to_string(),
            label: self.label_for(uri),
            comment: self.comment_for(uri),
            types,
            outgoing,
            incoming,
        })
    }

    /// Resource whose label (or IRI local name) equals `term`, ignoring case.
    pub fn find_by_label(&self, term: &str) -> Option<String> {
        let wanted = term.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        let labels = self.all_labels();
        if let Some((uri, _)) = labels.iter().find(|(_, l)| l.to_lowercase() == wanted) {
            return Some(uri.clone());
        }
        self.list_classes()
            .into_iter()
            .chain(self.list_individuals())
            .chain(self.list_properties())
            .find(|uri| ontoclaw_core::local_name(uri).to_lowercase() == wanted)
    }

    // -- queries ------------------------------------------------------------

    /// Run a SPARQL query. `None` when nothing is loaded or the query fails;
    /// an empty vector when it runs and matches nothing.
    pub fn run_query(&self, query: &str) -> Option<Vec<Row>> {
        match self.try_query(query) {
            Ok(rows) => Some(rows),
            Err(GraphError::NotLoaded) => {
                info!("Cannot query, no ontology loaded");
                None
            }
            Err(e) => {
                warn!(error = %e, "Error executing SPARQL query");
                None
            }
        }
    }

    /// Rows carry every projected variable; unbound ones are `null`.
    /// ASK yields one `{"result": bool}` row, CONSTRUCT/DESCRIBE yield
    /// `{subject, predicate, object}` rows.
    pub fn try_query(&self, query: &str) -> GraphResult<Vec<Row>> {
        let store = self.store.as_ref().ok_or(GraphError::NotLoaded)?;
        debug!(query, "Executing SPARQL");
        let mut rows = Vec::new();
        match store.query(query)? {
            QueryResults::Solutions(solutions) => {
                let variables = solutions.variables().to_vec();
                for solution in solutions {
                    let solution = solution?;
                    let mut row = Row::new();
                    for var in &variables {
                        let value = solution.get(var).map(term_to_json).unwrap_or(Value::Null);
                        row.insert(var.as_str().to_string(), value);
                    }
                    rows.push(row);
                }
            }
            QueryResults::Boolean(result) => {
                let mut row = Row::new();
                row.insert("result".into(), Value::Bool(result));
                rows.push(row);
            }
            QueryResults::Graph(triples) => {
                for triple in triples {
                    let triple = triple?;
                    let mut row = Row::new();
                    row.insert("subject".into(), Value::String(subject_text(&triple.subject)));
                    row.insert(
                        "predicate".into(),
                        Value::String(triple.predicate.as_str().to_string()),
                    );
                    row.insert("object".into(), term_to_json(&triple.object));
                    rows.push(row);
                }
            }
        }
        Ok(rows)
    }

    // -- mutation -----------------------------------------------------------

    /// Add one triple. Returns false when nothing is loaded or an IRI is malformed.
    pub fn add_triple(&mut self, subject: &str, predicate: &str, object: &str, object_is_literal: bool) -> bool {
        match self.try_add_triple(subject, predicate, object, object_is_literal) {
            Ok(()) => {
                info!(subject, predicate, object, "Triple added");
                true
            }
            Err(e) => {
                warn!(error = %e, "Error adding triple");
                false
            }
        }
    }

    pub fn try_add_triple(
        &mut self,
        subject: &str,
        predicate: &str,
        object: &str,
        object_is_literal: bool,
    ) -> GraphResult<()> {
        let store = self.store.as_ref().ok_or(GraphError::NotLoaded)?;
        let s = NamedNode::new(subject.trim()).map_err(|e| GraphError::invalid_iri(subject, e))?;
        let p =
            NamedNode::new(predicate.trim()).map_err(|e| GraphError::invalid_iri(predicate, e))?;
        let o: Term = if object_is_literal {
            Literal::new_simple_literal(object).into()
        } else {
            NamedNode::new(object.trim())
                .map_err(|e| GraphError::invalid_iri(object, e))?
                .into()
        };
        store.insert(&Quad::new(s, p, o, GraphName::DefaultGraph))?;
        Ok(())
    }

    fn first_object_text(&self, uri: &str, predicate: NamedNodeRef<'_>) -> Option<String> {
        let store = self.store.as_ref()?;
        let node = NamedNode::new(uri).ok()?;
        quads(store, Some(node.as_ref().into()), Some(predicate), None)
            .next()
            .map(|q| term_text(&q.object))
    }
}

fn parse_graph(
    reader: impl std::io::Read,
    format: OntologyFormat,
) -> GraphResult<(Store, BTreeMap<String, String>)> {
    let store = Store::new()?;
    let mut parser = RdfParser::from_format(format.rdf_format()).for_reader(reader);
    for quad in parser.by_ref() {
        let quad = quad.map_err(|e| GraphError::Parse(e.to_string()))?;
        store.insert(&quad)?;
    }

    let mut namespaces: BTreeMap<String, String> = [
        ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
        ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
        ("owl", "http://www.w3.org/2002/07/owl#"),
        ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ]
    .into_iter()
    .map(|(p, iri)| (p.to_string(), iri.to_string()))
    .collect();
    for (prefix, iri) in parser.prefixes() {
        namespaces.insert(prefix.to_string(), iri.to_string());
    }
    Ok((store, namespaces))
}

/// Quads matching a pattern across all graphs. Storage errors end the scan.
fn quads<'a>(
    store: &'a Store,
    subject: Option<SubjectRef<'_>>,
    predicate: Option<NamedNodeRef<'_>>,
    object: Option<TermRef<'_>>,
) -> impl Iterator<Item = Quad> + 'a {
    store
        .quads_for_pattern(subject, predicate, object, None)
        .map_while(|q| match q {
            Ok(q) => Some(q),
            Err(e) => {
                warn!(error = %e, "Graph scan aborted");
                None
            }
        })
}

fn push_unique(seen: &mut HashSet<Subject>, out: &mut Vec<Subject>, subject: Subject) {
    if seen.insert(subject.clone()) {
        out.push(subject);
    }
}

fn subjects_of_type(store: &Store, ty: NamedNodeRef<'_>) -> Vec<Subject> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for quad in quads(store, None, Some(rdf::TYPE), Some(ty.into())) {
        push_unique(&mut seen, &mut out, quad.subject);
    }
    out
}

fn individual_subjects(store: &Store) -> Vec<Subject> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for subject in subjects_of_type(store, owl::NAMED_INDIVIDUAL) {
        push_unique(&mut seen, &mut out, subject);
    }
    for quad in quads(store, None, Some(rdf::TYPE), None) {
        let is_meta = matches!(&quad.object, Term::NamedNode(t) if vocab::is_meta_type(t.as_str()));
        if !is_meta {
            push_unique(&mut seen, &mut out, quad.subject);
        }
    }
    out
}

fn property_subjects(store: &Store) -> Vec<Subject> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for ty in [owl::OBJECT_PROPERTY, owl::DATATYPE_PROPERTY] {
        for subject in subjects_of_type(store, ty) {
            push_unique(&mut seen, &mut out, subject);
        }
    }
    out
}

/// Named subjects as sorted IRI strings.
fn named(subjects: Vec<Subject>) -> Vec<String> {
    let mut uris: Vec<String> = subjects
        .into_iter()
        .filter_map(|s| match s {
            Subject::NamedNode(n) => Some(n.into_string()),
            _ => None,
        })
        .collect();
    uris.sort();
    uris
}

fn subject_text(subject: &Subject) -> String {
    match subject {
        Subject::NamedNode(n) => n.as_str().to_string(),
        other => other.to_string(),
    }
}

/// Plain text of a term: IRI, literal lexical form, or blank node id.
fn term_text(term: &Term) -> String {
    match term {
        Term::NamedNode(n) => n.as_str().to_string(),
        Term::Literal(l) => l.value().to_string(),
        other => other.to_string(),
    }
}

/// IRIs and literals as plain JSON scalars. Numeric and boolean literals keep their type.
fn term_to_json(term: &Term) -> Value {
    let Term::Literal(lit) = term else {
        return Value::String(term_text(term));
    };
    let dt = lit.datatype();
    let value = lit.value();
    let integer_types = [
        xsd::INTEGER,
        xsd::INT,
        xsd::LONG,
        xsd::SHORT,
        xsd::BYTE,
        xsd::NON_NEGATIVE_INTEGER,
        xsd::POSITIVE_INTEGER,
        xsd::NON_POSITIVE_INTEGER,
        xsd::NEGATIVE_INTEGER,
        xsd::UNSIGNED_INT,
        xsd::UNSIGNED_LONG,
        xsd::UNSIGNED_SHORT,
        xsd::UNSIGNED_BYTE,
    ];
    if integer_types.iter().any(|t| *t == dt) {
        if let Ok(i) = value.parse::<i64>() {
            return Value::from(i);
        }
    } else if dt == xsd::DECIMAL || dt == xsd::DOUBLE || dt == xsd::FLOAT {
        if let Some(n) = value.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            return Value::Number(n);
        }
    } else if dt == xsd::BOOLEAN {
        match value {
            "true" | "1" => return Value::Bool(true),
            "false" | "0" => return Value::Bool(false),
            _ => {}
        }
    }
    Value::String(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_str_and_path() {
        assert_eq!("ttl".parse::<OntologyFormat>().unwrap(), OntologyFormat::Turtle);
        assert_eq!("application/rdf+xml".parse::<OntologyFormat>().unwrap(), OntologyFormat::RdfXml);
        assert!("json-ld".parse::<OntologyFormat>().is_err());
        assert_eq!(OntologyFormat::from_path(Path::new("a/b.OWL")), Some(OntologyFormat::RdfXml));
        assert_eq!(OntologyFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn literal_coercion() {
        let int: Term = Literal::new_typed_literal("42", xsd::INTEGER).into();
        assert_eq!(term_to_json(&int), Value::from(42));
        let b: Term = Literal::new_typed_literal("true", xsd::BOOLEAN).into();
        assert_eq!(term_to_json(&b), Value::Bool(true));
        let s: Term = Literal::new_simple_literal("Acme").into();
        assert_eq!(term_to_json(&s), Value::String("Acme".into()));
        let iri: Term = NamedNode::new_unchecked("http://ex.org/A").into();
        assert_eq!(term_to_json(&iri), Value::String("http://ex.org/A".into()));
    }
}
