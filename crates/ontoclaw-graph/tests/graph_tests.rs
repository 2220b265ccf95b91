//! Tests for ontoclaw-graph: loading, structural views, queries, mutation

use ontoclaw_graph::vocab::skos;
use ontoclaw_graph::{GraphError, GraphStore, OntologyFormat};
use serde_json::{json, Value};
use std::io::Write;
use tempfile::NamedTempFile;

/// 3 classes, 2 individuals, 10 triples.
const SMALL_ONTOLOGY: &str = r#"
@prefix ex: <http://ex.org/> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

ex:Company a owl:Class ; rdfs:label "Company" .
ex:Person a owl:Class ; rdfs:label "Person" .
ex:Product a owl:Class .
ex:Acme a owl:NamedIndividual, ex:Company ; rdfs:label "Acme" .
ex:Alice a ex:Person ; rdfs:label "Alice" .
"#;

const WITH_PROPERTIES: &str = r#"
@prefix ex: <http://ex.org/> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ex:Company a owl:Class ; rdfs:label "Company" ; rdfs:comment "A legal business entity." .
ex:employs a owl:ObjectProperty ; rdfs:label "employs" .
ex:founded a owl:DatatypeProperty .
ex:Acme a ex:Company ; ex:founded "1999"^^xsd:integer ; ex:employs ex:Alice .
ex:Alice a ex:Person .
_:anon a ex:Company .
"#;

fn ttl_file(content: &str) -> NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".ttl").tempfile().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f
}

fn loaded(content: &str) -> GraphStore {
    let f = ttl_file(content);
    let mut g = GraphStore::new();
    assert!(g.load(f.path(), OntologyFormat::Turtle));
    g
}

// ===========================================================================
// Loading
// ===========================================================================

#[test]
fn load_small_ontology_summary() {
    let g = loaded(SMALL_ONTOLOGY);
    let s = g.summary();
    assert_eq!(s.triples, 10);
    assert_eq!(s.classes, 3);
    assert_eq!(s.individuals, 2);
    assert_eq!(s.properties, 0);
}

#[test]
fn load_failure_resets_to_no_graph() {
    let mut g = loaded(SMALL_ONTOLOGY);
    assert!(g.is_loaded());

    let bad = ttl_file("@prefix ex: <http://ex.org/> .\nex:A a ex:B ;;; broken");
    assert!(!g.load(bad.path(), OntologyFormat::Turtle));
    assert!(!g.is_loaded());
    assert_eq!(g.summary().triples, 0);
    assert!(g.list_classes().is_empty());
}

#[test]
fn load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut g = GraphStore::new();
    let err = g
        .try_load(&dir.path().join("absent.ttl"), OntologyFormat::Turtle)
        .unwrap_err();
    assert!(matches!(err, GraphError::Read { .. }));
    assert!(!g.is_loaded());
}

#[test]
fn reload_replaces_instead_of_merging() {
    let mut g = loaded(SMALL_ONTOLOGY);
    let other = ttl_file("<http://ex.org/X> a <http://www.w3.org/2002/07/owl#Class> .");
    assert!(g.load(other.path(), OntologyFormat::Turtle));
    assert_eq!(g.summary().triples, 1);
    assert_eq!(g.list_classes(), vec!["http://ex.org/X".to_string()]);
}

#[test]
fn namespaces_include_file_prefixes_and_standard_ones() {
    let g = loaded(SMALL_ONTOLOGY);
    let ns = g.namespaces();
    assert_eq!(ns.get("ex").map(String::as_str), Some("http://ex.org/"));
    assert!(ns.contains_key("rdf"));
    assert!(ns.contains_key("xsd"));
}

#[test]
fn load_from_string_in_other_format() {
    let mut g = GraphStore::new();
    let n = g
        .try_load_str(
            "<http://ex.org/A> <http://www.w3.org/2000/01/rdf-schema#label> \"A\" .\n",
            OntologyFormat::NTriples,
        )
        .unwrap();
    assert_eq!(n, 1);
    assert_eq!(g.label_for("http://ex.org/A").as_deref(), Some("A"));
}

// ===========================================================================
// Views on an unloaded graph
// ===========================================================================

#[test]
fn unloaded_graph_returns_zero_values() {
    let g = GraphStore::new();
    assert_eq!(g.summary(), Default::default());
    assert!(g.list_classes().is_empty());
    assert!(g.list_individuals().is_empty());
    assert!(g.all_labels().is_empty());
    assert!(g.label_for("http://ex.org/Acme").is_none());
    assert!(g.entity_details("http://ex.org/Acme").is_none());
    assert!(g.key_concepts_sample(5).classes.is_empty());
}

// ===========================================================================
// Structural views
// ===========================================================================

#[test]
fn classes_and_individuals_are_sorted_iris() {
    let g = loaded(SMALL_ONTOLOGY);
    assert_eq!(
        g.list_classes(),
        vec!["http://ex.org/Company", "http://ex.org/Person", "http://ex.org/Product"]
    );
    assert_eq!(
        g.list_individuals(),
        vec!["http://ex.org/Acme", "http://ex.org/Alice"]
    );
}

#[test]
fn individuals_typed_only_by_domain_class_are_found() {
    let g = loaded(WITH_PROPERTIES);
    let individuals = g.list_individuals();
    assert!(individuals.contains(&"http://ex.org/Acme".to_string()));
    assert!(individuals.contains(&"http://ex.org/Alice".to_string()));
    // properties are schema terms, not individuals
    assert!(!individuals.contains(&"http://ex.org/employs".to_string()));
    // the blank subject is counted but not listed
    assert_eq!(individuals.len(), 2);
    assert_eq!(g.summary().individuals, 3);
}

#[test]
fn properties_union_object_and_datatype() {
    let g = loaded(WITH_PROPERTIES);
    assert_eq!(g.summary().properties, 2);
    assert_eq!(
        g.list_properties(),
        vec!["http://ex.org/employs", "http://ex.org/founded"]
    );
}

#[test]
fn labels_and_malformed_iris() {
    let g = loaded(SMALL_ONTOLOGY);
    assert_eq!(g.label_for("http://ex.org/Acme").as_deref(), Some("Acme"));
    assert!(g.label_for("http://ex.org/Product").is_none());
    assert!(g.label_for("not an iri").is_none());
    let labels = g.all_labels();
    assert_eq!(labels.len(), 4);
    assert_eq!(labels["http://ex.org/Alice"], "Alice");
}

#[test]
fn key_concepts_sample_respects_size() {
    let g = loaded(SMALL_ONTOLOGY);
    let sample = g.key_concepts_sample(2);
    assert_eq!(sample.classes.len(), 2);
    assert_eq!(sample.classes[0].uri, "http://ex.org/Company");
    assert_eq!(sample.classes[0].label.as_deref(), Some("Company"));
    assert!(sample.properties.is_empty());
}

#[test]
fn entity_details_collects_links() {
    let g = loaded(WITH_PROPERTIES);
    let d = g.entity_details("http://ex.org/Acme").unwrap();
    assert_eq!(d.types, vec!["http://ex.org/Company".to_string()]);
    let founded = d
        .outgoing
        .iter()
        .find(|p| p.predicate == "http://ex.org/founded")
        .unwrap();
    assert_eq!(founded.value, json!(1999));

    let alice = g.entity_details("http://ex.org/Alice").unwrap();
    assert_eq!(alice.incoming.len(), 1);
    assert_eq!(alice.incoming[0].subject, "http://ex.org/Acme");

    let company = g.entity_details("http://ex.org/Company").unwrap();
    assert_eq!(company.comment.as_deref(), Some("A legal business entity."));

    assert!(g.entity_details("http://ex.org/Nobody").is_none());
}

#[test]
fn find_by_label_is_case_insensitive() {
    let g = loaded(SMALL_ONTOLOGY);
    assert_eq!(g.find_by_label("acme").as_deref(), Some("http://ex.org/Acme"));
    assert_eq!(g.find_by_label("PRODUCT").as_deref(), Some("http://ex.org/Product"));
    assert!(g.find_by_label("Widget").is_none());
    assert!(g.find_by_label("  ").is_none());
}

#[test]
fn inventory_bundles_views() {
    let g = loaded(SMALL_ONTOLOGY);
    let inv = g.inventory();
    assert_eq!(inv.classes.len(), 3);
    assert_eq!(inv.individuals.len(), 2);
    assert_eq!(inv.labels.len(), 4);
}

// ===========================================================================
// Queries
// ===========================================================================

#[test]
fn query_outcomes_are_distinguishable() {
    let unloaded = GraphStore::new();
    assert!(unloaded.run_query("SELECT ?s WHERE { ?s ?p ?o }").is_none());
    assert!(matches!(
        unloaded.try_query("SELECT ?s WHERE { ?s ?p ?o }"),
        Err(GraphError::NotLoaded)
    ));

    let g = loaded(SMALL_ONTOLOGY);
    assert!(g.run_query("SELEKT nonsense").is_none());
    assert!(matches!(g.try_query("SELEKT nonsense"), Err(GraphError::Query(_))));

    let empty = g
        .run_query("SELECT ?s WHERE { ?s <http://ex.org/nothing> ?o }")
        .unwrap();
    assert!(empty.is_empty());
}

#[test]
fn select_rows_keep_unbound_variables() {
    let g = loaded(SMALL_ONTOLOGY);
    let rows = g
        .run_query(
            "PREFIX owl: <http://www.w3.org/2002/07/owl#>
             PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
             SELECT ?c ?label WHERE { ?c a owl:Class OPTIONAL { ?c rdfs:label ?label } }
             ORDER BY ?c",
        )
        .unwrap();
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert!(row.contains_key("c"));
        assert!(row.contains_key("label"));
    }
    assert_eq!(rows[0]["c"], json!("http://ex.org/Company"));
    assert_eq!(rows[0]["label"], json!("Company"));
    assert_eq!(rows[2]["label"], Value::Null);
}

#[test]
fn ask_and_construct_queries() {
    let g = loaded(SMALL_ONTOLOGY);
    let ask = g.run_query("ASK { <http://ex.org/Acme> ?p ?o }").unwrap();
    assert_eq!(ask[0]["result"], json!(true));

    let graph = g
        .run_query(
            "CONSTRUCT { ?s <http://ex.org/named> ?l }
             WHERE { ?s <http://www.w3.org/2000/01/rdf-schema#label> ?l }",
        )
        .unwrap();
    assert_eq!(graph.len(), 4);
    assert!(graph[0].contains_key("subject"));
}

#[test]
fn typed_literals_become_native_scalars() {
    let g = loaded(WITH_PROPERTIES);
    let rows = g
        .run_query("SELECT ?y WHERE { <http://ex.org/Acme> <http://ex.org/founded> ?y }")
        .unwrap();
    assert_eq!(rows[0]["y"], json!(1999));
}

// ===========================================================================
// Mutation
// ===========================================================================

#[test]
fn add_triple_literal_and_iri() {
    let mut g = loaded(SMALL_ONTOLOGY);
    assert!(g.add_triple(
        "http://ex.org/Acme",
        skos::ALT_LABEL.as_str(),
        "Acme Corp",
        true
    ));
    assert!(g.add_triple(
        "http://ex.org/Acme",
        "http://ex.org/employs",
        "http://ex.org/Alice",
        false
    ));
    assert_eq!(g.summary().triples, 12);
    let rows = g
        .run_query("SELECT ?l WHERE { <http://ex.org/Acme> <http://www.w3.org/2004/02/skos/core#altLabel> ?l }")
        .unwrap();
    assert_eq!(rows[0]["l"], json!("Acme Corp"));
}

#[test]
fn add_triple_rejects_malformed_iris() {
    let mut g = loaded(SMALL_ONTOLOGY);
    assert!(!g.add_triple("Acme", "http://ex.org/p", "x", true));
    assert!(!g.add_triple("http://ex.org/Acme", "http://ex.org/p", "not an iri", false));
    assert!(matches!(
        g.try_add_triple("http://ex.org/A", "bad predicate", "x", true),
        Err(GraphError::InvalidIri { .. })
    ));
    assert_eq!(g.summary().triples, 10);
}

#[test]
fn add_triple_needs_a_graph() {
    let mut g = GraphStore::new();
    assert!(matches!(
        g.try_add_triple("http://ex.org/A", "http://ex.org/p", "x", true),
        Err(GraphError::NotLoaded)
    ));
}
