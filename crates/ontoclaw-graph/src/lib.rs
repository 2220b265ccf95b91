//! Ontoclaw Graph - In-memory RDF graph with ontology views and SPARQL

pub mod error;
pub mod store;
pub mod vocab;

pub use error::{GraphError, GraphResult};
pub use store::{GraphStore, OntologyFormat};
