//! Graph store errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("no ontology loaded")]
    NotLoaded,

    #[error("unsupported ontology format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("invalid IRI '{iri}': {reason}")]
    InvalidIri { iri: String, reason: String },
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

impl GraphError {
    pub fn invalid_iri(iri: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidIri {
            iri: iri.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<oxigraph::store::StorageError> for GraphError {
    fn from(e: oxigraph::store::StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<oxigraph::sparql::EvaluationError> for GraphError {
    fn from(e: oxigraph::sparql::EvaluationError) -> Self {
        Self::Query(e.to_string())
    }
}
