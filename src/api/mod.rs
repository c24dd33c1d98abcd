//! GraphQL access to the orchestration server.
//!
//! [`client::GraphQlClient`] handles transport, [`parser`] turns response
//! payloads into domain types, [`queries`] holds the documents.

pub mod client;
pub mod parser;
pub mod queries;

pub use client::GraphQlClient;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Network failure or non-2xx HTTP status.
    #[error("{0}")]
    Transport(String),
    /// Top-level `errors` array in the GraphQL response.
    #[error("GraphQL error: {}", .0.join("; "))]
    GraphQl(Vec<String>),
    #[error("Unexpected response: {0}")]
    Decode(String),
    /// A typed error result (`PythonError`, `RunNotFoundError`, ...).
    #[error("{typename}: {message}")]
    UnexpectedType { typename: String, message: String },
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}
