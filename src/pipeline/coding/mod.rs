pub mod types;
pub mod prompt;
pub mod schema;
pub mod options;
pub mod request;
pub mod parser;
pub mod grounding;
pub mod normalize;
pub mod openai;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use schema::*;
pub use options::*;
pub use request::*;
pub use parser::*;
pub use grounding::*;
pub use normalize::*;
pub use openai::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodingError {
    #[error("Clinical note must not be empty.")]
    EmptyNote,

    #[error("No LLM model configured. Set LLM_CODING_MODEL or provide model_name.")]
    NoModelConfigured,

    #[error("Invalid ICD version. Must be 9 or 10.")]
    InvalidIcdVersion(String),

    #[error("Invalid structured output schema: {0}")]
    Schema(String),

    #[error("LLM provider is not reachable at {0}")]
    ProviderConnection(String),

    #[error("LLM provider returned error (status {status}): {body}")]
    ProviderError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("LLM response was not valid JSON.")]
    InvalidJson,

    #[error("LLM response had unexpected structure.")]
    UnexpectedStructure,
}

/// Failure classes a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse; never retried.
    InvalidInput,
    /// Malformed structured-output schema (a configuration defect).
    Schema,
    /// Provider transport failure or an unusable reply.
    Generation,
}

impl CodingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodingError::EmptyNote
            | CodingError::NoModelConfigured
            | CodingError::InvalidIcdVersion(_) => ErrorKind::InvalidInput,
            CodingError::Schema(_) => ErrorKind::Schema,
            CodingError::ProviderConnection(_)
            | CodingError::ProviderError { .. }
            | CodingError::HttpClient(_)
            | CodingError::ResponseParsing(_)
            | CodingError::InvalidJson
            | CodingError::UnexpectedStructure => ErrorKind::Generation,
        }
    }
}
