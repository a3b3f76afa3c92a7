use crate::bot::CoreError;
use crate::store::StoreError;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Errors that can end a request in a failure outcome.
///
/// Everything here is caught at the dispatcher boundary and turned into
/// a 500 response; nothing propagates past the service.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Required configuration key is missing or empty: {0}")]
    MissingKey(&'static str),

    #[error("Configuration key {key} holds malformed JSON: {detail}")]
    MalformedKey { key: &'static str, detail: String },

    #[error("Configuration store read failed: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to read request body: {0}")]
    RequestBody(String),

    #[error("Request body is not valid JSON: {0}")]
    RequestJson(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl GatewayError {
    /// JSON rendering for the diagnostic event's `message` field.
    ///
    /// Structured rejections from the bot core keep their original JSON
    /// shape; every other error becomes a JSON string of its display
    /// text.
    pub fn event_message(&self) -> String {
        match self {
            GatewayError::Core(CoreError::Rejected(value)) => value.to_string(),
            other => serde_json::Value::String(other.to_string()).to_string(),
        }
    }
}
