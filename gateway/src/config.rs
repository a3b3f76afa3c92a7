use serde::Deserialize;
use std::fs::File;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("auth: token requires bundle: shared")]
    TokenAuthRequiresSharedBundle,
}

/// Deployment configuration for one gateway instance.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the triggering requests
    pub listener: Listener,
    /// Configuration store endpoint
    pub store: StoreConfig,
    /// Bot core endpoint
    pub core: CoreConfig,
    /// Error-tracking ingestion endpoint
    pub telemetry: TelemetryConfig,
    /// How this deployment drives the core
    pub profile: Profile,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Validates the deployment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.listener.port == 0 {
            return Err(ValidationError::InvalidPort);
        }

        self.profile.validate()
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Base URL of the key/value read API
    ///
    /// Note: Uses the `url::Url` type, so an invalid URL is rejected
    /// during config deserialization.
    pub url: Url,
    /// Bearer token for the read API
    pub api_token: String,
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CoreConfig {
    /// Invocation endpoint of the bot core
    pub url: Url,
    #[serde(default = "default_core_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TelemetryConfig {
    /// Base URL of the error-tracking ingestion service
    pub ingest_url: Url,
    #[serde(default = "default_telemetry_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_store_timeout_secs() -> u64 {
    10
}

fn default_core_timeout_secs() -> u64 {
    30
}

fn default_telemetry_timeout_secs() -> u64 {
    5
}

/// Declarative description of how one deployment variant extracts its
/// payload, authenticates the core call, and renders its response.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Profile {
    /// What the core receives as its payload
    pub payload: PayloadMode,
    /// What the core receives as its second argument
    pub auth: AuthMode,
    /// Which credential bundle shape this deployment resolves
    pub bundle: BundleShape,
    /// How a successful outcome is rendered into the response body
    pub success: SuccessRender,
}

impl Profile {
    fn validate(&self) -> Result<(), ValidationError> {
        // Only the shared bundle carries a bare token to hand over
        if self.auth == AuthMode::Token && self.bundle != BundleShape::Shared {
            return Err(ValidationError::TokenAuthRequiresSharedBundle);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayloadMode {
    FullRequest,
    JsonBody,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Bundle,
    Token,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BundleShape {
    Shared,
    MultiPlatform,
    Webhook,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuccessRender {
    /// Echo the core's result verbatim.
    Echo,
    /// Fixed body regardless of what the core returned.
    Literal(String),
}
