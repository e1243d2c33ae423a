//! Error handling for the hooks system

use thiserror::Error;

/// Result type for hook operations
pub type HookResult<T> = Result<T, HookError>;

/// Hook system error types
#[derive(Debug, Error)]
pub enum HookError {
    /// Hook name not known to the gateway
    #[error("Unknown hook: {0}")]
    UnknownHook(String),

    /// Hook handler not found
    #[error("Hook handler not found: {0}")]
    HandlerNotFound(String),

    /// Event payload did not match the shape expected for its hook
    #[error("Malformed payload for hook '{hook}': {source}")]
    MalformedPayload {
        hook: String,
        #[source]
        source: serde_json::Error,
    },

    /// A host collaborator (config store, log store, mailer) failed
    #[error("{service} failed: {source}")]
    Service {
        service: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be rendered
    #[error("Configuration render error: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Handler registration failed
    #[error("Handler registration failed: {0}")]
    RegistrationFailed(String),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl HookError {
    /// Wrap a collaborator failure
    pub fn service(service: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Service {
            service,
            source: source.into(),
        }
    }

    /// Create a malformed payload error
    pub fn malformed_payload(hook: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedPayload {
            hook: hook.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Create a custom error
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}
