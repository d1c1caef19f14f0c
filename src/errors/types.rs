//! # Error Types
//!
//! Error taxonomy for a reconciliation pass using `thiserror`.

/// Custom result type for secret-seeder operations
pub type Result<T> = std::result::Result<T, SeederError>;

/// Main error type for the secret seeder
#[derive(thiserror::Error, Debug)]
pub enum SeederError {
    /// Neither explicit overrides nor the master secret yielded host and port
    #[error("Database coordinates unavailable: {message}")]
    MissingDbCoordinates { message: String },

    /// A bundle's flag is enabled but one of its inputs is absent
    #[error("Missing required input '{input}' for bundle {bundle}")]
    MissingRequiredInput { bundle: String, input: String },

    /// A secret that must already exist is absent from the store
    #[error("Secret {name} not found")]
    SecretNotFound { name: String },

    /// The secret store is unreachable or returned something other than not-found
    #[error("Secret store unavailable during {operation}: {message}")]
    StoreUnavailable { operation: String, message: String },

    /// The operating system random source failed
    #[error("Secure random source failed: {message}")]
    EntropyFailure { message: String },

    /// Key material could not be encoded
    #[error("Key encoding failed: {message}")]
    Crypto { message: String },

    /// The invocation payload is malformed
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fatal error tagged with the step or bundle that raised it
    #[error("{step}: {source}")]
    Reconcile {
        step: String,
        #[source]
        source: Box<SeederError>,
    },
}

impl SeederError {
    /// Create a missing database coordinates error
    pub fn missing_db_coordinates<S: Into<String>>(message: S) -> Self {
        Self::MissingDbCoordinates { message: message.into() }
    }

    /// Create a missing required input error
    pub fn missing_input<B: Into<String>, I: Into<String>>(bundle: B, input: I) -> Self {
        Self::MissingRequiredInput { bundle: bundle.into(), input: input.into() }
    }

    /// Create a store unavailable error
    pub fn store_unavailable<O: Into<String>, M: Into<String>>(operation: O, message: M) -> Self {
        Self::StoreUnavailable { operation: operation.into(), message: message.into() }
    }

    /// Create a secret not found error
    pub fn secret_not_found<S: Into<String>>(name: S) -> Self {
        Self::SecretNotFound { name: name.into() }
    }

    /// Create an entropy failure error
    pub fn entropy<S: Into<String>>(message: S) -> Self {
        Self::EntropyFailure { message: message.into() }
    }

    /// Create a key encoding error
    pub fn crypto<S: Into<String>>(message: S) -> Self {
        Self::Crypto { message: message.into() }
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    /// Create a serialization error with source
    pub fn serialization<S, E>(context: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization { context: context.into(), source: Box::new(source) }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Tag this error with the step that failed. Already-tagged errors keep
    /// their innermost step.
    pub fn in_step<S: Into<String>>(self, step: S) -> Self {
        match self {
            tagged @ Self::Reconcile { .. } => tagged,
            other => Self::Reconcile { step: step.into(), source: Box::new(other) },
        }
    }

    /// The step name attached by [`SeederError::in_step`], if any
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::Reconcile { step, .. } => Some(step),
            _ => None,
        }
    }

    /// The underlying error with any step tagging removed
    pub fn root(&self) -> &SeederError {
        match self {
            Self::Reconcile { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for SeederError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization("JSON serialization failed", error)
    }
}

impl From<validator::ValidationErrors> for SeederError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::config(format!("Validation failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SeederError::missing_input("wts-g3auto", "hostname");
        assert_eq!(
            error.to_string(),
            "Missing required input 'hostname' for bundle wts-g3auto"
        );

        let error = SeederError::store_unavailable("describe_secret", "connection reset");
        assert!(error.to_string().contains("describe_secret"));

        let error = SeederError::secret_not_found("omix3-test-master-db");
        assert_eq!(error.to_string(), "Secret omix3-test-master-db not found");
    }

    #[test]
    fn test_in_step_wraps_once() {
        let error = SeederError::missing_db_coordinates("no host")
            .in_step("ResolvingDbCoordinates")
            .in_step("outer");

        assert_eq!(error.step(), Some("ResolvingDbCoordinates"));
        assert!(matches!(error.root(), SeederError::MissingDbCoordinates { .. }));
        assert!(error.to_string().starts_with("ResolvingDbCoordinates: "));
    }

    #[test]
    fn test_error_conversions() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: SeederError = json_error.into();
        assert!(matches!(error, SeederError::Serialization { .. }));

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: SeederError = io_error.into();
        assert!(matches!(error, SeederError::Io(_)));
        assert!(error.step().is_none());
    }
}
