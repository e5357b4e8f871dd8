use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration problems, raised before any request is issued.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Incorrect environment variable 'APP_ENV_STATE': {0}.")]
    InvalidEnvState(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Unable to read dotenv file {}: {source}", path.display())]
    Dotenv {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[error("Unable to load settings: {0}")]
    Extract(#[from] figment::Error),
}

/// A record did not satisfy its schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("ValidationError occurred while trying to initialize {schema}. Found the following errors: {errors}.")]
    Validation {
        schema: &'static str,
        errors: serde_json::Value,
    },

    #[error("TypeError occurred while trying to initialize {schema}. Received the following record argument: {found}; {record}.")]
    Type {
        schema: &'static str,
        found: &'static str,
        record: String,
    },
}

impl SchemaError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Type { .. } => "TypeError",
        }
    }

    pub fn schema(&self) -> &'static str {
        match self {
            Self::Validation { schema, .. } | Self::Type { schema, .. } => schema,
        }
    }
}

/// Why a single request counted as a failure.
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("Request could not be completed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Response(String),
}

/// The load test could not be started.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("No task matches the tag filter {0:?}")]
    NoMatchingTask(Vec<String>),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid endpoint URL: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Unable to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
