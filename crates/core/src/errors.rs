use std::path::PathBuf;

/// Result type alias for pageconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pageconf operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Contract violations by the application author. Always names the
    /// offending declaration file; file-path errors carry a corrective hint.
    #[error("{}", format_usage_error(.file, .message, .hint))]
    Usage {
        file: String,
        message: String,
        hint: Option<String>,
    },

    /// States the engine believes are unreachable if its own invariants hold.
    /// Never triggered by user input alone; a defect signal.
    #[error("internal invariant violated: {message}")]
    Invariant { message: String },

    /// Failures while executing a declaration file to obtain its exports
    #[error("failed to load declaration file '{path}': {message}")]
    ModuleLoad {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration errors not tied to a specific declaration file
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

fn format_usage_error(file: &str, message: &str, hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!("{file} {message} ({hint})"),
        None => format!("{file} {message}"),
    }
}

// Conversion implementations
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Configuration {
            message: format!("An internal error occurred: {error}"),
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a usage error naming the offending declaration file
    #[must_use]
    pub fn usage(file: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Usage {
            file: file.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Create a usage error with a corrective hint
    #[must_use]
    pub fn usage_with_hint(
        file: impl Into<String>,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Error::Usage {
            file: file.into(),
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// Create an internal invariant error
    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Error::Invariant {
            message: message.into(),
        }
    }

    /// Create a module load error
    #[must_use]
    pub fn module_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::ModuleLoad {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a module load error with a source error
    #[must_use]
    pub fn module_load_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::ModuleLoad {
            path: path.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error is an author mistake rather than an engine defect.
    /// Callers use this to decide between reporting and crashing.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage { .. })
    }
}

// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a lazy message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Configuration {
                message: format!("{}: {}", message.into(), base_error),
            }
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Configuration {
                message: format!("{}: {}", f(), base_error),
            }
        })
    }
}
