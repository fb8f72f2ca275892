use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Parse error in {location}: {message}")]
    ParseError { location: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Mapper failed on record {index}: {message}")]
    MapperError { index: usize, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Data,
    System,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn parse(location: impl Into<String>, message: impl ToString) -> Self {
        EtlError::ParseError {
            location: location.into(),
            message: message.to_string(),
        }
    }

    pub fn mapper(index: usize, message: impl ToString) -> Self {
        EtlError::MapperError {
            index,
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        EtlError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::FileNotFound { .. } => ErrorCategory::Input,
            EtlError::ParseError { .. }
            | EtlError::MapperError { .. }
            | EtlError::SerializationError(_) => ErrorCategory::Data,
            EtlError::IoError(_) => ErrorCategory::System,
            EtlError::ConfigError { .. } | EtlError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
        }
    }

    /// Every variant aborts the run; severity only decides the process exit code.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::FileNotFound { path } => {
                format!("Check that '{}' exists or pass --source / --base-dir", path)
            }
            EtlError::ParseError { .. } => {
                "Make sure the source is valid JSON; per-chunk mode also needs every chunk to be a complete value (try --mode incremental)".to_string()
            }
            EtlError::IoError(_) => "Check file permissions and free disk space".to_string(),
            EtlError::MapperError { .. } => {
                "Make sure every record is a JSON object with the selected fields".to_string()
            }
            EtlError::SerializationError(_) => "The mapped record could not be encoded as JSON".to_string(),
            EtlError::ConfigError { .. } | EtlError::InvalidConfigValueError { .. } => {
                "Review the command line flags or the TOML configuration file".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::FileNotFound { path } => format!("Source file does not exist: {}", path),
            EtlError::ParseError { location, .. } => format!("Invalid JSON in {}", location),
            EtlError::IoError(e) => format!("File operation failed: {}", e),
            EtlError::MapperError { index, message } => {
                format!("Could not transform record #{}: {}", index, message)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
