use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypeInfoError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error("Invalid class file: {message}")]
    ClassFormatError { message: String },

    #[error("Unsupported constant pool tag {tag} at entry {index}")]
    UnsupportedConstantPoolTag { tag: u8, index: usize },

    #[error("Invalid signature '{signature}' at offset {offset}: {message}")]
    SignatureError {
        signature: String,
        offset: usize,
        message: String,
    },

    #[error("Cache format error: {message}")]
    CacheFormatError { message: String },

    #[error("Java source error at byte {position}: {message}")]
    SourceParseError { position: usize, message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

impl TypeInfoError {
    pub fn class_format(message: impl Into<String>) -> Self {
        Self::ClassFormatError {
            message: message.into(),
        }
    }

    pub fn cache_format(message: impl Into<String>) -> Self {
        Self::CacheFormatError {
            message: message.into(),
        }
    }

    pub fn source_parse(position: usize, message: impl Into<String>) -> Self {
        Self::SourceParseError {
            position,
            message: message.into(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ZipError(_) => "The archive could not be read".to_string(),
            Self::IoError(e) => format!("File access failed: {}", e),
            Self::ClassFormatError { .. } | Self::UnsupportedConstantPoolTag { .. } => {
                format!("A class file could not be decoded ({})", self)
            }
            Self::SignatureError { signature, .. } => {
                format!("The generic signature '{}' is malformed", signature)
            }
            Self::SerializationError(_) | Self::CacheFormatError { .. } => {
                "The type cache is not in the expected format".to_string()
            }
            Self::SourceParseError { .. } => format!("A Java source file could not be read ({})", self),
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => format!("Configuration problem: {}", self),
            Self::TaskError(_) => "An internal decoding task failed".to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ZipError(_) => "Check that the jar, aar or cache zip is complete and not corrupted",
            Self::IoError(_) => "Check that the path exists and is readable",
            Self::ClassFormatError { .. } | Self::UnsupportedConstantPoolTag { .. } => {
                "Make sure the input is a compiled .class file"
            }
            Self::SignatureError { .. } => "Check the signature against the JVM signature grammar",
            Self::SerializationError(_) | Self::CacheFormatError { .. } => {
                "Rebuild the cache with the build-cache command"
            }
            Self::SourceParseError { .. } => "Check the sources folder matches the library version",
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Review the command line options and the TOML config file",
            Self::TaskError(_) => "Retry the command with --verbose to see more detail",
        }
    }
}

pub type Result<T> = std::result::Result<T, TypeInfoError>;
