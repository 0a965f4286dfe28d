use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for workspace bookkeeping.
///
/// Each variant carries the path or configuration value that caused it so the
/// command line can tell the user exactly which directory or setting is wrong.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A collection directory does not exist. Callers that aggregate progress
    /// treat this as an empty collection rather than a failure.
    #[error("Directory does not exist: {path:?}")]
    MissingDirectory { path: PathBuf },

    #[error("Workspace not found: {path:?}")]
    WorkspaceMissing { path: PathBuf },

    #[error("No images found in {path:?}")]
    NoImagesFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    InvalidConfiguration { message: String },

    #[error("Filename collision in {location}: base name `{base_name}` is shared by {file_names:?}")]
    FilenameCollision {
        location: String,
        base_name: String,
        file_names: Vec<String>,
    },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error for {path:?}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path:?})")]
    ImageProcessing {
        path: PathBuf,
        operation: String,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path and the step that was being attempted.
    pub fn file_system(path: impl Into<PathBuf>, operation: &str, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            operation: operation.to_string(),
            source,
        }
    }

    /// Process exit code reported by the command line for this error.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::WorkspaceMissing { .. } => 2,
            Self::NoImagesFound { .. } => 3,
            Self::InvalidConfiguration { .. } => 4,
            _ => 1,
        }
    }
}

/// Convert I/O errors without call-site context.
///
/// Code that knows the path and the step should build `FileSystem` through
/// [`LedgerError::file_system`] instead.
impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let missing = LedgerError::WorkspaceMissing {
            path: PathBuf::from("ws"),
        };
        let empty = LedgerError::NoImagesFound {
            path: PathBuf::from("raw"),
        };
        let config = LedgerError::invalid_configuration("no contributors");
        let io = LedgerError::file_system(
            "x",
            "copy",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        assert_eq!(missing.exit_code(), 2);
        assert_eq!(empty.exit_code(), 3);
        assert_eq!(config.exit_code(), 4);
        assert_eq!(io.exit_code(), 1);
    }

    #[test]
    fn test_collision_message_names_files() {
        let err = LedgerError::FilenameCollision {
            location: "raw_images".to_string(),
            base_name: "img_001".to_string(),
            file_names: vec!["img_001.jpg".to_string(), "img_001.png".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("img_001.jpg"));
        assert!(message.contains("raw_images"));
    }
}
