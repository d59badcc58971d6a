//! Unified error type for the spriteforge application.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

use crate::ids::IdError;

/// Unified error type covering all failure modes in spriteforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "episode", "stream").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg) or the transcoding engine returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Producing a sprite failed. The proximate cause is kept as `source`.
    #[error("Sprite generation failed for stream {stream_id}: {source}")]
    Generation {
        /// Stream whose sprite could not be produced.
        stream_id: String,
        /// What went wrong (tool failure, I/O, timeout, bad output).
        source: Box<Error>,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Tool { .. } => 502,
            Error::Generation { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Wrap `cause` as a [`Error::Generation`] for `stream_id`.
    ///
    /// An error that already is a generation failure is returned unchanged.
    pub fn generation(stream_id: impl fmt::Display, cause: Error) -> Self {
        match cause {
            e @ Error::Generation { .. } => e,
            other => Error::Generation {
                stream_id: stream_id.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Whether this error means the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Opaque sources (I/O and database errors) are cloned by kind and message.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::NotFound { entity, id } => Error::NotFound {
                entity: entity.clone(),
                id: id.clone(),
            },
            Error::Validation(msg) => Error::Validation(msg.clone()),
            Error::Database { source } => Error::database(source.to_string()),
            Error::Io { source } => Error::Io {
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            Error::Tool { tool, message } => Error::tool(tool.clone(), message.clone()),
            Error::Generation { stream_id, source } => Error::Generation {
                stream_id: stream_id.clone(),
                source: source.clone(),
            },
            Error::Internal(msg) => Error::Internal(msg.clone()),
        }
    }
}

impl From<IdError> for Error {
    fn from(e: IdError) -> Self {
        Error::Validation(format!("invalid identifier: {e}"))
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("episode", "abc-123");
        assert_eq!(err.to_string(), "episode not found: abc-123");
        assert_eq!(err.http_status(), 404);
        assert!(err.is_not_found());
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("name is required".into());
        assert_eq!(err.to_string(), "Validation error: name is required");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn database_display() {
        let err = Error::database("connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn generation_keeps_cause() {
        let err = Error::generation("s1", Error::tool("ffmpeg", "exit code 1"));
        assert_eq!(
            err.to_string(),
            "Sprite generation failed for stream s1: Tool error [ffmpeg]: exit code 1"
        );
        assert_eq!(err.http_status(), 500);
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "Tool error [ffmpeg]: exit code 1");
        assert!(!err.is_not_found());
    }

    #[test]
    fn generation_does_not_nest() {
        let inner = Error::generation("s1", Error::Internal("boom".into()));
        let outer = Error::generation("s1", inner);
        match outer {
            Error::Generation { source, .. } => {
                assert!(matches!(*source, Error::Internal(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clone_preserves_variant_and_message() {
        let io = Error::generation(
            "s1",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into(),
        );
        let copy = io.clone();
        assert_eq!(copy.to_string(), io.to_string());
        match copy {
            Error::Generation { source, .. } => match *source {
                Error::Io { source } => {
                    assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied)
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }

        let db = Error::database("locked");
        assert_eq!(db.clone().to_string(), db.to_string());
    }

    #[test]
    fn id_error_is_validation() {
        let err = Error::from(IdError::Empty);
        assert_eq!(err.http_status(), 400);
        assert!(err.to_string().contains("identifier is empty"));
    }

    #[test]
    fn internal_display() {
        let err = Error::Internal("unexpected state".into());
        assert_eq!(err.to_string(), "Internal error: unexpected state");
        assert_eq!(err.http_status(), 500);
    }
}
