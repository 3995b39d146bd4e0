use std::io;

use thiserror::Error;

/// Result type alias for dataplane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by message and invocation transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the pool, the cache client and the transport wrappers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An IO error occurred, including read/write deadlines.
    #[error("IO error: {source}")]
    Io {
        /// The underlying IO error.
        #[from]
        source: io::Error,
    },

    /// The reply was malformed or had an unexpected shape.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the error.
        message: String,
    },

    /// The server rejected the command.
    #[error("server error: {message}")]
    Server {
        /// Error message from server.
        message: String,
    },

    /// Authentication failed.
    #[error("authentication failed")]
    Auth,

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of invalid argument.
        message: String,
    },

    /// Every connection is lent out and the pool is configured not to wait.
    #[error("connection pool exhausted ({max_active} active connections)")]
    PoolExhausted {
        /// The configured maximum of active connections.
        max_active: usize,
    },

    /// The pool has been shut down.
    #[error("connection pool is closed")]
    PoolClosed,

    /// A new connection could not be established.
    #[error("failed to dial {address}: {source}")]
    Dial {
        /// Address that was dialed.
        address: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The pool could not supply a connection for a cache operation.
    #[error("connection unavailable: {source}")]
    ConnectionUnavailable {
        /// Why the pool could not supply one.
        #[source]
        source: Box<Error>,
    },

    /// A reply could not be converted to the requested type.
    #[error("cannot convert {value:?} to {target}")]
    TypeConversion {
        /// Name of the requested type.
        target: &'static str,
        /// Textual form of the offending reply.
        value: String,
    },

    /// The server returned nil where a value was required.
    #[error("nil reply")]
    Nil,

    /// A value could not be serialized before it was sent.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// A message or invocation transport failed.
    #[error("{context}: {source}")]
    Transport {
        /// What was being attempted.
        context: String,
        /// Error reported by the transport.
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Wraps a pool error for the cache client surface.
    pub(crate) fn unavailable(source: Error) -> Self {
        Error::ConnectionUnavailable {
            source: Box::new(source),
        }
    }

    /// Returns true if the connection that produced this error can no longer
    /// be trusted and must not go back to the idle set.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, Error::Io { .. } | Error::Protocol { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let error = Error::Io { source: io_err };
        assert!(error.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_display_server() {
        let error = Error::Server {
            message: "ERR wrong type".to_string(),
        };
        assert_eq!(error.to_string(), "server error: ERR wrong type");
    }

    #[test]
    fn test_error_display_pool_exhausted() {
        let error = Error::PoolExhausted { max_active: 4 };
        assert_eq!(
            error.to_string(),
            "connection pool exhausted (4 active connections)"
        );
    }

    #[test]
    fn test_error_display_type_conversion() {
        let error = Error::TypeConversion {
            target: "i64",
            value: "abc".to_string(),
        };
        assert_eq!(error.to_string(), "cannot convert \"abc\" to i64");
    }

    #[test]
    fn test_connection_unavailable_keeps_source() {
        let error = Error::unavailable(Error::PoolClosed);
        match error {
            Error::ConnectionUnavailable { source } => {
                assert!(matches!(*source, Error::PoolClosed));
            }
            _ => panic!("Expected ConnectionUnavailable error"),
        }
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<u32>("x").unwrap_err();
        let error: Error = serde_err.into();
        assert!(matches!(error, Error::Serialization { .. }));
    }

    #[test]
    fn test_connection_fatal() {
        let io_err = io::Error::new(io::ErrorKind::TimedOut, "read deadline");
        assert!(Error::from(io_err).is_connection_fatal());
        assert!(Error::Protocol {
            message: "bad".to_string()
        }
        .is_connection_fatal());
        assert!(!Error::Server {
            message: "ERR".to_string()
        }
        .is_connection_fatal());
        assert!(!Error::Nil.is_connection_fatal());
    }
}
