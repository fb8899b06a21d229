//! Top-level server error type.

use holdout_protocol::ProtocolError;

/// Everything that can go wrong running the server.
///
/// The `#[from]` variants let `?` convert lower-level errors
/// automatically; per-connection failures (a client sending garbage, a
/// socket dropping mid-frame) are handled inline and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind the listener.
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    /// Failed to accept an incoming TCP connection.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// An encode/decode failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let server_err: ServerError = err.into();
        assert!(matches!(server_err, ServerError::Protocol(_)));
        assert!(server_err.to_string().contains("bad"));
    }
}
