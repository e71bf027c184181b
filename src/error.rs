//! Error types for conduit calls.
//!
//! Every failure in this crate surfaces as a [`ConduitError`]. The four
//! variants map one-to-one onto the failure domains of an RPC round trip:
//!
//! - [`ConduitError::Transport`]: the endpoint could not be reached
//! - [`ConduitError::InvalidResponse`]: the endpoint answered with something
//!   that is not a conduit response (an HTML error page, typically)
//! - [`ConduitError::Conduit`]: the endpoint processed the call and reported
//!   an application-level error
//! - [`ConduitError::Config`]: the client could not be constructed at all
//!
//! Nothing is swallowed or retried inside this crate; every error propagates
//! to the immediate caller, which owns retry policy.

use thiserror::Error;

/// Result type alias for conduit operations.
///
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, ConduitError>;

/// Errors produced while configuring or calling a conduit endpoint.
///
/// # Error Recovery
///
/// - **Transient errors** ([`Transport`](Self::Transport)): the connection
///   failed or timed out; retrying is the caller's decision
/// - **Protocol errors** ([`InvalidResponse`](Self::InvalidResponse)): the
///   endpoint is misbehaving or the URL points at something that is not a
///   conduit API
/// - **Application errors** ([`Conduit`](Self::Conduit)): inspect `code` and
///   `message`; these come straight from the endpoint (or, in mock mode,
///   from the replay script)
/// - **Configuration errors** ([`Config`](Self::Config)): fix credentials or
///   settings and rebuild the client
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum ConduitError {
    /// The endpoint could not be reached.
    ///
    /// Wraps the underlying [`reqwest::Error`], which carries the transport
    /// error detail (connection refused, DNS failure, per-call timeout
    /// exceeded, TLS trouble).
    #[error("conduit request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not a valid conduit JSON response.
    ///
    /// Conduit endpoints always answer with a JSON object carrying
    /// `error_code`, `error_info` and `result`. Anything else — an HTML
    /// error page from a proxy, a truncated body — lands here. This variant
    /// carries no endpoint-supplied code; the condition itself is the
    /// sentinel.
    #[error("did not receive a valid JSON response")]
    InvalidResponse,

    /// The endpoint returned an application-level error.
    ///
    /// `code` and `message` are taken verbatim from the response's
    /// `error_code` and `error_info` fields. In mock mode a replay-script
    /// mismatch or exhaustion also lands here, with `code` set to `None`.
    #[error("conduit returned an error: {message}")]
    Conduit {
        /// Endpoint-supplied error code, e.g. `"ERR-CONDUIT-CALL"`.
        /// `None` for mock replay mismatches and exhaustion.
        code: Option<String>,
        /// Endpoint-supplied human-readable error description.
        message: String,
    },

    /// The client could not be configured.
    ///
    /// Covers missing or unreadable credentials, malformed settings and an
    /// unloadable mock script. These errors occur before any call is made.
    #[error("conduit configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_response_display() {
        let error = ConduitError::InvalidResponse;
        assert_eq!(error.to_string(), "did not receive a valid JSON response");
    }

    #[test]
    fn test_conduit_error_display() {
        let error = ConduitError::Conduit {
            code: Some("ERR-CONDUIT-CALL".to_owned()),
            message: "method does not exist".to_owned(),
        };
        assert_eq!(error.to_string(), "conduit returned an error: method does not exist");
    }

    #[test]
    fn test_config_error_display() {
        let error = ConduitError::Config("no hosts configured".to_owned());
        assert!(error.to_string().contains("configuration error"));
        assert!(error.to_string().contains("no hosts configured"));
    }
}
