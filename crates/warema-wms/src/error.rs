use thiserror::Error;

/// Top-level error type for the `warema-wms` crate.
///
/// Covers the full failure taxonomy of the WebControl protocol: transport
/// problems, malformed device responses, missing protocol fields, and
/// retry/poll exhaustion. None of these are fatal -- every operation returns
/// a `Result` so batch operations over many shades can continue past
/// individual failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-2xx HTTP status from the WebControl server.
    #[error("WebControl server returned HTTP {status}")]
    Status { status: u16 },

    // ── Protocol ────────────────────────────────────────────────────
    /// The response body was not the expected XML document, with the raw
    /// body for debugging. The device serves an HTML error page when
    /// commands arrive too quickly.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String, body: String },

    /// An expected response field was absent or not a number.
    ///
    /// Distinct from [`Error::MalformedResponse`]: the document parsed,
    /// but did not carry the field this operation needs.
    #[error("Response field missing or invalid: {0}")]
    MissingField(&'static str),

    // ── Controller ──────────────────────────────────────────────────
    /// A move command never converged: the shade neither reported movement
    /// nor reached the target position within the full retry budget.
    #[error("Shade {room}:{channel} could not be set to target position {target}")]
    ConvergenceTimeout {
        room: String,
        channel: String,
        target: u8,
    },

    /// Target position outside the 0-100 range.
    #[error("Invalid shade position {0} (expected 0-100)")]
    InvalidPosition(u8),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { .. } | Self::MalformedResponse { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the device answered but the payload could not be
    /// decoded (the ParseFailure class of the protocol).
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. } | Self::MissingField(_))
    }
}
