//! Error taxonomy for the booking core.
//!
//! Authentication failures abort the whole run; everything after the
//! market-open instant is per-slot and isolated. Logout failures are
//! logged at the call site and never surface as errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The portal never showed its logged-in identity element after
    /// submission. Nothing can proceed without a session.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// Cookie export was attempted on a session that never logged in or
    /// has been logged out.
    #[error("not logged in; session cookies are unavailable")]
    NotLoggedIn,

    /// Browser driver failure underneath the login flow.
    #[error(transparent)]
    Cdp(#[from] cdp::CdpError),
}

/// Per-slot failure during dispatch; never aborts sibling slots.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("booking request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body matched neither the success nor the failure
    /// marker. The body format is opaque; nothing further is parsed.
    #[error("unrecognized booking response: {snippet}")]
    UnrecognizedResponse { snippet: String },
}
