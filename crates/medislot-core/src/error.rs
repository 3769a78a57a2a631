//! Error types for the medislot engine.
//!
//! Every fatal condition carries its own variant so callers (the CLI in
//! particular) can map each failure class to a distinct exit status. The
//! single recoverable condition -- an empty result with keep-going
//! enabled -- is not an error at all and never appears here.

use chrono::NaiveDateTime;
use std::path::PathBuf;
use thiserror::Error;

/// Umbrella error for a medislot run.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Login or token refresh rejected by the provider.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// A filter name could not be matched to a provider id.
    #[error("filter resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// The underlying provider call failed at the HTTP level or returned
    /// an unusable payload. Not retried.
    #[error("provider error: {0}")]
    Transport(#[from] TransportError),

    /// Booking attempt failed.
    #[error("booking error: {0}")]
    Booking(#[from] BookingError),

    /// Configuration file problems.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The search window was fully walked, nothing matched and retries
    /// are disabled.
    #[error("no visits found")]
    Exhausted,

    /// The effective window start (after applying the lead-time margin)
    /// is already past the window end.
    #[error("search window already closed: starts {start}, ends {end}")]
    WindowClosed {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("login rejected: {0}")]
    LoginRejected(String),

    /// The refresh token was rejected (expired or revoked). Fatal; there
    /// is no silent re-login.
    #[error("token refresh rejected: {0}")]
    RefreshRejected(String),

    #[error("not authenticated")]
    NotAuthenticated,
}

#[derive(Error, Debug)]
pub enum ResolutionError {
    /// No candidate cleared the similarity threshold. Carries the full
    /// candidate list so the operator can correct their input.
    #[error("no {category} matches \"{input}\"; known values: {}", candidates.join(", "))]
    NoMatch {
        category: &'static str,
        input: String,
        candidates: Vec<String>,
    },

    /// The provider offered no candidates at all for this category in
    /// the current context.
    #[error("provider offers no {category} choices in this context")]
    EmptyCandidates { category: &'static str },
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a payload outside the documented
    /// shape; failing loudly beats propagating untyped data.
    #[error("unexpected response shape from {endpoint}: {detail}")]
    UnexpectedShape {
        endpoint: &'static str,
        detail: String,
    },
}

#[derive(Error, Debug)]
pub enum BookingError {
    /// The slot collides with existing appointments and rescheduling was
    /// not allowed.
    #[error("slot collides with {existing} existing appointment(s); rerun with rescheduling allowed to replace the earliest one")]
    Conflict { existing: usize },

    /// The provider reported an explicit booking/reschedule failure.
    #[error("provider rejected the booking: {0}")]
    Rejected(String),

    /// The reschedule response carried both or neither of its success
    /// and failure markers. Never treated as success.
    #[error("reschedule outcome is indeterminate: success/failure markers disagree")]
    AmbiguousOutcome,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("no username/password given (flags, environment or config file)")]
    MissingCredentials,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
