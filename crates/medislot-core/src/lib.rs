//! # medislot core library
//!
//! Discovery and booking engine for a remote medical scheduling service
//! that exposes an authenticated, paginated slot-search API. The CLI
//! binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **TokenManager**: owns the run's credential, refreshes it before
//!   expiry and hands bearer tokens to every other component
//! - **FilterResolver**: staged fuzzy resolution of human-entered
//!   region/specialty/doctor/clinic names to provider ids, with a
//!   context-keyed cache
//! - **SearchCursor**: cursor-advancing paginated walk over the search
//!   window, finite even without provider continuation tokens
//! - **ResultSet**: range/remote/time-of-day filtering, deduplication
//!   and deterministic ordering
//! - **RetryScheduler**: sleep-and-retry polling with jitter and
//!   credential keep-alive during long waits
//! - **BookingTransaction**: at-most-once booking with collision
//!   detection and optional reschedule
//!
//! [`Engine`] wires these together into one run.

pub mod auth;
pub mod booking;
pub mod config;
pub mod engine;
pub mod error;
pub mod filters;
pub mod model;
pub mod provider;
pub mod results;
pub mod retry;
pub mod search;

pub use auth::{Credential, TokenManager};
pub use booking::{BookingReport, BookingTransaction, ExistingAppointment};
pub use config::Config;
pub use engine::{Engine, EngineEvent, RunOptions, RunReport};
pub use error::{
    AuthError, BookingError, ConfigError, CoreError, ResolutionError, Result, TransportError,
};
pub use filters::{FilterCache, FilterContext, FilterResolver, ResolvedCriteria};
pub use model::{SearchCriteria, TimeRange, Visit, VisitKey};
pub use provider::ProviderClient;
pub use results::ResultSet;
pub use retry::{RetryPolicy, RetryScheduler};
pub use search::SearchCursor;
