//! Run orchestration: authenticate, resolve filters, poll the paginated
//! search until something matches, then optionally book.

use std::time::Duration;

use chrono::Local;

use crate::auth::TokenManager;
use crate::booking::{BookingReport, BookingTransaction};
use crate::error::{CoreError, Result};
use crate::filters::FilterResolver;
use crate::model::{SearchCriteria, Visit};
use crate::provider::ProviderClient;
use crate::results::ResultSet;
use crate::retry::{RetryPolicy, RetryScheduler};
use crate::search::collect_visits;

/// Everything one run needs beyond credentials.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub criteria: SearchCriteria,
    /// Book the earliest matching visit automatically.
    pub autobook: bool,
    /// Allow cancelling a colliding appointment to claim the new slot.
    pub allow_reschedule: bool,
    pub retry: RetryPolicy,
}

/// Progress notifications, for the CLI's stderr commentary.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    LoggedIn,
    /// Criteria resolved into this many independent search combinations.
    Resolved { searches: usize },
    /// An attempt came back empty; sleeping before the next one.
    EmptyAttempt { attempt: u32, sleep: Duration },
    Found { unique: usize },
    Booked(BookingReport),
}

/// Final outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    /// Deduplicated visits, ascending by (date, specialty, doctor, clinic).
    pub visits: Vec<Visit>,
    /// Search attempts performed (>= 1).
    pub attempts: u32,
    pub booking: Option<BookingReport>,
}

/// The discovery/booking engine. Owns the credential and the filter
/// cache; both live exactly as long as one engine instance.
pub struct Engine {
    token: TokenManager,
    resolver: FilterResolver,
}

impl Engine {
    pub fn new(provider: ProviderClient) -> Self {
        Self {
            token: TokenManager::new(provider),
            resolver: FilterResolver::new(),
        }
    }

    /// Run the full control flow. Blocking from the caller's point of
    /// view; the only internal suspension is the retry sleep, so the
    /// caller can race this future against a cancellation signal.
    pub async fn run(
        &mut self,
        username: &str,
        password: &str,
        options: &RunOptions,
        mut on_event: impl FnMut(EngineEvent),
    ) -> Result<RunReport> {
        self.token.login(username, password).await?;
        on_event(EngineEvent::LoggedIn);

        let mut scheduler = RetryScheduler::new(options.retry);
        let criteria = &options.criteria;

        loop {
            let attempt = scheduler.begin_attempt();

            let now = Local::now().naive_local();
            let start = criteria.after.max(now + criteria.margin);
            let end = criteria.before;
            if start >= end {
                return Err(CoreError::WindowClosed { start, end });
            }

            // Re-resolved every attempt; the context cache makes repeat
            // resolutions free unless the provider offering changed.
            let resolved = self.resolver.resolve(&mut self.token, criteria).await?;
            if attempt == 1 {
                on_event(EngineEvent::Resolved {
                    searches: resolved.len(),
                });
            }

            let mut raw = Vec::new();
            for combination in &resolved {
                raw.extend(collect_visits(&mut self.token, combination, start, end).await?);
            }

            let results = ResultSet::build(
                raw,
                start,
                end,
                criteria.time_of_day.as_ref(),
                criteria.include_remote,
            );

            if let Some(earliest) = results.earliest() {
                on_event(EngineEvent::Found {
                    unique: results.unique().len(),
                });

                let booking = if options.autobook {
                    let report = BookingTransaction::new(options.allow_reschedule)
                        .book(&mut self.token, earliest)
                        .await?;
                    on_event(EngineEvent::Booked(report.clone()));
                    Some(report)
                } else {
                    None
                };

                return Ok(RunReport {
                    visits: results.unique().to_vec(),
                    attempts: attempt,
                    booking,
                });
            }

            let sleep = scheduler.on_empty()?;
            on_event(EngineEvent::EmptyAttempt { attempt, sleep });
            scheduler.wait(sleep, &mut self.token).await?;
        }
    }
}
