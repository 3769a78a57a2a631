//! Cursor-advancing paginated search over a time window.
//!
//! One cursor per resolved criteria. Pages are fetched in strictly
//! increasing cursor order; the walk is guaranteed finite even when the
//! provider never supplies an explicit continuation token.

use chrono::{Datelike, Duration, NaiveDateTime};

use crate::auth::TokenManager;
use crate::error::{Result, TransportError};
use crate::filters::ResolvedCriteria;
use crate::model::{format_datetime, parse_datetime, Visit};
use crate::provider::{RawVisit, SearchPayload};

/// Cursor dates before this year are the legacy "no further
/// availability" sentinel some provider builds answer with instead of
/// an empty page.
const SENTINEL_CUTOFF_YEAR: i32 = 1971;

/// Advancing position of one open-ended paginated search.
#[derive(Debug, Clone)]
pub struct SearchCursor {
    since: NaiveDateTime,
    boundary: NaiveDateTime,
}

impl SearchCursor {
    pub fn new(start: NaiveDateTime, boundary: NaiveDateTime) -> Self {
        Self {
            since: start,
            boundary,
        }
    }

    pub fn since(&self) -> NaiveDateTime {
        self.since
    }

    /// Move past a non-empty page. Returns false when the search is
    /// done: the next position would leave the window, the provider
    /// signalled end-of-availability, or the cursor failed to advance.
    pub fn advance(
        &mut self,
        page_max_date: NaiveDateTime,
        provider_next: Option<NaiveDateTime>,
    ) -> bool {
        match next_since(self.since, page_max_date, provider_next) {
            Some(next) if next <= self.boundary => {
                self.since = next;
                true
            }
            _ => false,
        }
    }
}

/// Next query position after a page, or `None` when the walk ends.
/// Prefers the provider-supplied continuation date; otherwise falls back
/// to the day after the latest appointment seen in the page.
pub fn next_since(
    current: NaiveDateTime,
    page_max_date: NaiveDateTime,
    provider_next: Option<NaiveDateTime>,
) -> Option<NaiveDateTime> {
    let next = match provider_next {
        Some(date) => {
            if date.year() < SENTINEL_CUTOFF_YEAR {
                return None;
            }
            date
        }
        None => page_max_date.date().and_hms_opt(0, 0, 0)? + Duration::days(1),
    };

    // the cursor is monotonic; a non-advancing value would loop forever
    if next <= current {
        return None;
    }
    Some(next)
}

/// Walk all pages for one resolved criteria, yielding raw (unfiltered,
/// possibly duplicate) visits.
pub async fn collect_visits(
    token: &mut TokenManager,
    resolved: &ResolvedCriteria,
    start: NaiveDateTime,
    boundary: NaiveDateTime,
) -> Result<Vec<Visit>> {
    let mut cursor = SearchCursor::new(start, boundary);
    let mut visits = Vec::new();

    loop {
        let payload = SearchPayload {
            region_ids: vec![resolved.region_id.clone()],
            service_type_id: resolved.service_type_id.clone(),
            service_ids: vec![resolved.specialty_id.clone()],
            clinic_ids: resolved.clinic_ids.clone(),
            doctor_ids: resolved.doctor_id.iter().cloned().collect(),
            search_since: format_datetime(cursor.since()),
        };

        let bearer = token.bearer().await?;
        let page = token.provider().search_page(&bearer, &payload).await?;

        if page.items.is_empty() {
            break;
        }

        let mut page_max: Option<NaiveDateTime> = None;
        for raw in page.items {
            let visit = visit_from_raw(raw)?;
            page_max = Some(page_max.map_or(visit.date, |m| m.max(visit.date)));
            visits.push(visit);
        }

        let provider_next = match &page.next_search_date {
            Some(s) => Some(parse_datetime(s, false).ok_or_else(|| {
                TransportError::UnexpectedShape {
                    endpoint: "search",
                    detail: format!("unparseable nextSearchDate {s:?}"),
                }
            })?),
            None => None,
        };

        let page_max = match page_max {
            Some(m) => m,
            None => break,
        };
        if !cursor.advance(page_max, provider_next) {
            break;
        }
    }

    Ok(visits)
}

fn visit_from_raw(raw: RawVisit) -> Result<Visit> {
    let date = parse_datetime(&raw.appointment_date, false).ok_or_else(|| {
        TransportError::UnexpectedShape {
            endpoint: "search",
            detail: format!("unparseable appointmentDate {:?}", raw.appointment_date),
        }
    })?;
    Ok(Visit {
        date,
        specialty: raw.specialization_name,
        doctor: raw.doctor_name,
        clinic: raw.clinic_name,
        booking_handle: raw.id,
        is_remote: raw.is_telemedicine,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn falls_back_to_day_after_page_max() {
        let next = next_since(dt("2026-03-01T00:00:00"), dt("2026-03-03T17:45:00"), None);
        assert_eq!(next, Some(dt("2026-03-04T00:00:00")));
    }

    #[test]
    fn provider_continuation_takes_precedence() {
        let next = next_since(
            dt("2026-03-01T00:00:00"),
            dt("2026-03-03T17:45:00"),
            Some(dt("2026-03-10T08:00:00")),
        );
        assert_eq!(next, Some(dt("2026-03-10T08:00:00")));
    }

    #[test]
    fn far_past_continuation_is_end_of_availability() {
        let next = next_since(
            dt("2026-03-01T00:00:00"),
            dt("2026-03-03T17:45:00"),
            Some(dt("1970-01-01T00:00:00")),
        );
        assert_eq!(next, None);
    }

    #[test]
    fn non_advancing_cursor_terminates() {
        // provider echoes the current position back
        let next = next_since(
            dt("2026-03-04T00:00:00"),
            dt("2026-03-03T17:45:00"),
            Some(dt("2026-03-04T00:00:00")),
        );
        assert_eq!(next, None);
        // fallback rule that would move backwards
        let next = next_since(dt("2026-03-10T00:00:00"), dt("2026-03-03T17:45:00"), None);
        assert_eq!(next, None);
    }

    #[test]
    fn cursor_stops_at_boundary() {
        let mut cursor = SearchCursor::new(dt("2026-03-01T00:00:00"), dt("2026-03-05T23:59:59"));
        assert!(cursor.advance(dt("2026-03-02T12:00:00"), None));
        assert_eq!(cursor.since(), dt("2026-03-03T00:00:00"));
        // next position would be 2026-03-07, past the boundary
        assert!(!cursor.advance(dt("2026-03-06T09:00:00"), None));
    }
}
