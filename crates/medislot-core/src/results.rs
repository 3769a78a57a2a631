//! Filtering, deduplication and ordering of merged raw search results.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::model::{TimeRange, Visit};

/// Merged, filtered, deterministically ordered results of one attempt.
#[derive(Debug, Default)]
pub struct ResultSet {
    /// Every in-range visit sorted by key. Duplicate listings (same
    /// slot, different booking handle) are retained: a duplicate may
    /// carry a still-valid alternate handle.
    all: Vec<Visit>,
    /// One row per distinct key, for display and counting.
    unique: Vec<Visit>,
}

impl ResultSet {
    /// Apply the filter chain and sort.
    ///
    /// Drops visits dated outside `[after, before]` (pagination cursors
    /// are coarse and overshoot), remote consultations unless requested,
    /// and visits outside the time-of-day acceptance range.
    pub fn build(
        raw: Vec<Visit>,
        after: NaiveDateTime,
        before: NaiveDateTime,
        time_of_day: Option<&TimeRange>,
        include_remote: bool,
    ) -> Self {
        let mut all: Vec<Visit> = raw
            .into_iter()
            .filter(|v| after <= v.date && v.date <= before)
            .filter(|v| include_remote || !v.is_remote)
            .filter(|v| time_of_day.map_or(true, |range| range.covers(v.date.time())))
            .collect();
        all.sort_by(|a, b| a.key().cmp(&b.key()));

        let mut seen = HashSet::new();
        let unique = all
            .iter()
            .filter(|v| seen.insert(v.key()))
            .cloned()
            .collect();

        Self { all, unique }
    }

    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }

    /// Deduplicated rows, ascending by (date, specialty, doctor, clinic).
    pub fn unique(&self) -> &[Visit] {
        &self.unique
    }

    /// The full sorted list including duplicate handles.
    pub fn all(&self) -> &[Visit] {
        &self.all
    }

    /// The earliest visit; the autobook choice.
    pub fn earliest(&self) -> Option<&Visit> {
        self.all.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn visit(date: &str, doctor: &str, handle: &str) -> Visit {
        Visit {
            date: dt(date),
            specialty: "Dermatolog".into(),
            doctor: doctor.into(),
            clinic: "Centrum".into(),
            booking_handle: handle.into(),
            is_remote: false,
        }
    }

    fn window() -> (NaiveDateTime, NaiveDateTime) {
        (dt("2026-03-01T00:00:00"), dt("2026-03-31T23:59:59"))
    }

    #[test]
    fn sorts_ascending_by_key() {
        let (after, before) = window();
        let raw = vec![
            visit("2026-03-10T10:00:00", "Nowak", "3"),
            visit("2026-03-02T09:00:00", "Nowak", "1"),
            visit("2026-03-05T14:00:00", "Kowalska", "2"),
        ];
        let results = ResultSet::build(raw, after, before, None, false);
        let dates: Vec<_> = results.unique().iter().map(|v| v.date).collect();
        assert_eq!(
            dates,
            vec![
                dt("2026-03-02T09:00:00"),
                dt("2026-03-05T14:00:00"),
                dt("2026-03-10T10:00:00")
            ]
        );
        assert_eq!(results.earliest().unwrap().booking_handle, "1");
    }

    #[test]
    fn sorting_sorted_input_is_a_noop() {
        let (after, before) = window();
        let raw = vec![
            visit("2026-03-02T09:00:00", "Nowak", "1"),
            visit("2026-03-05T14:00:00", "Nowak", "2"),
        ];
        let once = ResultSet::build(raw, after, before, None, false);
        let again = ResultSet::build(once.unique().to_vec(), after, before, None, false);
        let keys_once: Vec<_> = once.unique().iter().map(Visit::key).collect();
        let keys_again: Vec<_> = again.unique().iter().map(Visit::key).collect();
        assert_eq!(keys_once, keys_again);
    }

    #[test]
    fn dedup_ignores_booking_handle_but_keeps_alternates() {
        let (after, before) = window();
        let raw = vec![
            visit("2026-03-02T09:00:00", "Nowak", "111"),
            visit("2026-03-02T09:00:00", "Nowak", "222"),
        ];
        let results = ResultSet::build(raw, after, before, None, false);
        assert_eq!(results.unique().len(), 1);
        assert_eq!(results.all().len(), 2);
    }

    #[test]
    fn dedup_is_idempotent() {
        let (after, before) = window();
        let raw = vec![
            visit("2026-03-02T09:00:00", "Nowak", "111"),
            visit("2026-03-02T09:00:00", "Nowak", "222"),
            visit("2026-03-03T09:00:00", "Nowak", "333"),
        ];
        let once = ResultSet::build(raw, after, before, None, false);
        let again = ResultSet::build(once.unique().to_vec(), after, before, None, false);
        assert_eq!(once.unique().len(), again.unique().len());
    }

    #[test]
    fn drops_out_of_range_dates() {
        let (after, before) = window();
        let raw = vec![
            visit("2026-02-28T09:00:00", "Nowak", "1"),
            visit("2026-03-15T09:00:00", "Nowak", "2"),
            visit("2026-04-01T09:00:00", "Nowak", "3"),
        ];
        let results = ResultSet::build(raw, after, before, None, false);
        assert_eq!(results.unique().len(), 1);
        assert_eq!(results.earliest().unwrap().booking_handle, "2");
    }

    #[test]
    fn remote_visits_excluded_unless_requested() {
        let (after, before) = window();
        let mut remote = visit("2026-03-02T09:00:00", "Nowak", "1");
        remote.is_remote = true;
        let in_person = visit("2026-03-03T09:00:00", "Nowak", "2");

        let results = ResultSet::build(
            vec![remote.clone(), in_person.clone()],
            after,
            before,
            None,
            false,
        );
        assert_eq!(results.unique().len(), 1);

        let results = ResultSet::build(vec![remote, in_person], after, before, None, true);
        assert_eq!(results.unique().len(), 2);
    }

    #[test]
    fn time_of_day_window_applies() {
        let (after, before) = window();
        let range = TimeRange {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        };
        let raw = vec![
            visit("2026-03-02T09:00:00", "Nowak", "1"),
            visit("2026-03-02T15:00:00", "Nowak", "2"),
        ];
        let results = ResultSet::build(raw, after, before, Some(&range), false);
        assert_eq!(results.unique().len(), 1);
        assert_eq!(results.earliest().unwrap().booking_handle, "1");
    }
}
