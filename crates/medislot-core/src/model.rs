//! Core data types: visits, search criteria and the flexible date/time
//! parsing used for operator-entered bounds.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// One bookable appointment offering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub date: NaiveDateTime,
    pub specialty: String,
    pub doctor: String,
    pub clinic: String,
    /// Provider token used to claim the slot. Not part of visit identity:
    /// duplicate listings of the same slot can carry different handles.
    pub booking_handle: String,
    /// Remote/phone consultation rather than an in-person visit.
    pub is_remote: bool,
}

impl Visit {
    /// Identity and ordering key. Two listings with equal keys are the
    /// same slot even when their booking handles differ.
    pub fn key(&self) -> VisitKey {
        VisitKey {
            date: self.date,
            specialty: self.specialty.clone(),
            doctor: self.doctor.clone(),
            clinic: self.clinic.clone(),
        }
    }
}

/// Deduplication and sort key: (date, specialty, doctor, clinic).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisitKey {
    pub date: NaiveDateTime,
    pub specialty: String,
    pub doctor: String,
    pub clinic: String,
}

/// Operator-entered search criteria, before filter-name resolution.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    /// Region name; `None` falls back to the account's home region.
    pub region: Option<String>,
    /// At least one specialty name.
    pub specialties: Vec<String>,
    pub doctors: Vec<String>,
    pub clinics: Vec<String>,
    /// Search window start (inclusive).
    pub after: NaiveDateTime,
    /// Search window end (inclusive).
    pub before: NaiveDateTime,
    /// Minimum lead time from now until an eligible visit.
    pub margin: Duration,
    /// Optional time-of-day acceptance range.
    pub time_of_day: Option<TimeRange>,
    /// Keep remote/phone consultations in the results.
    pub include_remote: bool,
    /// Search diagnostic procedures instead of consultations.
    pub diagnostic: bool,
}

/// Inclusive time-of-day acceptance range, e.g. `08:00-13:30`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Parse a `HH:MM-HH:MM` range (seconds optional).
    pub fn parse(spec: &str) -> Option<Self> {
        let (start, end) = spec.trim().split_once('-')?;
        Some(Self {
            start: parse_time(start)?,
            end: parse_time(end)?,
        })
    }

    pub fn covers(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M:%S"),
            self.end.format("%H:%M:%S")
        )
    }
}

/// Parse a `HH[:MM[:SS]]` clock time.
pub fn parse_time(spec: &str) -> Option<NaiveTime> {
    let mut parts = spec.trim().split(':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next().unwrap_or("0").parse().ok()?;
    let second: u32 = parts.next().unwrap_or("0").parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Parse a date or date-time in any of the accepted layouts:
/// `YYYY-MM-DD`, `YYYY.MM.DD`, optionally followed by `T` or a space and
/// `HH[:MM[:SS]]`. A trailing numeric timezone offset is tolerated and
/// dropped. With `maximize`, missing time components are filled with
/// their maximum (so `2026-03-01` means end of that day); otherwise they
/// are zeroed. Seconds are normalized either way.
pub fn parse_datetime(spec: &str, maximize: bool) -> Option<NaiveDateTime> {
    let spec = strip_tz_offset(spec.trim());

    let (date_part, time_part) = match spec.split_once(|c| c == 'T' || c == ' ') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (spec, None),
    };

    let date_part = date_part.replace('.', "-");
    let date = NaiveDate::parse_from_str(&date_part, "%Y-%m-%d").ok()?;

    let (hour, minute) = match time_part {
        Some(t) if !t.is_empty() => {
            let mut parts = t.split(':');
            let hour: u32 = parts.next()?.parse().ok()?;
            let minute: Option<u32> = match parts.next() {
                Some(m) => Some(m.parse().ok()?),
                None => None,
            };
            // seconds are normalized below, parse only for validation
            if let Some(s) = parts.next() {
                let _: u32 = s.parse().ok()?;
            }
            if parts.next().is_some() {
                return None;
            }
            (Some(hour), minute)
        }
        _ => (None, None),
    };

    let (hour, minute, second) = if maximize {
        (hour.unwrap_or(23), minute.unwrap_or(59), 59)
    } else {
        (hour.unwrap_or(0), minute.unwrap_or(0), 0)
    };

    date.and_hms_opt(hour, minute, second)
}

/// Drop a trailing `+HH:MM` / `-HHMM` style offset, if any.
fn strip_tz_offset(spec: &str) -> &str {
    for offset_len in [6, 5] {
        if spec.len() <= offset_len {
            continue;
        }
        let Some(tail) = spec.get(spec.len() - offset_len..) else {
            continue;
        };
        let mut chars = tail.chars();
        let sign = chars.next();
        if matches!(sign, Some('+') | Some('-'))
            && chars.clone().all(|c| c.is_ascii_digit() || c == ':')
            && chars.filter(|c| c.is_ascii_digit()).count() == 4
        {
            return spec[..spec.len() - offset_len].trim_end();
        }
    }
    spec
}

/// Parse a compact duration such as `1d`, `2h30m` or `1d 2h 30m`.
pub fn parse_margin(spec: &str) -> Option<Duration> {
    let mut total = Duration::zero();
    let mut digits = String::new();
    let mut seen_any = false;

    let mut chars = spec.trim().chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '0'..='9' => digits.push(c),
            'd' | 'h' | 'm' => {
                if digits.is_empty() {
                    return None;
                }
                let n: i64 = digits.parse().ok()?;
                digits.clear();
                seen_any = true;
                total += match c {
                    'd' => Duration::days(n),
                    'h' => {
                        // tolerate the "hr" spelling
                        if chars.peek() == Some(&'r') {
                            chars.next();
                        }
                        Duration::hours(n)
                    }
                    _ => Duration::minutes(n),
                };
            }
            c if c.is_whitespace() => {}
            _ => return None,
        }
    }

    if !digits.is_empty() || !seen_any {
        return None;
    }
    Some(total)
}

/// Wire format for cursor timestamps sent to the provider.
pub fn format_datetime(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn parses_bare_date() {
        assert_eq!(parse_datetime("2026-03-01", false), Some(dt("2026-03-01T00:00:00")));
        assert_eq!(parse_datetime("2026.03.01", false), Some(dt("2026-03-01T00:00:00")));
    }

    #[test]
    fn maximize_fills_missing_components() {
        assert_eq!(parse_datetime("2026-03-01", true), Some(dt("2026-03-01T23:59:59")));
        assert_eq!(parse_datetime("2026-03-01 14", true), Some(dt("2026-03-01T14:59:59")));
        assert_eq!(parse_datetime("2026-03-01T14:30", true), Some(dt("2026-03-01T14:30:59")));
    }

    #[test]
    fn seconds_are_normalized() {
        assert_eq!(
            parse_datetime("2026-03-01T14:30:45", false),
            Some(dt("2026-03-01T14:30:00"))
        );
    }

    #[test]
    fn tolerates_timezone_offset() {
        assert_eq!(
            parse_datetime("2026-03-01T14:30:00+02:00", false),
            Some(dt("2026-03-01T14:30:00"))
        );
        assert_eq!(
            parse_datetime("2026-03-01T14:30:00-0500", false),
            Some(dt("2026-03-01T14:30:00"))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_datetime("not a date", false), None);
        assert_eq!(parse_datetime("2026-13-40", false), None);
        assert_eq!(parse_datetime("2026-03-01T25:00", false), None);
    }

    #[test]
    fn parses_margins() {
        assert_eq!(parse_margin("1h"), Some(Duration::hours(1)));
        assert_eq!(parse_margin("2d"), Some(Duration::days(2)));
        assert_eq!(
            parse_margin("1d 2h 30m"),
            Some(Duration::days(1) + Duration::hours(2) + Duration::minutes(30))
        );
        assert_eq!(parse_margin("90m"), Some(Duration::minutes(90)));
        assert_eq!(parse_margin("3hr"), Some(Duration::hours(3)));
        assert_eq!(parse_margin(""), None);
        assert_eq!(parse_margin("h"), None);
        assert_eq!(parse_margin("12"), None);
    }

    #[test]
    fn time_range_parse_and_covers() {
        let range = TimeRange::parse("08:00-13:30").unwrap();
        assert!(range.covers(NaiveTime::from_hms_opt(8, 0, 0).unwrap()));
        assert!(range.covers(NaiveTime::from_hms_opt(13, 30, 0).unwrap()));
        assert!(!range.covers(NaiveTime::from_hms_opt(13, 31, 0).unwrap()));
        assert!(!range.covers(NaiveTime::from_hms_opt(7, 59, 59).unwrap()));
        assert!(TimeRange::parse("8-13").is_some());
        assert!(TimeRange::parse("8:00").is_none());
    }

    #[test]
    fn visit_key_ignores_handle_and_orders_by_tuple() {
        let a = Visit {
            date: dt("2026-03-01T10:00:00"),
            specialty: "Dermatology".into(),
            doctor: "Anna Nowak".into(),
            clinic: "Center".into(),
            booking_handle: "111".into(),
            is_remote: false,
        };
        let mut b = a.clone();
        b.booking_handle = "222".into();
        assert_eq!(a.key(), b.key());

        let mut later = a.clone();
        later.date = dt("2026-03-01T11:00:00");
        assert!(a.key() < later.key());

        let mut other_doctor = a.clone();
        other_doctor.doctor = "Zofia Kowalska".into();
        assert!(a.key() < other_doctor.key());
    }
}
