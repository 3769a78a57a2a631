//! At-most-once booking with collision detection and optional reschedule.
//!
//! A reported collision is a precondition failure, not a transport
//! error: the account already holds conflicting appointments. When the
//! caller allowed rescheduling, the earliest colliding appointment is
//! cancelled atomically with claiming the new slot. A successful cancel
//! without a confirmed claim is not rolled back; this is a best-effort
//! transaction and the ambiguous case is surfaced as its own error.

use chrono::NaiveDateTime;

use crate::auth::TokenManager;
use crate::error::{BookingError, Result, TransportError};
use crate::model::{parse_datetime, Visit};
use crate::provider::{BookOutcome, RawAppointment, RescheduleMarkers};

/// An appointment the account already holds, parsed from the provider's
/// collision list.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingAppointment {
    pub handle: String,
    pub date: NaiveDateTime,
    pub specialty: String,
    pub doctor: String,
    pub clinic: String,
}

/// How a booking concluded.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingReport {
    Booked,
    /// Booked after cancelling an existing appointment.
    Rescheduled { cancelled: ExistingAppointment },
}

/// One booking attempt for one chosen visit.
pub struct BookingTransaction {
    allow_reschedule: bool,
}

impl BookingTransaction {
    pub fn new(allow_reschedule: bool) -> Self {
        Self { allow_reschedule }
    }

    pub async fn book(&self, token: &mut TokenManager, visit: &Visit) -> Result<BookingReport> {
        let bearer = token.bearer().await?;
        match token
            .provider()
            .book(&bearer, &visit.booking_handle)
            .await?
        {
            BookOutcome::Booked => Ok(BookingReport::Booked),
            BookOutcome::Collision(existing) => {
                self.resolve_collision(token, visit, existing).await
            }
        }
    }

    async fn resolve_collision(
        &self,
        token: &mut TokenManager,
        visit: &Visit,
        existing: Vec<RawAppointment>,
    ) -> Result<BookingReport> {
        if !self.allow_reschedule {
            return Err(BookingError::Conflict {
                existing: existing.len(),
            }
            .into());
        }

        let mut appointments = existing
            .into_iter()
            .map(appointment_from_raw)
            .collect::<Result<Vec<_>>>()?;
        appointments.sort_by(|a, b| a.date.cmp(&b.date));

        // earliest colliding appointment is the one to cancel
        let victim = appointments.first().cloned().ok_or_else(|| {
            TransportError::UnexpectedShape {
                endpoint: "book",
                detail: "collision reported with an empty appointment list".into(),
            }
        })?;

        let bearer = token.bearer().await?;
        let markers = token
            .provider()
            .reschedule(&bearer, &victim.handle, &visit.booking_handle)
            .await?;

        interpret_markers(&markers)?;
        Ok(BookingReport::Rescheduled { cancelled: victim })
    }
}

/// Interpret the provider's mutually exclusive success/failure markers.
/// Both or neither present means the outcome is indeterminate and must
/// never be assumed a success.
pub fn interpret_markers(markers: &RescheduleMarkers) -> Result<(), BookingError> {
    match (markers.reschedule_success, markers.reschedule_failed) {
        (true, false) => Ok(()),
        (false, true) => Err(BookingError::Rejected(
            "provider reported reschedule failure".into(),
        )),
        _ => Err(BookingError::AmbiguousOutcome),
    }
}

fn appointment_from_raw(raw: RawAppointment) -> Result<ExistingAppointment> {
    let date = parse_datetime(&raw.appointment_date, false).ok_or_else(|| {
        TransportError::UnexpectedShape {
            endpoint: "book",
            detail: format!(
                "unparseable collision appointmentDate {:?}",
                raw.appointment_date
            ),
        }
    })?;
    Ok(ExistingAppointment {
        handle: raw.appointment_id,
        date,
        specialty: raw.specialization_name,
        doctor: raw.doctor_name,
        clinic: raw.clinic_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers(success: bool, failed: bool) -> RescheduleMarkers {
        serde_json::from_value(serde_json::json!({
            "rescheduleSuccess": success,
            "rescheduleFailed": failed,
        }))
        .unwrap()
    }

    #[test]
    fn success_marker_alone_is_ok() {
        assert!(interpret_markers(&markers(true, false)).is_ok());
    }

    #[test]
    fn failure_marker_alone_is_rejection() {
        assert!(matches!(
            interpret_markers(&markers(false, true)),
            Err(BookingError::Rejected(_))
        ));
    }

    #[test]
    fn both_markers_are_ambiguous() {
        assert!(matches!(
            interpret_markers(&markers(true, true)),
            Err(BookingError::AmbiguousOutcome)
        ));
    }

    #[test]
    fn neither_marker_is_ambiguous() {
        assert!(matches!(
            interpret_markers(&markers(false, false)),
            Err(BookingError::AmbiguousOutcome)
        ));
    }
}
