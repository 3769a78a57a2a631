//! Typed HTTP bindings for the scheduling provider.
//!
//! Every request and response payload is an explicit serde struct; a
//! payload outside these shapes surfaces as
//! [`TransportError::UnexpectedShape`] instead of an untyped blob
//! wandering through the engine. The client is stateless with respect to
//! credentials -- callers pass the current bearer token in, which keeps
//! all token lifecycle decisions in [`crate::auth::TokenManager`].

use chrono::{Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::Credential;
use crate::error::{AuthError, Result, TransportError};

/// HTTP client for one provider deployment.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: Client,
    base_url: String,
}

/// Token endpoint reply (password and refresh grants share the shape).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

/// One selectable filter value as the provider presents it.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterOption {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub text: String,
}

/// Per-category candidate lists for one resolution context.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterData {
    #[serde(default)]
    pub regions: Vec<FilterOption>,
    #[serde(default)]
    pub service_types: Vec<FilterOption>,
    #[serde(default)]
    pub services: Vec<FilterOption>,
    #[serde(default)]
    pub clinics: Vec<FilterOption>,
    #[serde(default)]
    pub doctors: Vec<FilterOption>,
    /// The account's home region, sent with the initial (unscoped) data.
    #[serde(default, rename = "homeRegionId", deserialize_with = "opt_id_as_string")]
    pub home_region_id: Option<String>,
}

/// Search request body: fully resolved ids plus the current cursor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPayload {
    pub region_ids: Vec<String>,
    pub service_type_id: String,
    pub service_ids: Vec<String>,
    pub clinic_ids: Vec<String>,
    pub doctor_ids: Vec<String>,
    pub search_since: String,
}

/// One page of raw search results.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitPage {
    #[serde(default)]
    pub items: Vec<RawVisit>,
    /// Explicit continuation cursor; older provider builds omit it.
    #[serde(default)]
    pub next_search_date: Option<String>,
}

/// A visit slot as serialized by the provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVisit {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub appointment_date: String,
    pub specialization_name: String,
    pub doctor_name: String,
    pub clinic_name: String,
    #[serde(default)]
    pub is_telemedicine: bool,
}

/// Booking endpoint reply: either a success flag or the list of
/// appointments the new slot collides with.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    colliding_visits: Vec<RawAppointment>,
}

/// An appointment already held by the account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAppointment {
    #[serde(deserialize_with = "id_as_string")]
    pub appointment_id: String,
    pub appointment_date: String,
    pub specialization_name: String,
    pub doctor_name: String,
    pub clinic_name: String,
}

/// Outcome of a booking attempt.
#[derive(Debug)]
pub enum BookOutcome {
    Booked,
    Collision(Vec<RawAppointment>),
}

/// Reschedule endpoint reply. The two markers are mutually exclusive on
/// a well-behaved provider; interpreting them is the booking layer's job.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleMarkers {
    #[serde(default)]
    pub reschedule_success: bool,
    #[serde(default)]
    pub reschedule_failed: bool,
}

impl ProviderClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Password-grant login. The multi-step browser handshake the portal
    /// uses in the wild is deliberately opaque here; any mechanism that
    /// yields a token pair satisfies this contract.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Credential> {
        let params = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];
        let resp = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .form(&params)
            .send()
            .await
            .map_err(TransportError::Http)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(AuthError::LoginRejected(format!("{status}: {detail}")).into());
        }

        let token: TokenResponse = resp.json().await.map_err(TransportError::Http)?;
        Ok(token.into())
    }

    /// Refresh-grant token rotation. Rejection is fatal for the run.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let resp = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .form(&params)
            .send()
            .await
            .map_err(TransportError::Http)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(AuthError::RefreshRejected(format!("{status}: {detail}")).into());
        }

        let token: TokenResponse = resp.json().await.map_err(TransportError::Http)?;
        Ok(token.into())
    }

    /// Unscoped filter data: regions, service types and the account's
    /// home region.
    pub async fn initial_filters(&self, token: &str) -> Result<FilterData> {
        let resp = self
            .http
            .get(format!("{}/api/visits/filters/initial", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(TransportError::Http)?
            .error_for_status()
            .map_err(TransportError::Http)?;
        Ok(resp.json().await.map_err(TransportError::Http)?)
    }

    /// Filter data scoped by already-resolved upstream ids. Query
    /// parameter order is fixed: serviceTypeId, regionId, specialtyId.
    pub async fn scoped_filters(
        &self,
        token: &str,
        service_type_id: Option<&str>,
        region_id: Option<&str>,
        specialty_id: Option<&str>,
    ) -> Result<FilterData> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(id) = service_type_id {
            query.push(("serviceTypeId", id));
        }
        if let Some(id) = region_id {
            query.push(("regionId", id));
        }
        if let Some(id) = specialty_id {
            query.push(("specialtyId", id));
        }

        let resp = self
            .http
            .get(format!("{}/api/visits/filters", self.base_url))
            .query(&query)
            .bearer_auth(token)
            .send()
            .await
            .map_err(TransportError::Http)?
            .error_for_status()
            .map_err(TransportError::Http)?;
        Ok(resp.json().await.map_err(TransportError::Http)?)
    }

    /// One page of free slots starting at the payload's cursor.
    pub async fn search_page(&self, token: &str, payload: &SearchPayload) -> Result<VisitPage> {
        let resp = self
            .http
            .post(format!("{}/api/visits/search", self.base_url))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(TransportError::Http)?
            .error_for_status()
            .map_err(TransportError::Http)?;
        Ok(resp.json().await.map_err(TransportError::Http)?)
    }

    /// Claim a slot by its booking handle.
    pub async fn book(&self, token: &str, handle: &str) -> Result<BookOutcome> {
        let resp = self
            .http
            .post(format!("{}/api/visits/book", self.base_url))
            .bearer_auth(token)
            .json(&serde_json::json!({ "visitId": handle }))
            .send()
            .await
            .map_err(TransportError::Http)?
            .error_for_status()
            .map_err(TransportError::Http)?;
        let body: BookResponse = resp.json().await.map_err(TransportError::Http)?;

        if body.success {
            Ok(BookOutcome::Booked)
        } else if !body.colliding_visits.is_empty() {
            Ok(BookOutcome::Collision(body.colliding_visits))
        } else {
            Err(TransportError::UnexpectedShape {
                endpoint: "book",
                detail: "neither success nor collision list present".into(),
            }
            .into())
        }
    }

    /// Atomically cancel `cancel_handle` and claim `slot_handle`.
    pub async fn reschedule(
        &self,
        token: &str,
        cancel_handle: &str,
        slot_handle: &str,
    ) -> Result<RescheduleMarkers> {
        let resp = self
            .http
            .post(format!("{}/api/visits/reschedule", self.base_url))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "oldAppointmentId": cancel_handle,
                "visitId": slot_handle,
            }))
            .send()
            .await
            .map_err(TransportError::Http)?
            .error_for_status()
            .map_err(TransportError::Http)?;
        Ok(resp.json().await.map_err(TransportError::Http)?)
    }
}

impl From<TokenResponse> for Credential {
    fn from(token: TokenResponse) -> Self {
        Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        }
    }
}

/// Provider ids arrive as numbers or strings depending on the category
/// and API vintage; normalize everything to strings.
fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "id must be a string or number, got {other}"
        ))),
    }
}

fn opt_id_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "id must be a string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_data_accepts_numeric_and_string_ids() {
        let data: FilterData = serde_json::from_str(
            r#"{
                "regions": [{"id": 204, "text": "Warszawa"}],
                "services": [{"id": "9200", "text": "Dermatolog"}],
                "homeRegionId": 204
            }"#,
        )
        .unwrap();
        assert_eq!(data.regions[0].id, "204");
        assert_eq!(data.services[0].id, "9200");
        assert_eq!(data.home_region_id.as_deref(), Some("204"));
        assert!(data.clinics.is_empty());
    }

    #[test]
    fn visit_page_without_continuation_token() {
        let page: VisitPage = serde_json::from_str(
            r#"{"items": [{
                "id": 1,
                "appointmentDate": "2026-03-01T10:00:00",
                "specializationName": "Dermatolog",
                "doctorName": "Anna Nowak",
                "clinicName": "Centrum"
            }]}"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next_search_date.is_none());
        assert!(!page.items[0].is_telemedicine);
    }

    #[test]
    fn filter_option_rejects_structured_ids() {
        let err = serde_json::from_str::<FilterOption>(r#"{"id": {"v": 1}, "text": "x"}"#);
        assert!(err.is_err());
    }
}
