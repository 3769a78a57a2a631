//! Staged fuzzy resolution of human-entered filter names to provider ids.
//!
//! Resolution order is fixed by the provider's data model: the region and
//! service type come from the unscoped filter payload, specialties are
//! scoped by (service type, region), and clinics/doctors are scoped by
//! (service type, region, specialty). Each scope is fetched from the
//! provider at most once per run and cached under its context key.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::auth::TokenManager;
use crate::error::{ResolutionError, Result};
use crate::model::SearchCriteria;
use crate::provider::{FilterData, FilterOption};

/// Accept the best candidate at or above this Jaro-Winkler similarity.
/// Deliberately loose: operator input is expected to carry typos and
/// missing diacritics, and candidate sets are small.
pub const SIMILARITY_THRESHOLD: f64 = 0.55;

/// Upstream ids that scope a candidate fetch. The unscoped (initial)
/// payload uses the all-`None` context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterContext {
    pub service_type_id: Option<String>,
    pub region_id: Option<String>,
    pub specialty_id: Option<String>,
}

/// Context-keyed cache of provider filter payloads. Append-only within
/// a run; an explicit structure rather than a memoized function so
/// separate resolver instances never share state.
#[derive(Default)]
pub struct FilterCache {
    entries: HashMap<FilterContext, FilterData>,
}

impl FilterCache {
    /// Filter data for `context`, fetched from the provider on first use.
    pub async fn fetch(
        &mut self,
        token: &mut TokenManager,
        context: &FilterContext,
    ) -> Result<&FilterData> {
        match self.entries.entry(context.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let bearer = token.bearer().await?;
                let data = if *context == FilterContext::default() {
                    token.provider().initial_filters(&bearer).await?
                } else {
                    token
                        .provider()
                        .scoped_filters(
                            &bearer,
                            context.service_type_id.as_deref(),
                            context.region_id.as_deref(),
                            context.specialty_id.as_deref(),
                        )
                        .await?
                };
                Ok(entry.insert(data))
            }
        }
    }
}

/// One fully resolved (specialty x doctor) search combination.
#[derive(Debug, Clone)]
pub struct ResolvedCriteria {
    pub region_id: String,
    pub service_type_id: String,
    pub specialty_id: String,
    pub clinic_ids: Vec<String>,
    pub doctor_id: Option<String>,
}

/// Closest case-insensitive match to `input` among `options`, or a
/// [`ResolutionError`] enumerating every candidate name.
pub fn best_match<'a>(
    category: &'static str,
    input: &str,
    options: &'a [FilterOption],
) -> Result<&'a FilterOption, ResolutionError> {
    if options.is_empty() {
        return Err(ResolutionError::EmptyCandidates { category });
    }

    let needle = input.trim().to_lowercase();
    let mut best: Option<(f64, &FilterOption)> = None;
    for option in options {
        let score = strsim::jaro_winkler(&needle, &option.text.to_lowercase());
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, option));
        }
    }

    match best {
        Some((score, option)) if score >= SIMILARITY_THRESHOLD => Ok(option),
        _ => Err(ResolutionError::NoMatch {
            category,
            input: input.to_string(),
            candidates: options.iter().map(|o| o.text.clone()).collect(),
        }),
    }
}

/// Resolves operator criteria to provider ids, one combination per
/// specialty x doctor pair (the provider cannot search a Cartesian set
/// in one call).
#[derive(Default)]
pub struct FilterResolver {
    cache: FilterCache,
}

impl FilterResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(
        &mut self,
        token: &mut TokenManager,
        criteria: &SearchCriteria,
    ) -> Result<Vec<ResolvedCriteria>> {
        let initial = self
            .cache
            .fetch(token, &FilterContext::default())
            .await?
            .clone();

        let region_id = match &criteria.region {
            Some(name) => best_match("region", name, &initial.regions)?.id.clone(),
            None => initial.home_region_id.clone().ok_or_else(|| {
                crate::error::TransportError::UnexpectedShape {
                    endpoint: "filters/initial",
                    detail: "no home region in initial filter data".into(),
                }
            })?,
        };

        let service_type = if criteria.diagnostic {
            "diagnostic procedure"
        } else {
            "consultation"
        };
        let service_type_id = best_match("service type", service_type, &initial.service_types)?
            .id
            .clone();

        let mut resolved = Vec::new();
        for specialty in &criteria.specialties {
            let specialty_scope = FilterContext {
                service_type_id: Some(service_type_id.clone()),
                region_id: Some(region_id.clone()),
                specialty_id: None,
            };
            let data = self.cache.fetch(token, &specialty_scope).await?;
            let specialty_id = best_match("specialty", specialty, &data.services)?.id.clone();

            let detail_scope = FilterContext {
                specialty_id: Some(specialty_id.clone()),
                ..specialty_scope
            };
            let data = self.cache.fetch(token, &detail_scope).await?;

            let clinic_ids = criteria
                .clinics
                .iter()
                .map(|clinic| best_match("clinic", clinic, &data.clinics).map(|o| o.id.clone()))
                .collect::<Result<Vec<_>, _>>()?;

            if criteria.doctors.is_empty() {
                resolved.push(ResolvedCriteria {
                    region_id: region_id.clone(),
                    service_type_id: service_type_id.clone(),
                    specialty_id,
                    clinic_ids,
                    doctor_id: None,
                });
            } else {
                for doctor in &criteria.doctors {
                    let doctor_id = best_match("doctor", doctor, &data.doctors)?.id.clone();
                    resolved.push(ResolvedCriteria {
                        region_id: region_id.clone(),
                        service_type_id: service_type_id.clone(),
                        specialty_id: specialty_id.clone(),
                        clinic_ids: clinic_ids.clone(),
                        doctor_id: Some(doctor_id),
                    });
                }
            }
        }

        Ok(resolved)
    }
}
