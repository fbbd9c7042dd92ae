use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::audit::AuditContext;
use super::domain::{
    partial_vin, EuVehicleCategory, SystemNumber, TechRecordStatus, TechRecordVersion,
    UserDetails, VehicleRecord,
};
use super::error::TechRecordError;
use super::identifier::{classify, normalize_term, LookupStrategy, SearchCriteria};
use super::lifecycle::{normalize_identifier, Amendment, LifecycleEngine, TestOutcome};
use super::listing::{RecordListService, StatusView};
use super::repository::{NumberGenerator, RecordStore, RepositoryError};
use crate::config::RecordsConfig;

/// Submission for a brand new vehicle.
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub vin: String,
    pub primary_vrm: Option<String>,
    pub secondary_vrms: Vec<String>,
    pub tech_record: TechRecordVersion,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromotionOutcome {
    NotRequired,
    Promoted(VehicleRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CategoryUpdate {
    NoUpdateRequired,
    Updated(VehicleRecord),
}

/// Facade running the lifecycle workflows against a record store.
///
/// Every mutation reads the aggregate, computes the next value with the pure engine, and
/// writes it conditionally on the revision it read. A stale revision triggers a fresh read
/// and recompute, up to `write_attempts` times.
pub struct TechRecordService<R, N> {
    store: Arc<R>,
    numbers: Arc<N>,
    engine: LifecycleEngine,
    listing: RecordListService,
    config: RecordsConfig,
}

impl<R, N> TechRecordService<R, N>
where
    R: RecordStore + 'static,
    N: NumberGenerator + 'static,
{
    pub fn new(store: Arc<R>, numbers: Arc<N>, config: RecordsConfig) -> Self {
        Self {
            store,
            numbers,
            engine: LifecycleEngine::new(),
            listing: RecordListService,
            config,
        }
    }

    pub fn listing(&self) -> &RecordListService {
        &self.listing
    }

    /// Resolves `term` to a lookup strategy and returns the matching vehicles filtered by `view`.
    pub fn search(
        &self,
        term: &str,
        criteria: SearchCriteria,
        view: StatusView,
    ) -> Result<Vec<VehicleRecord>, TechRecordError> {
        let term = normalize_term(term);
        let strategy = classify(&term, Some(criteria)).ok_or_else(|| {
            TechRecordError::validation(format!(
                "search identifier '{term}' does not match any lookup strategy"
            ))
        })?;
        debug!(%strategy, view = view.label(), "searching tech records");

        // Spaces are wildcards in a partial VIN; every other identifier is stored compacted.
        let lookup = match strategy {
            LookupStrategy::PartialVin => term,
            _ => normalize_identifier(&term),
        };
        let vehicles = self.store.find_by_identifier(&lookup, strategy)?;
        self.listing.apply_view(vehicles, view)
    }

    /// The single vehicle stored under `system_number`.
    pub fn get(&self, system_number: &SystemNumber) -> Result<VehicleRecord, TechRecordError> {
        let mut matches = self
            .store
            .find_by_identifier(system_number.as_str(), LookupStrategy::SystemNumber)?;
        match matches.len() {
            0 => Err(TechRecordError::NotFound(format!(
                "no vehicle found for system number {system_number}"
            ))),
            1 => Ok(matches.remove(0)),
            count => Err(TechRecordError::AmbiguousMatch(format!(
                "{count} vehicles share system number {system_number}"
            ))),
        }
    }

    pub fn create(&self, draft: NewVehicle, user: UserDetails) -> Result<VehicleRecord, TechRecordError> {
        let ctx = AuditContext::new(user);
        let vin = normalize_identifier(&draft.vin);
        let vehicle = VehicleRecord {
            system_number: SystemNumber(String::new()),
            partial_vin: partial_vin(&vin),
            vin,
            primary_vrm: draft.primary_vrm.as_deref().map(normalize_identifier),
            secondary_vrms: draft
                .secondary_vrms
                .iter()
                .map(|vrm| normalize_identifier(vrm))
                .collect(),
            trailer_id: None,
            tech_records: vec![draft.tech_record],
            revision: 0,
        };

        let processor = self.engine.validate_new(&vehicle).inspect_err(|err| {
            warn!(vin = %vehicle.vin, error = %err, "rejected new vehicle");
        })?;

        if !self
            .store
            .find_by_identifier(&vehicle.vin, LookupStrategy::Vin)?
            .is_empty()
        {
            return Err(TechRecordError::Conflict(format!(
                "a vehicle with vin {} already exists",
                vehicle.vin
            )));
        }
        if let Some(vrm) = &vehicle.primary_vrm {
            self.ensure_vrm_unused(vrm, None)?;
        }

        let vehicle = processor.assign_identifiers(self.numbers.as_ref(), vehicle)?;
        let vehicle = self.engine.create(vehicle, &ctx)?;
        let stored = self.store.create(vehicle)?;

        info!(
            system_number = %stored.system_number,
            vehicle_type = ?stored.vehicle_type(),
            "created tech record"
        );
        Ok(stored)
    }

    /// Supersedes the targeted live version with `amendment`.
    pub fn update(
        &self,
        system_number: &SystemNumber,
        amendment: Amendment,
        user: UserDetails,
    ) -> Result<VehicleRecord, TechRecordError> {
        let ctx = AuditContext::new(user);
        let written = self.mutate(system_number, "update", |stored| {
            let plan = self.engine.update(stored, amendment.clone(), &ctx)?;
            if let Some(vrm) = &plan.changed_vrm {
                self.ensure_vrm_unused(vrm, Some(&stored.system_number))?;
            }
            if let Some(trailer_id) = &plan.changed_trailer_id {
                self.ensure_trailer_id_unused(trailer_id, &stored.system_number)?;
            }
            Ok(Some(plan.record))
        })?;
        written_record(written, "update")
    }

    /// Promotes the provisional version when `outcome` calls for it. `target` defaults to
    /// current.
    pub fn promote_by_test_outcome(
        &self,
        system_number: &SystemNumber,
        outcome: &TestOutcome,
        target: Option<TechRecordStatus>,
        user: UserDetails,
    ) -> Result<PromotionOutcome, TechRecordError> {
        if !outcome.requires_promotion() {
            debug!(
                %system_number,
                test_type_id = %outcome.test_type_id,
                "test outcome does not require promotion"
            );
            return Ok(PromotionOutcome::NotRequired);
        }

        let ctx = AuditContext::new(user);
        let target = target.unwrap_or(TechRecordStatus::Current);
        let written = self.mutate(system_number, "promote", |stored| {
            self.engine.promote(stored, target, &ctx)
        })?;

        Ok(match written {
            Some(record) => PromotionOutcome::Promoted(record),
            None => PromotionOutcome::NotRequired,
        })
    }

    pub fn archive(
        &self,
        system_number: &SystemNumber,
        submitted: &TechRecordVersion,
        reason: &str,
        user: UserDetails,
    ) -> Result<VehicleRecord, TechRecordError> {
        let ctx = AuditContext::new(user);
        let written = self.mutate(system_number, "archive", |stored| {
            self.engine.archive(stored, submitted, reason, &ctx).map(Some)
        })?;
        written_record(written, "archive")
    }

    pub fn add_provisional_record(
        &self,
        system_number: &SystemNumber,
        candidate: TechRecordVersion,
        user: UserDetails,
    ) -> Result<VehicleRecord, TechRecordError> {
        let ctx = AuditContext::new(user);
        let written = self.mutate(system_number, "add-provisional", |stored| {
            self.engine
                .add_provisional(stored, candidate.clone(), &ctx)
                .map(Some)
        })?;
        written_record(written, "add-provisional")
    }

    pub fn update_eu_vehicle_category(
        &self,
        system_number: &SystemNumber,
        category: EuVehicleCategory,
        user: UserDetails,
    ) -> Result<CategoryUpdate, TechRecordError> {
        let ctx = AuditContext::new(user);
        let written = self.mutate(system_number, "update-eu-vehicle-category", |stored| {
            self.engine.update_eu_vehicle_category(stored, category, &ctx)
        })?;

        Ok(match written {
            Some(record) => CategoryUpdate::Updated(record),
            None => CategoryUpdate::NoUpdateRequired,
        })
    }

    /// Read-modify-write loop. `step` returning `Ok(None)` ends the workflow without a write.
    fn mutate<F>(
        &self,
        system_number: &SystemNumber,
        operation: &'static str,
        step: F,
    ) -> Result<Option<VehicleRecord>, TechRecordError>
    where
        F: Fn(&VehicleRecord) -> Result<Option<VehicleRecord>, TechRecordError>,
    {
        let attempts = self.config.write_attempts.max(1);
        let mut attempt = 1;

        loop {
            let stored = self.get(system_number)?;
            let next = step(&stored).inspect_err(|err| {
                warn!(%system_number, operation, error = %err, "rejected tech record change");
            })?;
            let Some(next) = next else {
                info!(%system_number, operation, "no change required");
                return Ok(None);
            };

            match self.store.replace(next, stored.revision) {
                Ok(saved) => {
                    info!(
                        %system_number,
                        operation,
                        revision = saved.revision,
                        versions = saved.tech_records.len(),
                        "tech record written"
                    );
                    return Ok(Some(saved));
                }
                Err(RepositoryError::StaleRevision) if attempt < attempts => {
                    debug!(%system_number, operation, attempt, "stale revision, retrying");
                    self.backoff(attempt);
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn backoff(&self, attempt: u32) {
        let delay = self.config.retry_backoff_ms.saturating_mul(u64::from(attempt));
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
    }

    /// A VRM is taken when another vehicle carrying it as primary still has a live version.
    fn ensure_vrm_unused(
        &self,
        vrm: &str,
        owner: Option<&SystemNumber>,
    ) -> Result<(), TechRecordError> {
        let taken = self
            .store
            .find_by_identifier(vrm, LookupStrategy::Vrm)?
            .iter()
            .any(|vehicle| {
                Some(&vehicle.system_number) != owner
                    && vehicle.primary_vrm.as_deref() == Some(vrm)
                    && vehicle.has_live_version()
            });
        if taken {
            Err(TechRecordError::Conflict(format!(
                "primary VRM {vrm} is already in use"
            )))
        } else {
            Ok(())
        }
    }

    fn ensure_trailer_id_unused(
        &self,
        trailer_id: &str,
        owner: &SystemNumber,
    ) -> Result<(), TechRecordError> {
        let taken = self
            .store
            .find_by_identifier(trailer_id, LookupStrategy::TrailerId)?
            .iter()
            .any(|vehicle| &vehicle.system_number != owner && vehicle.has_live_version());
        if taken {
            Err(TechRecordError::Conflict(format!(
                "trailer id {trailer_id} is already in use"
            )))
        } else {
            Ok(())
        }
    }
}

fn written_record(
    written: Option<VehicleRecord>,
    operation: &str,
) -> Result<VehicleRecord, TechRecordError> {
    written.ok_or_else(|| TechRecordError::Internal(format!("{operation} produced no record")))
}
