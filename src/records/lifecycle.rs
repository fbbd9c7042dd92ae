//! Status state machine shared by every vehicle type.
//!
//! Each workflow takes the stored aggregate by reference and returns the aggregate that
//! should be written, or an error before anything is written. Nothing here touches storage;
//! the service owns the read-modify-write loop.

use serde::Deserialize;

use super::audit::{AuditContext, AuditStamper};
use super::completeness::CompletenessClassifier;
use super::domain::{
    partial_vin, EuVehicleCategory, TechRecordStatus, TechRecordVersion, UpdateType,
    VehicleRecord,
};
use super::error::TechRecordError;
use super::processor::{ValidationMode, VehicleTypeProcessor};

/// Test types whose pass promotes a provisional record: first tests.
pub const FIRST_TEST_TYPE_IDS: [&str; 13] = [
    "41", "64", "65", "66", "67", "82", "83", "95", "102", "103", "104", "119", "120",
];

/// Test types whose pass promotes a provisional record: notifiable alterations.
pub const NOTIFIABLE_ALTERATION_TEST_TYPE_IDS: [&str; 3] = ["38", "47", "48"];

/// Outcome of a completed test, as reported by the testing service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub test_status: String,
    pub test_result: String,
    pub test_type_id: String,
}

impl TestOutcome {
    pub fn new(
        test_status: impl Into<String>,
        test_result: impl Into<String>,
        test_type_id: impl Into<String>,
    ) -> Self {
        Self {
            test_status: test_status.into(),
            test_result: test_result.into(),
            test_type_id: test_type_id.into(),
        }
    }

    /// Only a submitted pass (or PRS) of a first test or notifiable alteration promotes.
    pub fn requires_promotion(&self) -> bool {
        let status = self.test_status.trim().to_ascii_lowercase();
        let result = self.test_result.trim().to_ascii_lowercase();
        let type_id = self.test_type_id.trim();

        status == "submitted"
            && matches!(result.as_str(), "pass" | "prs")
            && (FIRST_TEST_TYPE_IDS.contains(&type_id)
                || NOTIFIABLE_ALTERATION_TEST_TYPE_IDS.contains(&type_id))
    }
}

/// Identifier and tech record changes submitted through an update.
#[derive(Debug, Clone)]
pub struct Amendment {
    pub primary_vrm: Option<String>,
    pub secondary_vrms: Option<Vec<String>>,
    pub trailer_id: Option<String>,
    pub tech_record: TechRecordVersion,
    /// Which existing version to supersede; absent means the only live one.
    pub old_status: Option<TechRecordStatus>,
}

impl Amendment {
    pub fn new(tech_record: TechRecordVersion) -> Self {
        Self {
            primary_vrm: None,
            secondary_vrms: None,
            trailer_id: None,
            tech_record,
            old_status: None,
        }
    }
}

/// Aggregate to write plus the identifiers whose uniqueness must be checked first.
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub record: VehicleRecord,
    pub changed_vrm: Option<String>,
    pub changed_trailer_id: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LifecycleEngine {
    stamper: AuditStamper,
    completeness: CompletenessClassifier,
}

impl LifecycleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a draft vehicle before any identifier is allocated for it.
    pub fn validate_new(&self, draft: &VehicleRecord) -> Result<VehicleTypeProcessor, TechRecordError> {
        let version = sole_version(draft)?;
        let processor = VehicleTypeProcessor::for_version(version);
        let messages = processor.validate(draft, version, ValidationMode::Create);
        if messages.is_empty() {
            Ok(processor)
        } else {
            Err(TechRecordError::Validation(messages))
        }
    }

    /// Finishes a validated draft whose identifiers have been assigned.
    pub fn create(&self, mut vehicle: VehicleRecord, ctx: &AuditContext) -> Result<VehicleRecord, TechRecordError> {
        let version = sole_version(&vehicle)?.clone();
        let processor = VehicleTypeProcessor::for_version(&version);

        let version = processor.derive_fields(version);
        let version = self.stamper.stamp_created(version, ctx);
        vehicle.partial_vin = partial_vin(&vehicle.vin);
        let version = self.with_completeness(&vehicle, version);
        vehicle.tech_records = vec![version];
        vehicle.revision = 0;

        ensure_status_invariant(&vehicle)?;
        Ok(vehicle)
    }

    /// Supersedes one live version with an amended copy.
    pub fn update(
        &self,
        stored: &VehicleRecord,
        amendment: Amendment,
        ctx: &AuditContext,
    ) -> Result<UpdatePlan, TechRecordError> {
        let next_status = amendment.tech_record.status_code;
        if amendment.old_status == Some(TechRecordStatus::Archived)
            || next_status == TechRecordStatus::Archived
        {
            return Err(TechRecordError::State(
                "archived tech records cannot be updated; use the archive operation".to_string(),
            ));
        }
        if amendment.old_status == Some(TechRecordStatus::Removed)
            || next_status == TechRecordStatus::Removed
        {
            return Err(TechRecordError::State(
                "removed tech records cannot be updated".to_string(),
            ));
        }
        if amendment.old_status == Some(TechRecordStatus::Current)
            && next_status == TechRecordStatus::Provisional
        {
            return Err(demotion_error());
        }

        let target_index = match amendment.old_status {
            Some(status) => single_with_status(stored, status)?,
            None => single_live(stored)?,
        };
        let target = &stored.tech_records[target_index];

        if target.status_code == TechRecordStatus::Current
            && next_status == TechRecordStatus::Provisional
        {
            return Err(demotion_error());
        }
        if next_status == TechRecordStatus::Current
            && target.status_code != TechRecordStatus::Current
            && stored.count_status(TechRecordStatus::Current) > 0
        {
            return Err(TechRecordError::State(
                "vehicle already has a current tech record; promote the provisional record instead"
                    .to_string(),
            ));
        }
        ensure_same_type(target, &amendment.tech_record)?;

        let mut identity = VehicleRecord {
            tech_records: Vec::new(),
            ..stored.clone()
        };
        let mut notes = Vec::new();

        if let Some(secondary) = amendment.secondary_vrms {
            identity.secondary_vrms = secondary.iter().map(|vrm| normalize_identifier(vrm)).collect();
        }

        let changed_vrm = amendment
            .primary_vrm
            .as_deref()
            .map(normalize_identifier)
            .filter(|vrm| identity.primary_vrm.as_deref() != Some(vrm.as_str()));
        if let Some(vrm) = &changed_vrm {
            if let Some(previous) = identity.primary_vrm.replace(vrm.clone()) {
                notes.push(format!("VRM updated from {previous} to {vrm}."));
                if !identity.secondary_vrms.contains(&previous) {
                    identity.secondary_vrms.push(previous);
                }
            }
            identity.secondary_vrms.retain(|secondary| secondary != vrm);
        }

        let changed_trailer_id = match amendment.trailer_id.as_deref().map(normalize_identifier) {
            Some(_) if !target.vehicle_type().is_trailer() => {
                return Err(TechRecordError::validation(
                    "trailerId is only valid for trailers",
                ));
            }
            Some(trailer_id) if identity.trailer_id.as_deref() != Some(trailer_id.as_str()) => {
                if let Some(previous) = identity.trailer_id.replace(trailer_id.clone()) {
                    notes.push(format!("Trailer Id updated from {previous} to {trailer_id}."));
                }
                Some(trailer_id)
            }
            _ => None,
        };

        let processor = VehicleTypeProcessor::for_version(target);
        let messages = processor.validate(&identity, &amendment.tech_record, ValidationMode::Update);
        if !messages.is_empty() {
            return Err(TechRecordError::Validation(messages));
        }

        let mut version = processor.derive_fields(amendment.tech_record);
        if !notes.is_empty() {
            let reason = version.reason_for_creation.take().unwrap_or_default();
            version.reason_for_creation = Some(format!("{} {}", notes.join(" "), reason).trim().to_string());
        }

        let update_type = self.stamper.classify_update(target, &version);
        let archived = self.stamper.stamp_superseded(
            target.clone().with_status(TechRecordStatus::Archived),
            ctx,
            update_type,
        );
        let version = self.stamper.stamp_created(version, ctx);
        let version = self.with_completeness(&identity, version);

        let mut record = identity;
        record.tech_records = stored.tech_records.clone();
        record.tech_records[target_index] = archived;
        record.tech_records.push(version);

        ensure_status_invariant(&record)?;
        Ok(UpdatePlan {
            record,
            changed_vrm,
            changed_trailer_id,
        })
    }

    /// Clones the provisional version forward at `target` status, marking the provisional
    /// version removed and archiving a superseded current version. `Ok(None)` means there is
    /// nothing to promote.
    pub fn promote(
        &self,
        stored: &VehicleRecord,
        target: TechRecordStatus,
        ctx: &AuditContext,
    ) -> Result<Option<VehicleRecord>, TechRecordError> {
        if !target.is_live() {
            return Err(TechRecordError::State(format!(
                "cannot promote a tech record to {target}"
            )));
        }

        let provisional = at_most_one(stored, TechRecordStatus::Provisional)?;
        let current = at_most_one(stored, TechRecordStatus::Current)?;

        let Some(provisional) = provisional else {
            return match current {
                Some(_) => Ok(None),
                None => Err(TechRecordError::State(
                    "no provisional or current tech record found to promote".to_string(),
                )),
            };
        };

        let source = &stored.tech_records[provisional];
        let mut record = stored.clone();
        record.tech_records[provisional] = self.stamper.stamp_superseded(
            source.clone().with_status(TechRecordStatus::Removed),
            ctx,
            UpdateType::TechRecordUpdate,
        );

        if target == TechRecordStatus::Current {
            if let Some(current) = current {
                record.tech_records[current] = self.stamper.stamp_superseded(
                    stored.tech_records[current]
                        .clone()
                        .with_status(TechRecordStatus::Archived),
                    ctx,
                    UpdateType::TechRecordUpdate,
                );
            }
        }

        let promoted = self
            .stamper
            .stamp_created(source.clone().with_status(target), ctx);
        let promoted = self.with_completeness(&record, promoted);
        record.tech_records.push(promoted);

        ensure_status_invariant(&record)?;
        Ok(Some(record))
    }

    /// Archives the single version carrying the submitted version's status.
    ///
    /// The submitted version must equal the stored one exactly, so an edit the caller has not
    /// applied through an update is never silently dropped by archiving.
    pub fn archive(
        &self,
        stored: &VehicleRecord,
        submitted: &TechRecordVersion,
        reason: &str,
        ctx: &AuditContext,
    ) -> Result<VehicleRecord, TechRecordError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TechRecordError::validation("reasonForArchiving is required"));
        }

        let index = single_with_status(stored, submitted.status_code)?;
        let existing = &stored.tech_records[index];
        if !existing.status_code.is_live() {
            return Err(TechRecordError::State(format!(
                "tech record is already {}",
                existing.status_code
            )));
        }
        if existing != submitted {
            return Err(TechRecordError::State(
                "submitted tech record does not match the stored record; apply pending changes before archiving"
                    .to_string(),
            ));
        }

        let mut archived = self.stamper.stamp_superseded(
            existing.clone().with_status(TechRecordStatus::Archived),
            ctx,
            UpdateType::TechRecordUpdate,
        );
        archived.details = archived.details.with_note(reason);

        let mut record = stored.clone();
        record.tech_records[index] = archived;

        ensure_status_invariant(&record)?;
        Ok(record)
    }

    /// Adds a provisional version alongside a vehicle's single existing version.
    pub fn add_provisional(
        &self,
        stored: &VehicleRecord,
        candidate: TechRecordVersion,
        ctx: &AuditContext,
    ) -> Result<VehicleRecord, TechRecordError> {
        if candidate.status_code != TechRecordStatus::Provisional {
            return Err(TechRecordError::State(
                "only provisional tech records can be added".to_string(),
            ));
        }
        let [existing] = stored.tech_records.as_slice() else {
            return Err(TechRecordError::State(
                "a provisional tech record can only be added to a vehicle with exactly one tech record"
                    .to_string(),
            ));
        };
        if existing.status_code == TechRecordStatus::Provisional {
            return Err(TechRecordError::State(
                "vehicle already has a provisional tech record".to_string(),
            ));
        }
        ensure_same_type(existing, &candidate)?;

        let processor = VehicleTypeProcessor::for_version(existing);
        let messages = processor.validate(stored, &candidate, ValidationMode::Create);
        if !messages.is_empty() {
            return Err(TechRecordError::Validation(messages));
        }

        let version = processor.derive_fields(candidate);
        let version = self.stamper.stamp_created(version, ctx);
        let version = self.with_completeness(stored, version);

        let mut record = stored.clone();
        record.tech_records.push(version);

        ensure_status_invariant(&record)?;
        Ok(record)
    }

    /// Sets the EU vehicle category on the only live version. `Ok(None)` when a category is
    /// already present.
    pub fn update_eu_vehicle_category(
        &self,
        stored: &VehicleRecord,
        category: EuVehicleCategory,
        ctx: &AuditContext,
    ) -> Result<Option<VehicleRecord>, TechRecordError> {
        let index = single_live(stored)?;
        let existing = &stored.tech_records[index];
        if existing.eu_vehicle_category.is_some() {
            return Ok(None);
        }

        let archived = self.stamper.stamp_superseded(
            existing.clone().with_status(TechRecordStatus::Archived),
            ctx,
            UpdateType::TechRecordUpdate,
        );

        let mut version = existing.clone();
        version.eu_vehicle_category = Some(category);
        version.reason_for_creation = Some("EU vehicle category updated.".to_string());
        let version = self.stamper.stamp_created(version, ctx);
        let version = self.with_completeness(stored, version);

        let mut record = stored.clone();
        record.tech_records[index] = archived;
        record.tech_records.push(version);

        ensure_status_invariant(&record)?;
        Ok(Some(record))
    }

    fn with_completeness(&self, vehicle: &VehicleRecord, mut version: TechRecordVersion) -> TechRecordVersion {
        version.record_completeness = Some(self.completeness.classify(vehicle, &version));
        version
    }
}

/// At most one current and at most one provisional version per vehicle.
pub fn status_invariant_holds(record: &VehicleRecord) -> bool {
    record.count_status(TechRecordStatus::Current) <= 1
        && record.count_status(TechRecordStatus::Provisional) <= 1
}

/// Upper-cases and strips whitespace from a VRM or trailer ID.
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

fn ensure_status_invariant(record: &VehicleRecord) -> Result<(), TechRecordError> {
    if status_invariant_holds(record) {
        Ok(())
    } else {
        Err(TechRecordError::Internal(format!(
            "vehicle {} would hold more than one current or provisional tech record",
            record.system_number
        )))
    }
}

fn ensure_same_type(existing: &TechRecordVersion, next: &TechRecordVersion) -> Result<(), TechRecordError> {
    if existing.vehicle_type() == next.vehicle_type() {
        Ok(())
    } else {
        Err(TechRecordError::State(format!(
            "vehicle type cannot change from {} to {}",
            existing.vehicle_type(),
            next.vehicle_type()
        )))
    }
}

fn demotion_error() -> TechRecordError {
    TechRecordError::State("a current tech record cannot be changed to provisional".to_string())
}

fn sole_version(vehicle: &VehicleRecord) -> Result<&TechRecordVersion, TechRecordError> {
    match vehicle.tech_records.as_slice() {
        [version] => Ok(version),
        _ => Err(TechRecordError::validation(
            "a new vehicle must carry exactly one tech record",
        )),
    }
}

fn single_with_status(stored: &VehicleRecord, status: TechRecordStatus) -> Result<usize, TechRecordError> {
    match stored.versions_with_status(status).as_slice() {
        [index] => Ok(*index),
        [] => Err(TechRecordError::NotFound(format!(
            "no {status} tech record found for system number {}",
            stored.system_number
        ))),
        _ => Err(TechRecordError::AmbiguousState(format!(
            "more than one {status} tech record found for system number {}",
            stored.system_number
        ))),
    }
}

fn single_live(stored: &VehicleRecord) -> Result<usize, TechRecordError> {
    match stored.live_versions().as_slice() {
        [index] => Ok(*index),
        [] => Err(TechRecordError::State(format!(
            "no non-archived tech record found for system number {}",
            stored.system_number
        ))),
        _ => Err(TechRecordError::AmbiguousState(format!(
            "more than one non-archived tech record found for system number {}",
            stored.system_number
        ))),
    }
}

fn at_most_one(stored: &VehicleRecord, status: TechRecordStatus) -> Result<Option<usize>, TechRecordError> {
    match stored.versions_with_status(status).as_slice() {
        [] => Ok(None),
        [index] => Ok(Some(*index)),
        _ => Err(TechRecordError::AmbiguousState(format!(
            "more than one {status} tech record found for system number {}",
            stored.system_number
        ))),
    }
}
