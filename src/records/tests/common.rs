use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::config::RecordsConfig;
use crate::records::audit::AuditContext;
use crate::records::domain::{
    Axle, BodyType, Brakes, HgvFields, LightVehicleFields, PsvBrakes, PsvFields, SystemNumber,
    TechRecordStatus, TechRecordVersion, TrlFields, UserDetails, VehicleClass, VehicleDetails,
    VehicleRecord,
};
use crate::records::identifier::LookupStrategy;
use crate::records::repository::{GeneratorError, NumberGenerator, RecordStore, RepositoryError};
use crate::records::service::{NewVehicle, TechRecordService};

pub(super) fn user() -> UserDetails {
    UserDetails {
        id: "oid-123".to_string(),
        name: "Jane Examiner".to_string(),
    }
}

pub(super) fn ctx() -> AuditContext {
    AuditContext::at(
        user(),
        Utc.with_ymd_and_hms(2024, 5, 14, 8, 0, 0)
            .single()
            .expect("valid timestamp"),
    )
}

pub(super) fn later_ctx() -> AuditContext {
    AuditContext::at(
        user(),
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp"),
    )
}

pub(super) fn records_config() -> RecordsConfig {
    RecordsConfig {
        write_attempts: 3,
        retry_backoff_ms: 0,
        trailer_id_prefix: 'C',
        system_number_start: 10_000_000,
    }
}

fn axles(count: u8) -> Vec<Axle> {
    (1..=count)
        .map(|number| Axle {
            axle_number: Some(number),
            parking_brake_mrk: Some(number == 1),
            gb_weight: Some(7_500),
            design_weight: Some(8_000),
            tyre_size: Some("295/80-22.5".to_string()),
        })
        .collect()
}

/// Every core and non-core PSV field populated.
pub(super) fn psv_version() -> TechRecordVersion {
    let mut version = TechRecordVersion::new(VehicleDetails::Psv(PsvFields {
        body_type: BodyType {
            description: Some("single decker".to_string()),
            code: None,
        },
        seats_lower_deck: Some(45),
        seats_upper_deck: Some(0),
        standing_capacity: Some(20),
        brakes: PsvBrakes {
            brake_code: Some("178202".to_string()),
            ..PsvBrakes::default()
        },
        gross_kerb_weight: Some(11_000),
        gross_gb_weight: Some(18_000),
        gross_design_weight: Some(19_000),
        approval_type: Some("NTA".to_string()),
        notes: None,
    }));
    version.reason_for_creation = Some("new vehicle".to_string());
    version.vehicle_configuration = Some("rigid".to_string());
    version.vehicle_class = VehicleClass {
        description: Some("large psv(ie: greater than 23 seats)".to_string()),
        code: None,
    };
    version.no_of_axles = Some(2);
    version.axles = axles(2);
    version.manufacture_year = Some(2019);
    version
}

/// Core HGV fields only, so the record grades testable.
pub(super) fn hgv_version() -> TechRecordVersion {
    let mut version = TechRecordVersion::new(VehicleDetails::Hgv(HgvFields {
        body_type: BodyType {
            description: Some("box".to_string()),
            code: None,
        },
        gross_gb_weight: Some(26_000),
        ..HgvFields::default()
    }));
    version.reason_for_creation = Some("new vehicle".to_string());
    version.vehicle_configuration = Some("rigid".to_string());
    version.vehicle_class = VehicleClass {
        description: Some("heavy goods vehicle".to_string()),
        code: None,
    };
    version.no_of_axles = Some(3);
    version
}

pub(super) fn trailer_version() -> TechRecordVersion {
    let mut version = TechRecordVersion::new(VehicleDetails::Trl(TrlFields {
        body_type: BodyType {
            description: Some("flat".to_string()),
            code: None,
        },
        gross_gb_weight: Some(24_000),
        gross_design_weight: Some(24_000),
        coupling_type: Some("F".to_string()),
        first_use_date: chrono::NaiveDate::from_ymd_opt(2020, 3, 1),
        brakes: Brakes {
            load_sensing_valve: Some(true),
            ..Brakes::default()
        },
        approval_type: Some("ECTA".to_string()),
        ..TrlFields::default()
    }));
    version.reason_for_creation = Some("new trailer".to_string());
    version.vehicle_configuration = Some("semi-trailer".to_string());
    version.vehicle_class = VehicleClass {
        description: Some("trailer".to_string()),
        code: None,
    };
    version.no_of_axles = Some(3);
    version.manufacture_year = Some(2020);
    version
}

pub(super) fn car_version() -> TechRecordVersion {
    let mut version = TechRecordVersion::new(VehicleDetails::Car(LightVehicleFields {
        vehicle_subclass: vec!["c".to_string()],
        remarks: None,
    }));
    version.reason_for_creation = Some("new car".to_string());
    version.vehicle_configuration = Some("other".to_string());
    version.vehicle_class = VehicleClass {
        description: Some("not applicable".to_string()),
        code: None,
    };
    version.no_of_axles = Some(2);
    version
}

pub(super) fn new_vehicle(tech_record: TechRecordVersion) -> NewVehicle {
    NewVehicle {
        vin: "ABCDEFGH123456".to_string(),
        primary_vrm: Some("AB12CDE".to_string()),
        secondary_vrms: Vec::new(),
        tech_record,
    }
}

/// A stored aggregate with the given version statuses, built without the service.
pub(super) fn stored_vehicle(number: &str, versions: Vec<TechRecordVersion>) -> VehicleRecord {
    VehicleRecord {
        system_number: SystemNumber(number.to_string()),
        vin: format!("VIN{number}XYZ"),
        partial_vin: String::new(),
        primary_vrm: Some(format!("VRM{}", &number[number.len().saturating_sub(3)..])),
        secondary_vrms: Vec::new(),
        trailer_id: None,
        tech_records: versions,
        revision: 0,
    }
}

pub(super) fn statuses(record: &VehicleRecord) -> Vec<TechRecordStatus> {
    record
        .tech_records
        .iter()
        .map(|version| version.status_code)
        .collect()
}

pub(super) fn build_service() -> (
    TechRecordService<MemoryStore, SequenceNumbers>,
    Arc<MemoryStore>,
) {
    let store = Arc::new(MemoryStore::default());
    let service = TechRecordService::new(
        store.clone(),
        Arc::new(SequenceNumbers::default()),
        records_config(),
    );
    (service, store)
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    pub(super) records: Arc<Mutex<BTreeMap<SystemNumber, VehicleRecord>>>,
}

impl MemoryStore {
    pub(super) fn seed(&self, record: VehicleRecord) {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .insert(record.system_number.clone(), record);
    }

    pub(super) fn fetch(&self, system_number: &str) -> Option<VehicleRecord> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .get(&SystemNumber(system_number.to_string()))
            .cloned()
    }
}

fn matches_partial_vin(pattern: &str, partial_vin: &str) -> bool {
    pattern.chars().count() == partial_vin.chars().count()
        && pattern
            .chars()
            .zip(partial_vin.chars())
            .all(|(wanted, actual)| wanted == '*' || wanted == actual)
}

impl RecordStore for MemoryStore {
    fn find_by_identifier(
        &self,
        term: &str,
        strategy: LookupStrategy,
    ) -> Result<Vec<VehicleRecord>, RepositoryError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| match strategy {
                LookupStrategy::SystemNumber => record.system_number.as_str() == term,
                LookupStrategy::Vin => record.vin == term,
                LookupStrategy::PartialVin => matches_partial_vin(term, &record.partial_vin),
                LookupStrategy::Vrm => {
                    record.primary_vrm.as_deref() == Some(term)
                        || record.secondary_vrms.iter().any(|vrm| vrm == term)
                }
                LookupStrategy::TrailerId => record.trailer_id.as_deref() == Some(term),
            })
            .cloned()
            .collect())
    }

    fn create(&self, record: VehicleRecord) -> Result<VehicleRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&record.system_number)
            || guard.values().any(|existing| existing.vin == record.vin)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.system_number.clone(), record.clone());
        Ok(record)
    }

    fn replace(
        &self,
        mut record: VehicleRecord,
        expected_revision: u64,
    ) -> Result<VehicleRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let stored = guard
            .get(&record.system_number)
            .ok_or(RepositoryError::NotFound)?;
        if stored.revision != expected_revision {
            return Err(RepositoryError::StaleRevision);
        }
        record.revision = expected_revision + 1;
        guard.insert(record.system_number.clone(), record.clone());
        Ok(record)
    }
}

/// Bumps the stored revision behind the caller's back for the first `remaining` writes.
#[derive(Clone)]
pub(super) struct ContendedStore {
    pub(super) inner: MemoryStore,
    remaining: Arc<AtomicUsize>,
    pub(super) replace_calls: Arc<AtomicUsize>,
}

impl ContendedStore {
    pub(super) fn new(inner: MemoryStore, contended_writes: usize) -> Self {
        Self {
            inner,
            remaining: Arc::new(AtomicUsize::new(contended_writes)),
            replace_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl RecordStore for ContendedStore {
    fn find_by_identifier(
        &self,
        term: &str,
        strategy: LookupStrategy,
    ) -> Result<Vec<VehicleRecord>, RepositoryError> {
        self.inner.find_by_identifier(term, strategy)
    }

    fn create(&self, record: VehicleRecord) -> Result<VehicleRecord, RepositoryError> {
        self.inner.create(record)
    }

    fn replace(
        &self,
        record: VehicleRecord,
        expected_revision: u64,
    ) -> Result<VehicleRecord, RepositoryError> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        let contended = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if contended {
            let mut guard = self.inner.records.lock().expect("store mutex poisoned");
            if let Some(stored) = guard.get_mut(&record.system_number) {
                stored.revision += 1;
            }
        }
        self.inner.replace(record, expected_revision)
    }
}

pub(super) struct UnavailableStore;

impl RecordStore for UnavailableStore {
    fn find_by_identifier(
        &self,
        _term: &str,
        _strategy: LookupStrategy,
    ) -> Result<Vec<VehicleRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn create(&self, _record: VehicleRecord) -> Result<VehicleRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace(
        &self,
        _record: VehicleRecord,
        _expected_revision: u64,
    ) -> Result<VehicleRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct SequenceNumbers {
    system_numbers: AtomicU64,
    trailer_ids: AtomicU64,
}

impl Default for SequenceNumbers {
    fn default() -> Self {
        Self {
            system_numbers: AtomicU64::new(10_000_000),
            trailer_ids: AtomicU64::new(1),
        }
    }
}

impl NumberGenerator for SequenceNumbers {
    fn next_system_number(&self) -> Result<SystemNumber, GeneratorError> {
        let next = self.system_numbers.fetch_add(1, Ordering::SeqCst);
        Ok(SystemNumber(next.to_string()))
    }

    fn next_trailer_id(&self) -> Result<String, GeneratorError> {
        let next = self.trailer_ids.fetch_add(1, Ordering::SeqCst);
        Ok(format!("C{next:06}"))
    }
}

pub(super) struct ExhaustedNumbers;

impl NumberGenerator for ExhaustedNumbers {
    fn next_system_number(&self) -> Result<SystemNumber, GeneratorError> {
        Err(GeneratorError::Unavailable {
            kind: "system number",
            reason: "sequence exhausted".to_string(),
        })
    }

    fn next_trailer_id(&self) -> Result<String, GeneratorError> {
        Err(GeneratorError::Unavailable {
            kind: "trailer id",
            reason: "sequence exhausted".to_string(),
        })
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
