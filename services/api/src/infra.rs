use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use vehicle_tech_records::config::RecordsConfig;
use vehicle_tech_records::records::wide::{flatten_record, nest_rows};
use vehicle_tech_records::records::{
    DocumentError, DocumentStore, GeneratorError, LookupStrategy, NumberGenerator, RecordStore,
    RepositoryError, SystemNumber, TechRecordError, VehicleRecord, WideRow,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) documents: Arc<InMemoryDocumentStore>,
}

/// Record store that keeps each vehicle as the wide rows a key-value table would hold.
#[derive(Default, Clone)]
pub(crate) struct WideRowStore {
    rows: Arc<Mutex<BTreeMap<String, Vec<WideRow>>>>,
}

impl WideRowStore {
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<WideRow>>>, RepositoryError> {
        self.rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable("record table lock poisoned".to_string()))
    }

    fn load(rows: &[WideRow]) -> Result<VehicleRecord, RepositoryError> {
        nest_rows(rows).map_err(storage_error)
    }
}

fn storage_error(err: TechRecordError) -> RepositoryError {
    RepositoryError::Unavailable(err.to_string())
}

/// Digits must match; any other symbol in the pattern stands for one character.
fn matches_partial_vin(pattern: &str, partial_vin: &str) -> bool {
    pattern.chars().count() == partial_vin.chars().count()
        && pattern
            .chars()
            .zip(partial_vin.chars())
            .all(|(wanted, actual)| !wanted.is_ascii_digit() || wanted == actual)
}

fn matches(vehicle: &VehicleRecord, term: &str, strategy: LookupStrategy) -> bool {
    match strategy {
        LookupStrategy::SystemNumber => vehicle.system_number.as_str() == term,
        LookupStrategy::Vin => vehicle.vin == term,
        LookupStrategy::PartialVin => matches_partial_vin(term, &vehicle.partial_vin),
        LookupStrategy::Vrm => {
            vehicle.primary_vrm.as_deref() == Some(term)
                || vehicle.secondary_vrms.iter().any(|vrm| vrm == term)
        }
        LookupStrategy::TrailerId => vehicle.trailer_id.as_deref() == Some(term),
    }
}

impl RecordStore for WideRowStore {
    fn find_by_identifier(
        &self,
        term: &str,
        strategy: LookupStrategy,
    ) -> Result<Vec<VehicleRecord>, RepositoryError> {
        let guard = self.lock()?;
        let mut found = Vec::new();
        for rows in guard.values() {
            let vehicle = Self::load(rows)?;
            if matches(&vehicle, term, strategy) {
                found.push(vehicle);
            }
        }
        Ok(found)
    }

    fn create(&self, record: VehicleRecord) -> Result<VehicleRecord, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(record.system_number.as_str()) {
            return Err(RepositoryError::Conflict);
        }
        for rows in guard.values() {
            if Self::load(rows)?.vin == record.vin {
                return Err(RepositoryError::Conflict);
            }
        }
        let rows = flatten_record(&record).map_err(storage_error)?;
        guard.insert(record.system_number.as_str().to_string(), rows);
        Ok(record)
    }

    fn replace(
        &self,
        mut record: VehicleRecord,
        expected_revision: u64,
    ) -> Result<VehicleRecord, RepositoryError> {
        let mut guard = self.lock()?;
        let key = record.system_number.as_str().to_string();
        let stored = guard.get(&key).ok_or(RepositoryError::NotFound)?;
        if Self::load(stored)?.revision != expected_revision {
            return Err(RepositoryError::StaleRevision);
        }
        record.revision = expected_revision + 1;
        let rows = flatten_record(&record).map_err(storage_error)?;
        guard.insert(key, rows);
        Ok(record)
    }
}

const TRAILER_SEQUENCE_LIMIT: u64 = 999_999;

/// Process-local allocator seeded from the records configuration.
pub(crate) struct SequenceNumberGenerator {
    system_numbers: AtomicU64,
    trailer_ids: AtomicU64,
    trailer_id_prefix: char,
}

impl SequenceNumberGenerator {
    pub(crate) fn from_config(config: &RecordsConfig) -> Self {
        Self {
            system_numbers: AtomicU64::new(config.system_number_start),
            trailer_ids: AtomicU64::new(1),
            trailer_id_prefix: config.trailer_id_prefix,
        }
    }
}

impl NumberGenerator for SequenceNumberGenerator {
    fn next_system_number(&self) -> Result<SystemNumber, GeneratorError> {
        let next = self.system_numbers.fetch_add(1, Ordering::SeqCst);
        Ok(SystemNumber(next.to_string()))
    }

    fn next_trailer_id(&self) -> Result<String, GeneratorError> {
        let next = self.trailer_ids.fetch_add(1, Ordering::SeqCst);
        if next > TRAILER_SEQUENCE_LIMIT {
            return Err(GeneratorError::Unavailable {
                kind: "trailer id",
                reason: "sequence exhausted".to_string(),
            });
        }
        Ok(format!("{}{next:06}", self.trailer_id_prefix))
    }
}

#[derive(Default)]
pub(crate) struct InMemoryDocumentStore {
    documents: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryDocumentStore {
    /// Loads every regular file in `dir`, keyed by file name. Subdirectories are skipped.
    pub(crate) fn from_dir(dir: &Path) -> Result<Self, DocumentError> {
        let unreadable =
            |err: std::io::Error| DocumentError::Unavailable(format!("{}: {err}", dir.display()));
        let store = Self::default();
        for entry in fs::read_dir(dir).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            store.insert(name, fs::read(&path).map_err(unreadable)?)?;
        }
        Ok(store)
    }

    pub(crate) fn insert(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<(), DocumentError> {
        let mut guard = self.lock()?;
        guard.insert(name.into(), bytes);
        Ok(())
    }

    pub(crate) fn len(&self) -> Result<usize, DocumentError> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>, DocumentError> {
        self.documents
            .lock()
            .map_err(|_| DocumentError::Unavailable("document lock poisoned".to_string()))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn download(&self, name: &str) -> Result<Vec<u8>, DocumentError> {
        self.lock()?
            .get(name)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(name.to_string()))
    }
}
