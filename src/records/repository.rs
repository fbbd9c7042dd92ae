use super::domain::{SystemNumber, VehicleRecord};
use super::identifier::LookupStrategy;

/// Storage abstraction so the lifecycle workflows can be exercised in isolation.
pub trait RecordStore: Send + Sync {
    /// Every vehicle whose identifier for `strategy` matches `term`.
    fn find_by_identifier(
        &self,
        term: &str,
        strategy: LookupStrategy,
    ) -> Result<Vec<VehicleRecord>, RepositoryError>;

    /// Inserts a new aggregate, failing with `Conflict` when its system number or VIN exists.
    fn create(&self, record: VehicleRecord) -> Result<VehicleRecord, RepositoryError>;

    /// Replaces a stored aggregate if its revision still equals `expected_revision`, returning
    /// the stored value with the revision advanced.
    fn replace(
        &self,
        record: VehicleRecord,
        expected_revision: u64,
    ) -> Result<VehicleRecord, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently")]
    StaleRevision,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// External allocator for system numbers and trailer IDs.
pub trait NumberGenerator: Send + Sync {
    fn next_system_number(&self) -> Result<SystemNumber, GeneratorError>;
    fn next_trailer_id(&self) -> Result<String, GeneratorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("{kind} allocator unavailable: {reason}")]
    Unavailable { kind: &'static str, reason: String },
    #[error("{0} allocator returned an empty value")]
    Empty(&'static str),
}

/// Read-only access to stored artifacts such as plate certificates.
pub trait DocumentStore: Send + Sync {
    fn download(&self, name: &str) -> Result<Vec<u8>, DocumentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document {0} not found")]
    NotFound(String),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}
