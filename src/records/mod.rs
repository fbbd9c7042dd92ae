//! Vehicle technical record lifecycle: identifier resolution, per-type validation,
//! completeness grading, status transitions, and the HTTP surface over them.

pub mod audit;
pub mod completeness;
pub mod constraints;
pub mod domain;
pub mod error;
pub mod identifier;
pub mod lifecycle;
pub mod listing;
pub mod processor;
pub mod repository;
pub mod router;
pub mod service;
pub mod wide;

#[cfg(test)]
mod tests;

pub use audit::{AuditContext, AuditStamper};
pub use completeness::{CompletenessClassifier, CompletenessLayer, CompletenessReport};
pub use domain::{
    Axle, BodyType, Brakes, EuVehicleCategory, HgvFields, LightVehicleFields, MotorcycleFields,
    PsvBrakes, PsvFields, RecordCompleteness, SystemNumber, TechRecordStatus, TechRecordVersion,
    TrlFields, UpdateType, UserDetails, VehicleClass, VehicleDetails, VehicleRecord, VehicleType,
};
pub use error::TechRecordError;
pub use identifier::{classify, LookupStrategy, SearchCriteria};
pub use lifecycle::{Amendment, LifecycleEngine, TestOutcome, UpdatePlan};
pub use listing::{RecordListService, StatusView};
pub use processor::{ValidationMode, VehicleTypeProcessor};
pub use repository::{
    DocumentError, DocumentStore, GeneratorError, NumberGenerator, RecordStore, RepositoryError,
};
pub use router::record_router;
pub use service::{CategoryUpdate, NewVehicle, PromotionOutcome, TechRecordService};
pub use wide::WideRow;
