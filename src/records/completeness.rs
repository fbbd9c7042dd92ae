use serde::Serialize;

use super::constraints::{has_text, ConstraintSet, RecordSubject};
use super::domain::{RecordCompleteness, TechRecordVersion, VehicleRecord, VehicleType};
use super::processor::VehicleTypeProcessor;

/// Constraint layer that decided a grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletenessLayer {
    VehicleIdentity,
    CoreMandatory,
    NonCoreMandatory,
}

/// Grade plus the messages of the layer that stopped evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletenessReport {
    pub grade: RecordCompleteness,
    pub failed_layer: Option<CompletenessLayer>,
    pub missing: Vec<String>,
}

/// Grades a version by running the identity, core and non-core layers in order and stopping
/// at the first layer that fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompletenessClassifier;

impl CompletenessClassifier {
    pub fn classify(&self, vehicle: &VehicleRecord, version: &TechRecordVersion) -> RecordCompleteness {
        self.assess(vehicle, version).grade
    }

    pub fn assess(&self, vehicle: &VehicleRecord, version: &TechRecordVersion) -> CompletenessReport {
        let subject = RecordSubject::new(vehicle, version);
        let processor = VehicleTypeProcessor::for_version(version);

        let identity = identity_constraints(version.vehicle_type()).violations(&subject);
        if !identity.is_empty() {
            return failed(
                RecordCompleteness::Skeleton,
                CompletenessLayer::VehicleIdentity,
                identity,
            );
        }

        let core = processor.core_constraints().violations(&subject);
        if !core.is_empty() {
            return failed(
                RecordCompleteness::Skeleton,
                CompletenessLayer::CoreMandatory,
                core,
            );
        }

        match processor.non_core_constraints() {
            Some(non_core) => {
                let missing = non_core.violations(&subject);
                if missing.is_empty() {
                    complete()
                } else {
                    failed(
                        RecordCompleteness::Testable,
                        CompletenessLayer::NonCoreMandatory,
                        missing,
                    )
                }
            }
            None => complete(),
        }
    }
}

fn complete() -> CompletenessReport {
    CompletenessReport {
        grade: RecordCompleteness::Complete,
        failed_layer: None,
        missing: Vec::new(),
    }
}

fn failed(
    grade: RecordCompleteness,
    layer: CompletenessLayer,
    missing: Vec<String>,
) -> CompletenessReport {
    CompletenessReport {
        grade,
        failed_layer: Some(layer),
        missing,
    }
}

/// VIN and system number always; a primary VRM for everything except full-size trailers,
/// which need a trailer ID instead.
fn identity_constraints(vehicle_type: VehicleType) -> ConstraintSet {
    let set = ConstraintSet::new()
        .require("vin", "is required", |subject| {
            !subject.vehicle.vin.trim().is_empty()
        })
        .require("systemNumber", "is required", |subject| {
            !subject.vehicle.system_number.as_str().trim().is_empty()
        });

    if vehicle_type == VehicleType::Trl {
        set.require("trailerId", "is required", |subject| {
            has_text(&subject.vehicle.trailer_id)
        })
    } else {
        set.require("primaryVrm", "is required", |subject| {
            has_text(&subject.vehicle.primary_vrm)
        })
    }
}
