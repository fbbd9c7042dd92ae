use super::common::*;

use crate::records::audit::AuditStamper;
use crate::records::completeness::{CompletenessClassifier, CompletenessLayer};
use crate::records::domain::{
    MotorcycleFields, RecordCompleteness, TechRecordVersion, TrlFields, VehicleDetails,
};

fn stamped(version: TechRecordVersion) -> TechRecordVersion {
    AuditStamper.stamp_created(version, &ctx())
}

#[test]
fn fully_populated_psv_is_complete() {
    let version = stamped(psv_version());
    let vehicle = stored_vehicle("10000001", vec![version.clone()]);

    let report = CompletenessClassifier.assess(&vehicle, &version);
    assert_eq!(report.grade, RecordCompleteness::Complete);
    assert!(report.failed_layer.is_none());
    assert!(report.missing.is_empty());
}

#[test]
fn missing_non_core_fields_grade_testable() {
    let version = stamped(hgv_version());
    let vehicle = stored_vehicle("10000001", vec![version.clone()]);

    let report = CompletenessClassifier.assess(&vehicle, &version);
    assert_eq!(report.grade, RecordCompleteness::Testable);
    assert_eq!(report.failed_layer, Some(CompletenessLayer::NonCoreMandatory));
    assert!(report
        .missing
        .iter()
        .any(|message| message == "grossDesignWeight is required"));
}

#[test]
fn missing_core_fields_grade_skeleton() {
    let mut version = stamped(psv_version());
    version.no_of_axles = None;
    version.axles.clear();
    let vehicle = stored_vehicle("10000001", vec![version.clone()]);

    let report = CompletenessClassifier.assess(&vehicle, &version);
    assert_eq!(report.grade, RecordCompleteness::Skeleton);
    assert_eq!(report.failed_layer, Some(CompletenessLayer::CoreMandatory));
}

#[test]
fn unstamped_versions_are_skeletons() {
    let version = psv_version();
    let vehicle = stored_vehicle("10000001", vec![version.clone()]);

    assert_eq!(
        CompletenessClassifier.classify(&vehicle, &version),
        RecordCompleteness::Skeleton
    );
}

#[test]
fn identity_failures_short_circuit_before_core_checks() {
    let mut version = stamped(psv_version());
    version.vehicle_configuration = None;
    let mut vehicle = stored_vehicle("10000001", vec![version.clone()]);
    vehicle.primary_vrm = None;

    let report = CompletenessClassifier.assess(&vehicle, &version);
    assert_eq!(report.grade, RecordCompleteness::Skeleton);
    assert_eq!(report.failed_layer, Some(CompletenessLayer::VehicleIdentity));
    assert_eq!(report.missing, vec!["primaryVrm is required".to_string()]);
}

#[test]
fn trailers_need_a_trailer_id_rather_than_a_vrm() {
    let version = stamped(trailer_version());
    let mut vehicle = stored_vehicle("10000001", vec![version.clone()]);
    vehicle.primary_vrm = None;

    let report = CompletenessClassifier.assess(&vehicle, &version);
    assert_eq!(report.failed_layer, Some(CompletenessLayer::VehicleIdentity));
    assert_eq!(report.missing, vec!["trailerId is required".to_string()]);

    vehicle.trailer_id = Some("C000001".to_string());
    assert_eq!(
        CompletenessClassifier.classify(&vehicle, &version),
        RecordCompleteness::Complete
    );
}

#[test]
fn types_without_a_non_core_layer_are_complete_once_core_passes() {
    let car = stamped(car_version());
    let vehicle = stored_vehicle("10000001", vec![car.clone()]);
    assert_eq!(
        CompletenessClassifier.classify(&vehicle, &car),
        RecordCompleteness::Complete
    );

    let mut small_trailer = trailer_version();
    small_trailer.details = VehicleDetails::SmallTrl(TrlFields::default());
    let small_trailer = stamped(small_trailer);
    let vehicle = stored_vehicle("10000002", vec![small_trailer.clone()]);
    assert_eq!(
        CompletenessClassifier.classify(&vehicle, &small_trailer),
        RecordCompleteness::Complete
    );
}

#[test]
fn motorcycles_need_wheels_driven_at_core_level() {
    let mut motorcycle = car_version();
    motorcycle.details = VehicleDetails::Motorcycle(MotorcycleFields::default());
    let motorcycle = stamped(motorcycle);
    let vehicle = stored_vehicle("10000001", vec![motorcycle.clone()]);

    let report = CompletenessClassifier.assess(&vehicle, &motorcycle);
    assert_eq!(report.grade, RecordCompleteness::Skeleton);
    assert_eq!(
        report.missing,
        vec!["numberOfWheelsDriven is required".to_string()]
    );
}
