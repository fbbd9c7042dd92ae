use super::super::constraints::{optional, ConstraintSet, RecordSubject};
use super::super::domain::{LightVehicleFields, MotorcycleFields, TechRecordVersion};
use super::{structural_core, ValidationMode};

const SUBCLASSES: [&str; 11] = ["n", "p", "a", "s", "c", "l", "t", "e", "m", "r", "w"];
const REMARKS_MAX: usize = 1024;

fn light<'a>(subject: &RecordSubject<'a>) -> Option<&'a LightVehicleFields> {
    subject.version.details.as_light()
}

fn motorcycle<'a>(subject: &RecordSubject<'a>) -> Option<&'a MotorcycleFields> {
    subject.version.details.as_motorcycle()
}

pub(super) fn validate(subject: &RecordSubject<'_>, _mode: ValidationMode) -> Vec<String> {
    ConstraintSet::new()
        .require("vehicleSubclass", "entries must be recognised subclass codes", |subject| {
            light(subject).map_or(true, |fields| {
                fields
                    .vehicle_subclass
                    .iter()
                    .all(|subclass| SUBCLASSES.contains(&subclass.as_str()))
            })
        })
        .require("remarks", "must be at most 1024 characters", |subject| {
            light(subject).map_or(true, |fields| {
                optional(&fields.remarks, |remarks| remarks.chars().count() <= REMARKS_MAX)
            })
        })
        .violations(subject)
}

pub(super) fn validate_motorcycle(
    subject: &RecordSubject<'_>,
    _mode: ValidationMode,
) -> Vec<String> {
    ConstraintSet::new()
        .require("numberOfWheelsDriven", "must be at most 9", |subject| {
            motorcycle(subject).map_or(true, |fields| {
                optional(&fields.number_of_wheels_driven, |wheels| *wheels <= 9)
            })
        })
        .require("remarks", "must be at most 1024 characters", |subject| {
            motorcycle(subject).map_or(true, |fields| {
                optional(&fields.remarks, |remarks| remarks.chars().count() <= REMARKS_MAX)
            })
        })
        .violations(subject)
}

pub(super) fn derive_fields(version: TechRecordVersion) -> TechRecordVersion {
    version
}

pub(super) fn core_constraints() -> ConstraintSet {
    structural_core().require("vehicleSubclass", "is required", |subject| {
        light(subject).is_some_and(|fields| !fields.vehicle_subclass.is_empty())
    })
}

pub(super) fn motorcycle_core_constraints() -> ConstraintSet {
    structural_core().require("numberOfWheelsDriven", "is required", |subject| {
        motorcycle(subject).is_some_and(|fields| fields.number_of_wheels_driven.is_some())
    })
}
