use super::super::constraints::{
    has_text, is_alphanumeric, length_between, optional, ConstraintSet, RecordSubject,
};
use super::super::domain::{PsvFields, TechRecordVersion, VehicleDetails};
use super::{lookup, structural_core, ValidationMode};

const CONFIGURATIONS: [&str; 2] = ["rigid", "articulated"];

fn psv<'a>(subject: &RecordSubject<'a>) -> Option<&'a PsvFields> {
    subject.version.details.as_psv()
}

pub(super) fn validate(subject: &RecordSubject<'_>, _mode: ValidationMode) -> Vec<String> {
    ConstraintSet::new()
        .require("vehicleConfiguration", "must be rigid or articulated", |subject| {
            optional(&subject.version.vehicle_configuration, |configuration| {
                CONFIGURATIONS.contains(&configuration.to_ascii_lowercase().as_str())
            })
        })
        .require("bodyType.description", "is not a recognised body type", |subject| {
            psv(subject).map_or(true, |fields| {
                optional(&fields.body_type.description, |description| {
                    lookup::body_type_code(description).is_some()
                })
            })
        })
        .require("seats", "must be at most 999", |subject| {
            psv(subject).map_or(true, |fields| {
                [
                    fields.seats_lower_deck,
                    fields.seats_upper_deck,
                    fields.standing_capacity,
                ]
                .iter()
                .all(|seats| optional(seats, |count| *count <= 999))
            })
        })
        .require("brakes.brakeCode", "must be 1 to 6 alphanumeric characters", |subject| {
            psv(subject).map_or(true, |fields| {
                optional(&fields.brakes.brake_code, |code| {
                    is_alphanumeric(code) && length_between(code, 1, 6)
                })
            })
        })
        .require("weights", "must be at most 99999", |subject| {
            psv(subject).map_or(true, |fields| {
                [
                    fields.gross_kerb_weight,
                    fields.gross_gb_weight,
                    fields.gross_design_weight,
                ]
                .iter()
                .all(|weight| optional(weight, |kg| *kg <= 99_999))
            })
        })
        .violations(subject)
}

pub(super) fn derive_fields(mut version: TechRecordVersion) -> TechRecordVersion {
    if let VehicleDetails::Psv(fields) = &mut version.details {
        if let Some(code) = fields
            .body_type
            .description
            .as_deref()
            .and_then(lookup::body_type_code)
        {
            fields.body_type.code = Some(code.to_string());
        }
        if let Some(brake_code) = fields.brakes.brake_code.as_deref() {
            fields.brakes.brake_code_original = Some(lookup::brake_code_original(brake_code));
        }
    }
    version
}

pub(super) fn core_constraints() -> ConstraintSet {
    structural_core()
        .require("seatsLowerDeck", "is required", |subject| {
            psv(subject).is_some_and(|fields| fields.seats_lower_deck.is_some())
        })
        .require("seatsUpperDeck", "is required", |subject| {
            psv(subject).is_some_and(|fields| fields.seats_upper_deck.is_some())
        })
}

pub(super) fn non_core_constraints() -> ConstraintSet {
    ConstraintSet::new()
        .require("bodyType.description", "is required", |subject| {
            psv(subject).is_some_and(|fields| has_text(&fields.body_type.description))
        })
        .require("grossKerbWeight", "is required", |subject| {
            psv(subject).is_some_and(|fields| fields.gross_kerb_weight.is_some())
        })
        .require("grossGbWeight", "is required", |subject| {
            psv(subject).is_some_and(|fields| fields.gross_gb_weight.is_some())
        })
        .require("grossDesignWeight", "is required", |subject| {
            psv(subject).is_some_and(|fields| fields.gross_design_weight.is_some())
        })
        .require("brakes.brakeCode", "is required", |subject| {
            psv(subject).is_some_and(|fields| has_text(&fields.brakes.brake_code))
        })
        .require("approvalType", "is required", |subject| {
            psv(subject).is_some_and(|fields| has_text(&fields.approval_type))
        })
        .require("manufactureYear", "is required", |subject| {
            subject.version.manufacture_year.is_some()
        })
}
