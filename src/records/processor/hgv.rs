use super::super::constraints::{
    has_text, is_alphanumeric, length_between, optional, ConstraintSet, RecordSubject,
};
use super::super::domain::{HgvFields, TechRecordVersion, VehicleDetails};
use super::{lookup, structural_core, ValidationMode};

pub(super) const CONFIGURATIONS: [&str; 9] = [
    "rigid",
    "articulated",
    "centre axle drawbar",
    "semi-car transporter",
    "semi-trailer",
    "low loader",
    "drawbar",
    "four-in-line",
    "other",
];

fn hgv<'a>(subject: &RecordSubject<'a>) -> Option<&'a HgvFields> {
    subject.version.details.as_hgv()
}

pub(super) fn validate(subject: &RecordSubject<'_>, _mode: ValidationMode) -> Vec<String> {
    ConstraintSet::new()
        .require("vehicleConfiguration", "is not a recognised configuration", |subject| {
            optional(&subject.version.vehicle_configuration, |configuration| {
                CONFIGURATIONS.contains(&configuration.to_ascii_lowercase().as_str())
            })
        })
        .require("bodyType.description", "is not a recognised body type", |subject| {
            hgv(subject).map_or(true, |fields| {
                optional(&fields.body_type.description, |description| {
                    lookup::body_type_code(description).is_some()
                })
            })
        })
        .require("weights", "must be at most 99999", |subject| {
            hgv(subject).map_or(true, |fields| {
                [
                    fields.gross_gb_weight,
                    fields.gross_design_weight,
                    fields.train_gb_weight,
                    fields.max_train_gb_weight,
                ]
                .iter()
                .all(|weight| optional(weight, |kg| *kg <= 99_999))
            })
        })
        .require("tyreUseCode", "must be 1 or 2 alphanumeric characters", |subject| {
            hgv(subject).map_or(true, |fields| {
                optional(&fields.tyre_use_code, |code| {
                    is_alphanumeric(code) && length_between(code, 1, 2)
                })
            })
        })
        .require("regulatoryDetails", "must be an object", |subject| {
            hgv(subject).map_or(true, |fields| {
                optional(&fields.regulatory_details, |details| details.is_object())
            })
        })
        .violations(subject)
}

pub(super) fn derive_fields(mut version: TechRecordVersion) -> TechRecordVersion {
    if let VehicleDetails::Hgv(fields) = &mut version.details {
        if let Some(code) = fields
            .body_type
            .description
            .as_deref()
            .and_then(lookup::body_type_code)
        {
            fields.body_type.code = Some(code.to_string());
        }
    }
    version
}

pub(super) fn core_constraints() -> ConstraintSet {
    structural_core()
}

pub(super) fn non_core_constraints() -> ConstraintSet {
    ConstraintSet::new()
        .require("bodyType.description", "is required", |subject| {
            hgv(subject).is_some_and(|fields| has_text(&fields.body_type.description))
        })
        .require("grossGbWeight", "is required", |subject| {
            hgv(subject).is_some_and(|fields| fields.gross_gb_weight.is_some())
        })
        .require("grossDesignWeight", "is required", |subject| {
            hgv(subject).is_some_and(|fields| fields.gross_design_weight.is_some())
        })
        .require("trainGbWeight", "is required", |subject| {
            hgv(subject).is_some_and(|fields| fields.train_gb_weight.is_some())
        })
        .require("tyreUseCode", "is required", |subject| {
            hgv(subject).is_some_and(|fields| has_text(&fields.tyre_use_code))
        })
        .require("brakes.antilockBrakingSystem", "is required", |subject| {
            hgv(subject).is_some_and(|fields| fields.brakes.antilock_braking_system.is_some())
        })
        .require("approvalType", "is required", |subject| {
            hgv(subject).is_some_and(|fields| has_text(&fields.approval_type))
        })
        .require("manufactureYear", "is required", |subject| {
            subject.version.manufacture_year.is_some()
        })
}
