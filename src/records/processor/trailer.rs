use super::super::constraints::{has_text, optional, ConstraintSet, RecordSubject};
use super::super::domain::{TechRecordVersion, TrlFields, VehicleDetails};
use super::super::identifier::is_trailer_id;
use super::{hgv, lookup, structural_core, ValidationMode};

fn trailer<'a>(subject: &RecordSubject<'a>) -> Option<&'a TrlFields> {
    subject.version.details.as_trailer()
}

pub(super) fn validate(subject: &RecordSubject<'_>, mode: ValidationMode) -> Vec<String> {
    let mut messages = ConstraintSet::new()
        .require("vehicleConfiguration", "is not a recognised configuration", |subject| {
            optional(&subject.version.vehicle_configuration, |configuration| {
                hgv::CONFIGURATIONS.contains(&configuration.to_ascii_lowercase().as_str())
            })
        })
        .require("bodyType.description", "is not a recognised body type", |subject| {
            trailer(subject).map_or(true, |fields| {
                optional(&fields.body_type.description, |description| {
                    lookup::body_type_code(description).is_some()
                })
            })
        })
        .require("weights", "must be at most 99999", |subject| {
            trailer(subject).map_or(true, |fields| {
                [fields.gross_gb_weight, fields.gross_design_weight]
                    .iter()
                    .all(|weight| optional(weight, |kg| *kg <= 99_999))
            })
        })
        .require("couplingType", "must be a single letter", |subject| {
            trailer(subject).map_or(true, |fields| {
                optional(&fields.coupling_type, |coupling| {
                    coupling.chars().count() == 1
                        && coupling.chars().all(|c| c.is_ascii_alphabetic())
                })
            })
        })
        .require("regulatoryDetails", "must be an object", |subject| {
            trailer(subject).map_or(true, |fields| {
                optional(&fields.regulatory_details, |details| details.is_object())
            })
        })
        .violations(subject);

    // Trailer IDs are generated on create; amendments may carry a corrected one.
    if mode == ValidationMode::Update {
        messages.extend(
            ConstraintSet::new()
                .require(
                    "trailerId",
                    "must be 8 digits or a letter followed by 6 digits",
                    |subject| optional(&subject.vehicle.trailer_id, |id| is_trailer_id(id)),
                )
                .violations(subject),
        );
    }

    messages
}

pub(super) fn derive_fields(mut version: TechRecordVersion) -> TechRecordVersion {
    if let VehicleDetails::Trl(fields) | VehicleDetails::SmallTrl(fields) = &mut version.details {
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
            trailer(subject).is_some_and(|fields| has_text(&fields.body_type.description))
        })
        .require("grossGbWeight", "is required", |subject| {
            trailer(subject).is_some_and(|fields| fields.gross_gb_weight.is_some())
        })
        .require("grossDesignWeight", "is required", |subject| {
            trailer(subject).is_some_and(|fields| fields.gross_design_weight.is_some())
        })
        .require("couplingType", "is required", |subject| {
            trailer(subject).is_some_and(|fields| has_text(&fields.coupling_type))
        })
        .require("firstUseDate", "is required", |subject| {
            trailer(subject).is_some_and(|fields| fields.first_use_date.is_some())
        })
        .require("brakes.loadSensingValve", "is required", |subject| {
            trailer(subject).is_some_and(|fields| fields.brakes.load_sensing_valve.is_some())
        })
        .require("approvalType", "is required", |subject| {
            trailer(subject).is_some_and(|fields| has_text(&fields.approval_type))
        })
        .require("manufactureYear", "is required", |subject| {
            subject.version.manufacture_year.is_some()
        })
}
