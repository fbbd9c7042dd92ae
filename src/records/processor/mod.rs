//! Per-vehicle-type behaviour consumed by the lifecycle engine.
//!
//! Each vehicle type maps to a static strategy table: payload validation, field derivation,
//! the core and non-core completeness constraint sets, and the identifiers it needs at
//! creation. The engine only ever talks to [`VehicleTypeProcessor`].

mod hgv;
mod light;
pub mod lookup;
mod psv;
mod trailer;

use serde_json::Value;

use super::constraints::{
    has_text, is_alphanumeric, length_between, optional, ConstraintSet, RecordSubject,
};
use super::domain::{TechRecordStatus, TechRecordVersion, VehicleRecord, VehicleType};
use super::error::TechRecordError;
use super::repository::{GeneratorError, NumberGenerator};

/// Whether a payload is validated as a brand new record or as an amendment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentifierPlan {
    SystemNumber,
    TrailerId,
    /// Small trailers reuse the trailer ID as their primary VRM.
    TrailerIdAsVrm,
}

type ConstraintFactory = fn() -> ConstraintSet;

struct TypeStrategy {
    validate: fn(&RecordSubject<'_>, ValidationMode) -> Vec<String>,
    derive_fields: fn(TechRecordVersion) -> TechRecordVersion,
    core_constraints: ConstraintFactory,
    non_core_constraints: Option<ConstraintFactory>,
    identifiers: IdentifierPlan,
}

static PSV: TypeStrategy = TypeStrategy {
    validate: psv::validate,
    derive_fields: psv::derive_fields,
    core_constraints: psv::core_constraints,
    non_core_constraints: Some(psv::non_core_constraints as ConstraintFactory),
    identifiers: IdentifierPlan::SystemNumber,
};

static HGV: TypeStrategy = TypeStrategy {
    validate: hgv::validate,
    derive_fields: hgv::derive_fields,
    core_constraints: hgv::core_constraints,
    non_core_constraints: Some(hgv::non_core_constraints as ConstraintFactory),
    identifiers: IdentifierPlan::SystemNumber,
};

static TRL: TypeStrategy = TypeStrategy {
    validate: trailer::validate,
    derive_fields: trailer::derive_fields,
    core_constraints: trailer::core_constraints,
    non_core_constraints: Some(trailer::non_core_constraints as ConstraintFactory),
    identifiers: IdentifierPlan::TrailerId,
};

static SMALL_TRL: TypeStrategy = TypeStrategy {
    validate: trailer::validate,
    derive_fields: trailer::derive_fields,
    core_constraints: trailer::core_constraints,
    non_core_constraints: None,
    identifiers: IdentifierPlan::TrailerIdAsVrm,
};

static LIGHT: TypeStrategy = TypeStrategy {
    validate: light::validate,
    derive_fields: light::derive_fields,
    core_constraints: light::core_constraints,
    non_core_constraints: None,
    identifiers: IdentifierPlan::SystemNumber,
};

static MOTORCYCLE: TypeStrategy = TypeStrategy {
    validate: light::validate_motorcycle,
    derive_fields: light::derive_fields,
    core_constraints: light::motorcycle_core_constraints,
    non_core_constraints: None,
    identifiers: IdentifierPlan::SystemNumber,
};

fn strategy(vehicle_type: VehicleType) -> &'static TypeStrategy {
    match vehicle_type {
        VehicleType::Psv => &PSV,
        VehicleType::Hgv => &HGV,
        VehicleType::Trl => &TRL,
        VehicleType::SmallTrl => &SMALL_TRL,
        VehicleType::Lgv | VehicleType::Car => &LIGHT,
        VehicleType::Motorcycle => &MOTORCYCLE,
    }
}

/// Handle on the strategy table entry for one vehicle type.
#[derive(Clone, Copy)]
pub struct VehicleTypeProcessor {
    vehicle_type: VehicleType,
    strategy: &'static TypeStrategy,
}

impl std::fmt::Debug for VehicleTypeProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VehicleTypeProcessor")
            .field("vehicle_type", &self.vehicle_type)
            .finish()
    }
}

impl VehicleTypeProcessor {
    pub fn new(vehicle_type: VehicleType) -> Self {
        Self {
            vehicle_type,
            strategy: strategy(vehicle_type),
        }
    }

    pub fn for_version(version: &TechRecordVersion) -> Self {
        Self::new(version.vehicle_type())
    }

    /// Factory keyed on a declared vehicle type string.
    pub fn for_type_name(raw: &str) -> Result<Self, TechRecordError> {
        VehicleType::parse(raw)
            .map(Self::new)
            .ok_or_else(|| TechRecordError::InvalidVehicleType(raw.to_string()))
    }

    /// Dispatches a raw tech record payload on its `vehicleType` tag and decodes it.
    pub fn parse_version(payload: Value) -> Result<TechRecordVersion, TechRecordError> {
        let Value::Object(mut fields) = payload else {
            return Err(TechRecordError::validation("techRecord must be an object"));
        };

        let declared = fields
            .get("vehicleType")
            .and_then(Value::as_str)
            .ok_or_else(|| TechRecordError::InvalidVehicleType("missing".to_string()))?
            .to_string();
        let processor = Self::for_type_name(&declared)?;
        fields.insert(
            "vehicleType".to_string(),
            Value::String(processor.vehicle_type.label().to_string()),
        );

        serde_json::from_value(Value::Object(fields))
            .map_err(|err| TechRecordError::validation(format!("techRecord is malformed: {err}")))
    }

    pub fn vehicle_type(&self) -> VehicleType {
        self.vehicle_type
    }

    /// Every validation message for `version` held against `vehicle`'s identity.
    pub fn validate(
        &self,
        vehicle: &VehicleRecord,
        version: &TechRecordVersion,
        mode: ValidationMode,
    ) -> Vec<String> {
        let subject = RecordSubject::new(vehicle, version);
        let mut messages = common_constraints().violations(&subject);
        if mode == ValidationMode::Create {
            messages.extend(create_constraints().violations(&subject));
        }
        if version.vehicle_type() != self.vehicle_type {
            messages.push(format!(
                "vehicleType must be {} for this processor",
                self.vehicle_type
            ));
        }
        messages.extend((self.strategy.validate)(&subject, mode));
        messages
    }

    /// Maps description fields to their short codes.
    pub fn derive_fields(&self, mut version: TechRecordVersion) -> TechRecordVersion {
        if let Some(code) = version
            .vehicle_class
            .description
            .as_deref()
            .and_then(lookup::vehicle_class_code)
        {
            version.vehicle_class.code = Some(code.to_string());
        }
        (self.strategy.derive_fields)(version)
    }

    /// Requests a system number, plus a trailer ID for trailer types.
    pub fn assign_identifiers<N>(
        &self,
        generator: &N,
        mut vehicle: VehicleRecord,
    ) -> Result<VehicleRecord, GeneratorError>
    where
        N: NumberGenerator + ?Sized,
    {
        let system_number = generator.next_system_number()?;
        if system_number.as_str().trim().is_empty() {
            return Err(GeneratorError::Empty("system number"));
        }
        vehicle.system_number = system_number;

        match self.strategy.identifiers {
            IdentifierPlan::SystemNumber => {}
            IdentifierPlan::TrailerId | IdentifierPlan::TrailerIdAsVrm => {
                let trailer_id = generator.next_trailer_id()?;
                if trailer_id.trim().is_empty() {
                    return Err(GeneratorError::Empty("trailer id"));
                }
                if self.strategy.identifiers == IdentifierPlan::TrailerIdAsVrm {
                    vehicle.primary_vrm = Some(trailer_id.clone());
                }
                vehicle.trailer_id = Some(trailer_id);
            }
        }

        Ok(vehicle)
    }

    pub fn core_constraints(&self) -> ConstraintSet {
        (self.strategy.core_constraints)()
    }

    /// `None` for types whose completeness stops at the core layer.
    pub fn non_core_constraints(&self) -> Option<ConstraintSet> {
        self.strategy.non_core_constraints.map(|factory| factory())
    }
}

fn is_vrm(text: &str) -> bool {
    is_alphanumeric(text) && length_between(text, 1, 9)
}

fn common_constraints() -> ConstraintSet {
    ConstraintSet::new()
        .require("vin", "must be 3 to 21 alphanumeric characters", |subject| {
            is_alphanumeric(&subject.vehicle.vin) && length_between(&subject.vehicle.vin, 3, 21)
        })
        .require("primaryVrm", "must be 1 to 9 alphanumeric characters", |subject| {
            optional(&subject.vehicle.primary_vrm, |vrm| is_vrm(vrm))
        })
        .require(
            "secondaryVrms",
            "must each be 1 to 9 alphanumeric characters",
            |subject| subject.vehicle.secondary_vrms.iter().all(|vrm| is_vrm(vrm)),
        )
        .require("reasonForCreation", "is required", |subject| {
            has_text(&subject.version.reason_for_creation)
        })
        .require("vehicleClass.description", "is not a recognised vehicle class", |subject| {
            optional(&subject.version.vehicle_class.description, |description| {
                lookup::vehicle_class_code(description).is_some()
            })
        })
        .require("noOfAxles", "must be between 1 and 99", |subject| {
            optional(&subject.version.no_of_axles, |count| (1..=99).contains(count))
        })
        .require("axles", "must contain one entry per axle", |subject| {
            let version = subject.version;
            version.axles.is_empty()
                || u8::try_from(version.axles.len()).ok() == version.no_of_axles
        })
        .require("manufactureYear", "must be between 1900 and 9999", |subject| {
            optional(&subject.version.manufacture_year, |year| {
                (1900..=9999).contains(year)
            })
        })
}

/// Structural fields every type needs before it can be tested at all.
fn structural_core() -> ConstraintSet {
    ConstraintSet::new()
        .require("vehicleConfiguration", "is required", |subject| {
            has_text(&subject.version.vehicle_configuration)
        })
        .require("vehicleClass.description", "is required", |subject| {
            has_text(&subject.version.vehicle_class.description)
        })
        .require("noOfAxles", "is required", |subject| {
            subject.version.no_of_axles.is_some()
        })
        .require("reasonForCreation", "is required", |subject| {
            has_text(&subject.version.reason_for_creation)
        })
        .require("createdAt", "is required", |subject| {
            subject.version.created_at.is_some()
        })
}

fn create_constraints() -> ConstraintSet {
    ConstraintSet::new().require(
        "statusCode",
        "must be provisional or current for a new record",
        |subject| {
            matches!(
                subject.version.status_code,
                TechRecordStatus::Provisional | TechRecordStatus::Current
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::domain::{
        LightVehicleFields, PsvBrakes, PsvFields, SystemNumber, TrlFields, VehicleDetails,
    };
    use serde_json::json;

    struct FixedNumbers;

    impl NumberGenerator for FixedNumbers {
        fn next_system_number(&self) -> Result<SystemNumber, GeneratorError> {
            Ok(SystemNumber("10000042".to_string()))
        }

        fn next_trailer_id(&self) -> Result<String, GeneratorError> {
            Ok("C000042".to_string())
        }
    }

    fn draft(vin: &str) -> VehicleRecord {
        VehicleRecord {
            system_number: SystemNumber(String::new()),
            vin: vin.to_string(),
            partial_vin: String::new(),
            primary_vrm: Some("AB12CDE".to_string()),
            secondary_vrms: Vec::new(),
            trailer_id: None,
            tech_records: Vec::new(),
            revision: 0,
        }
    }

    #[test]
    fn factory_rejects_unknown_vehicle_types() {
        assert!(matches!(
            VehicleTypeProcessor::for_type_name("tram"),
            Err(TechRecordError::InvalidVehicleType(name)) if name == "tram"
        ));
        assert_eq!(
            VehicleTypeProcessor::for_type_name("Small TRL")
                .expect("known type")
                .vehicle_type(),
            VehicleType::SmallTrl
        );
    }

    #[test]
    fn parse_version_normalizes_the_type_tag() {
        let version = VehicleTypeProcessor::parse_version(json!({
            "vehicleType": "PSV",
            "reasonForCreation": "new vehicle",
            "seatsLowerDeck": 40
        }))
        .expect("payload decodes");

        assert_eq!(version.vehicle_type(), VehicleType::Psv);
        assert_eq!(version.status_code, TechRecordStatus::Provisional);
        assert_eq!(
            version.details.as_psv().and_then(|psv| psv.seats_lower_deck),
            Some(40)
        );
    }

    #[test]
    fn parse_version_reports_missing_type_as_invalid_vehicle_type() {
        let error = VehicleTypeProcessor::parse_version(json!({ "reasonForCreation": "x" }))
            .expect_err("type is required");
        assert!(matches!(error, TechRecordError::InvalidVehicleType(_)));
    }

    #[test]
    fn validation_collects_every_message() {
        let mut version = TechRecordVersion::new(VehicleDetails::Car(LightVehicleFields::default()));
        version.status_code = TechRecordStatus::Archived;
        version.no_of_axles = Some(2);
        version.axles = vec![Default::default()];

        let processor = VehicleTypeProcessor::new(VehicleType::Car);
        let messages = processor.validate(&draft("X"), &version, ValidationMode::Create);

        assert!(messages.iter().any(|m| m.starts_with("vin")));
        assert!(messages.iter().any(|m| m.starts_with("reasonForCreation")));
        assert!(messages.iter().any(|m| m.starts_with("axles")));
        assert!(messages.iter().any(|m| m.starts_with("statusCode")));

        let update_messages = processor.validate(&draft("X"), &version, ValidationMode::Update);
        assert!(!update_messages.iter().any(|m| m.starts_with("statusCode")));
    }

    #[test]
    fn axle_lists_longer_than_a_byte_do_not_wrap() {
        let mut version = TechRecordVersion::new(VehicleDetails::Car(LightVehicleFields::default()));
        version.no_of_axles = Some(1);
        version.axles = vec![Default::default(); 257];

        let processor = VehicleTypeProcessor::new(VehicleType::Car);
        let messages = processor.validate(&draft("X"), &version, ValidationMode::Update);

        assert!(messages.iter().any(|m| m.starts_with("axles")));
    }

    #[test]
    fn derives_class_and_brake_codes() {
        let mut version = TechRecordVersion::new(VehicleDetails::Psv(PsvFields {
            brakes: PsvBrakes {
                brake_code: Some("178202".to_string()),
                ..PsvBrakes::default()
            },
            ..PsvFields::default()
        }));
        version.vehicle_class.description = Some("large psv(ie: greater than 23 seats)".to_string());

        let derived = VehicleTypeProcessor::new(VehicleType::Psv).derive_fields(version);

        assert_eq!(derived.vehicle_class.code.as_deref(), Some("l"));
        assert_eq!(
            derived
                .details
                .as_psv()
                .and_then(|psv| psv.brakes.brake_code_original.as_deref()),
            Some("202")
        );
    }

    #[test]
    fn small_trailers_reuse_trailer_id_as_primary_vrm() {
        let mut vehicle = draft("ABCDEFGH123456");
        vehicle.primary_vrm = None;
        vehicle
            .tech_records
            .push(TechRecordVersion::new(VehicleDetails::SmallTrl(TrlFields::default())));

        let assigned = VehicleTypeProcessor::new(VehicleType::SmallTrl)
            .assign_identifiers(&FixedNumbers, vehicle)
            .expect("identifiers assigned");

        assert_eq!(assigned.system_number.as_str(), "10000042");
        assert_eq!(assigned.trailer_id.as_deref(), Some("C000042"));
        assert_eq!(assigned.primary_vrm.as_deref(), Some("C000042"));
    }

    #[test]
    fn non_trailers_only_receive_a_system_number() {
        let assigned = VehicleTypeProcessor::new(VehicleType::Hgv)
            .assign_identifiers(&FixedNumbers, draft("ABCDEFGH123456"))
            .expect("identifiers assigned");

        assert!(assigned.trailer_id.is_none());
        assert_eq!(assigned.primary_vrm.as_deref(), Some("AB12CDE"));
    }
}
