use super::domain::{TechRecordVersion, VehicleRecord};

/// The vehicle identity and the version being checked against it.
#[derive(Debug, Clone, Copy)]
pub struct RecordSubject<'a> {
    pub vehicle: &'a VehicleRecord,
    pub version: &'a TechRecordVersion,
}

impl<'a> RecordSubject<'a> {
    pub fn new(vehicle: &'a VehicleRecord, version: &'a TechRecordVersion) -> Self {
        Self { vehicle, version }
    }
}

pub type Rule = for<'s, 'a> fn(&'s RecordSubject<'a>) -> bool;

/// A single field predicate and the message reported when it fails.
#[derive(Clone, Copy)]
pub struct Constraint {
    pub field: &'static str,
    pub message: &'static str,
    rule: Rule,
}

impl Constraint {
    pub fn holds(&self, subject: &RecordSubject<'_>) -> bool {
        (self.rule)(subject)
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.field, self.message)
    }
}

/// Ordered list of constraints. Evaluation is exhaustive: every failing constraint is
/// reported, never just the first.
#[derive(Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, field: &'static str, message: &'static str, rule: Rule) -> Self {
        self.constraints.push(Constraint {
            field,
            message,
            rule,
        });
        self
    }

    pub fn violations(&self, subject: &RecordSubject<'_>) -> Vec<String> {
        self.constraints
            .iter()
            .filter(|constraint| !constraint.holds(subject))
            .map(Constraint::describe)
            .collect()
    }
}

pub fn has_text(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false)
}

/// Absent values pass; present values must satisfy `check`.
pub fn optional<T>(value: &Option<T>, check: impl FnOnce(&T) -> bool) -> bool {
    value.as_ref().map(check).unwrap_or(true)
}

pub fn is_alphanumeric(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn length_between(text: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&text.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::domain::{
        LightVehicleFields, SystemNumber, TechRecordVersion, VehicleDetails, VehicleRecord,
    };

    fn vehicle(vin: &str) -> VehicleRecord {
        VehicleRecord {
            system_number: SystemNumber("10000001".to_string()),
            vin: vin.to_string(),
            partial_vin: String::new(),
            primary_vrm: None,
            secondary_vrms: Vec::new(),
            trailer_id: None,
            tech_records: Vec::new(),
            revision: 0,
        }
    }

    #[test]
    fn reports_every_failing_constraint_in_order() {
        let set = ConstraintSet::new()
            .require("vin", "is required", |subject| {
                !subject.vehicle.vin.is_empty()
            })
            .require("primaryVrm", "is required", |subject| {
                has_text(&subject.vehicle.primary_vrm)
            })
            .require("reasonForCreation", "is required", |subject| {
                has_text(&subject.version.reason_for_creation)
            });

        let record = vehicle("");
        let version = TechRecordVersion::new(VehicleDetails::Car(LightVehicleFields::default()));
        let subject = RecordSubject::new(&record, &version);

        assert_eq!(
            set.violations(&subject),
            vec![
                "vin is required".to_string(),
                "primaryVrm is required".to_string(),
                "reasonForCreation is required".to_string(),
            ]
        );
    }

    #[test]
    fn optional_values_pass_when_absent() {
        assert!(optional(&None::<u16>, |value| *value < 10));
        assert!(!optional(&Some(12u16), |value| *value < 10));
        assert!(!has_text(&Some("   ".to_string())));
    }

    #[test]
    fn satisfied_sets_report_nothing() {
        let set = ConstraintSet::new().require("vin", "is required", |subject| {
            !subject.vehicle.vin.is_empty()
        });
        let record = vehicle("ABCDEFGH123456");
        let version = TechRecordVersion::new(VehicleDetails::Car(LightVehicleFields::default()));

        assert!(set.violations(&RecordSubject::new(&record, &version)).is_empty());
    }
}
