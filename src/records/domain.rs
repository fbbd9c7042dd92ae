use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Primary internal identifier assigned when a vehicle is first recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SystemNumber(pub String);

impl SystemNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Vehicle family a tech record version belongs to. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Psv,
    Hgv,
    Trl,
    #[serde(rename = "small trl")]
    SmallTrl,
    Lgv,
    Car,
    Motorcycle,
}

impl VehicleType {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Psv,
            Self::Hgv,
            Self::Trl,
            Self::SmallTrl,
            Self::Lgv,
            Self::Car,
            Self::Motorcycle,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Psv => "psv",
            Self::Hgv => "hgv",
            Self::Trl => "trl",
            Self::SmallTrl => "small trl",
            Self::Lgv => "lgv",
            Self::Car => "car",
            Self::Motorcycle => "motorcycle",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|candidate| candidate.label() == normalized)
    }

    pub const fn is_trailer(self) -> bool {
        matches!(self, Self::Trl | Self::SmallTrl)
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Position of a version in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechRecordStatus {
    #[default]
    Provisional,
    Current,
    Archived,
    Removed,
}

impl TechRecordStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Provisional => "provisional",
            Self::Current => "current",
            Self::Archived => "archived",
            Self::Removed => "removed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "provisional" => Some(Self::Provisional),
            "current" => Some(Self::Current),
            "archived" => Some(Self::Archived),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }

    /// Provisional and current versions are live; archived and removed ones are frozen.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Provisional | Self::Current)
    }
}

impl fmt::Display for TechRecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How much of a version's mandatory data is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordCompleteness {
    Skeleton,
    Testable,
    Complete,
}

impl RecordCompleteness {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Skeleton => "skeleton",
            Self::Testable => "testable",
            Self::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateType {
    TechRecordUpdate,
    RegulatoryDetailUpdate,
}

/// Regulatory classification attachable once per active version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EuVehicleCategory {
    M1,
    M2,
    M3,
    N1,
    N2,
    N3,
    O1,
    O2,
    O3,
    O4,
    L1e,
    L2e,
    L3e,
    L4e,
    L5e,
    L6e,
    L7e,
}

impl EuVehicleCategory {
    pub const fn ordered() -> [Self; 17] {
        [
            Self::M1,
            Self::M2,
            Self::M3,
            Self::N1,
            Self::N2,
            Self::N3,
            Self::O1,
            Self::O2,
            Self::O3,
            Self::O4,
            Self::L1e,
            Self::L2e,
            Self::L3e,
            Self::L4e,
            Self::L5e,
            Self::L6e,
            Self::L7e,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::M1 => "m1",
            Self::M2 => "m2",
            Self::M3 => "m3",
            Self::N1 => "n1",
            Self::N2 => "n2",
            Self::N3 => "n3",
            Self::O1 => "o1",
            Self::O2 => "o2",
            Self::O3 => "o3",
            Self::O4 => "o4",
            Self::L1e => "l1e",
            Self::L2e => "l2e",
            Self::L3e => "l3e",
            Self::L4e => "l4e",
            Self::L5e => "l5e",
            Self::L6e => "l6e",
            Self::L7e => "l7e",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|candidate| candidate.label() == normalized)
    }
}

/// Identity of the actor performing a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    #[serde(rename = "msOid")]
    pub id: String,
    #[serde(rename = "msUser")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleClass {
    pub description: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyType {
    pub description: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Axle {
    pub axle_number: Option<u8>,
    pub parking_brake_mrk: Option<bool>,
    pub gb_weight: Option<u32>,
    pub design_weight: Option<u32>,
    pub tyre_size: Option<String>,
}

/// Brake data recorded for passenger vehicles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsvBrakes {
    pub brake_code: Option<String>,
    pub brake_code_original: Option<String>,
    pub data_tr_brake_one: Option<String>,
    pub data_tr_brake_two: Option<String>,
    pub data_tr_brake_three: Option<String>,
    pub retarder_brake_one: Option<String>,
}

/// Brake data recorded for goods vehicles and trailers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brakes {
    pub antilock_braking_system: Option<bool>,
    pub load_sensing_valve: Option<bool>,
    pub dtp_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsvFields {
    #[serde(default)]
    pub body_type: BodyType,
    pub seats_lower_deck: Option<u16>,
    pub seats_upper_deck: Option<u16>,
    pub standing_capacity: Option<u16>,
    #[serde(default)]
    pub brakes: PsvBrakes,
    pub gross_kerb_weight: Option<u32>,
    pub gross_gb_weight: Option<u32>,
    pub gross_design_weight: Option<u32>,
    pub approval_type: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HgvFields {
    #[serde(default)]
    pub body_type: BodyType,
    pub gross_gb_weight: Option<u32>,
    pub gross_design_weight: Option<u32>,
    pub train_gb_weight: Option<u32>,
    pub max_train_gb_weight: Option<u32>,
    pub tyre_use_code: Option<String>,
    #[serde(default)]
    pub brakes: Brakes,
    pub approval_type: Option<String>,
    pub regulatory_details: Option<Value>,
    pub notes: Option<String>,
}

/// Shared by full-size and small trailers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrlFields {
    #[serde(default)]
    pub body_type: BodyType,
    pub gross_gb_weight: Option<u32>,
    pub gross_design_weight: Option<u32>,
    pub coupling_type: Option<String>,
    pub first_use_date: Option<NaiveDate>,
    #[serde(default)]
    pub brakes: Brakes,
    pub approval_type: Option<String>,
    pub regulatory_details: Option<Value>,
    pub notes: Option<String>,
}

/// Shared by light goods vehicles and cars.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightVehicleFields {
    #[serde(default)]
    pub vehicle_subclass: Vec<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorcycleFields {
    pub number_of_wheels_driven: Option<u8>,
    pub remarks: Option<String>,
}

/// Type-specific field set, tagged by `vehicleType` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "vehicleType")]
pub enum VehicleDetails {
    #[serde(rename = "psv")]
    Psv(PsvFields),
    #[serde(rename = "hgv")]
    Hgv(HgvFields),
    #[serde(rename = "trl")]
    Trl(TrlFields),
    #[serde(rename = "small trl")]
    SmallTrl(TrlFields),
    #[serde(rename = "lgv")]
    Lgv(LightVehicleFields),
    #[serde(rename = "car")]
    Car(LightVehicleFields),
    #[serde(rename = "motorcycle")]
    Motorcycle(MotorcycleFields),
}

impl VehicleDetails {
    pub fn vehicle_type(&self) -> VehicleType {
        match self {
            Self::Psv(_) => VehicleType::Psv,
            Self::Hgv(_) => VehicleType::Hgv,
            Self::Trl(_) => VehicleType::Trl,
            Self::SmallTrl(_) => VehicleType::SmallTrl,
            Self::Lgv(_) => VehicleType::Lgv,
            Self::Car(_) => VehicleType::Car,
            Self::Motorcycle(_) => VehicleType::Motorcycle,
        }
    }

    pub fn as_psv(&self) -> Option<&PsvFields> {
        match self {
            Self::Psv(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_hgv(&self) -> Option<&HgvFields> {
        match self {
            Self::Hgv(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_trailer(&self) -> Option<&TrlFields> {
        match self {
            Self::Trl(fields) | Self::SmallTrl(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&LightVehicleFields> {
        match self {
            Self::Lgv(fields) | Self::Car(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_motorcycle(&self) -> Option<&MotorcycleFields> {
        match self {
            Self::Motorcycle(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn body_type(&self) -> Option<&BodyType> {
        match self {
            Self::Psv(fields) => Some(&fields.body_type),
            Self::Hgv(fields) => Some(&fields.body_type),
            Self::Trl(fields) | Self::SmallTrl(fields) => Some(&fields.body_type),
            _ => None,
        }
    }

    pub fn regulatory_details(&self) -> Option<&Value> {
        match self {
            Self::Hgv(fields) => fields.regulatory_details.as_ref(),
            Self::Trl(fields) | Self::SmallTrl(fields) => fields.regulatory_details.as_ref(),
            _ => None,
        }
    }

    pub fn without_regulatory_details(mut self) -> Self {
        match &mut self {
            Self::Hgv(fields) => fields.regulatory_details = None,
            Self::Trl(fields) | Self::SmallTrl(fields) => fields.regulatory_details = None,
            _ => {}
        }
        self
    }

    /// Appends a line to the free-text field the type carries: `notes` for heavy vehicles and
    /// trailers, `remarks` for light vehicles and motorcycles.
    pub fn with_note(mut self, line: &str) -> Self {
        let field = match &mut self {
            Self::Psv(fields) => &mut fields.notes,
            Self::Hgv(fields) => &mut fields.notes,
            Self::Trl(fields) | Self::SmallTrl(fields) => &mut fields.notes,
            Self::Lgv(fields) | Self::Car(fields) => &mut fields.remarks,
            Self::Motorcycle(fields) => &mut fields.remarks,
        };
        *field = match field.take().filter(|existing| !existing.trim().is_empty()) {
            Some(existing) => Some(format!("{existing}\n{line}")),
            None => Some(line.to_string()),
        };
        self
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            Self::Psv(fields) => fields.notes.as_deref(),
            Self::Hgv(fields) => fields.notes.as_deref(),
            Self::Trl(fields) | Self::SmallTrl(fields) => fields.notes.as_deref(),
            Self::Lgv(fields) | Self::Car(fields) => fields.remarks.as_deref(),
            Self::Motorcycle(fields) => fields.remarks.as_deref(),
        }
    }
}

/// One dated snapshot of a vehicle's technical data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechRecordVersion {
    #[serde(default)]
    pub status_code: TechRecordStatus,
    pub record_completeness: Option<RecordCompleteness>,
    pub reason_for_creation: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by_name: Option<String>,
    pub created_by_id: Option<String>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub last_updated_by_name: Option<String>,
    pub last_updated_by_id: Option<String>,
    pub update_type: Option<UpdateType>,
    pub eu_vehicle_category: Option<EuVehicleCategory>,
    pub vehicle_configuration: Option<String>,
    #[serde(default)]
    pub vehicle_class: VehicleClass,
    pub no_of_axles: Option<u8>,
    #[serde(default)]
    pub axles: Vec<Axle>,
    pub manufacture_year: Option<u16>,
    #[serde(flatten)]
    pub details: VehicleDetails,
}

impl TechRecordVersion {
    pub fn new(details: VehicleDetails) -> Self {
        Self {
            status_code: TechRecordStatus::default(),
            record_completeness: None,
            reason_for_creation: None,
            created_at: None,
            created_by_name: None,
            created_by_id: None,
            last_updated_at: None,
            last_updated_by_name: None,
            last_updated_by_id: None,
            update_type: None,
            eu_vehicle_category: None,
            vehicle_configuration: None,
            vehicle_class: VehicleClass::default(),
            no_of_axles: None,
            axles: Vec::new(),
            manufacture_year: None,
            details,
        }
    }

    pub fn vehicle_type(&self) -> VehicleType {
        self.details.vehicle_type()
    }

    pub fn with_status(mut self, status: TechRecordStatus) -> Self {
        self.status_code = status;
        self
    }
}

/// Root aggregate: a vehicle and every version of its technical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub system_number: SystemNumber,
    pub vin: String,
    #[serde(default)]
    pub partial_vin: String,
    pub primary_vrm: Option<String>,
    #[serde(default)]
    pub secondary_vrms: Vec<String>,
    pub trailer_id: Option<String>,
    #[serde(rename = "techRecord")]
    pub tech_records: Vec<TechRecordVersion>,
    /// Incremented on every successful replace; writes are conditional on it.
    #[serde(default)]
    pub revision: u64,
}

impl VehicleRecord {
    pub fn versions_with_status(&self, status: TechRecordStatus) -> Vec<usize> {
        self.tech_records
            .iter()
            .enumerate()
            .filter(|(_, version)| version.status_code == status)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn live_versions(&self) -> Vec<usize> {
        self.tech_records
            .iter()
            .enumerate()
            .filter(|(_, version)| version.status_code.is_live())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn count_status(&self, status: TechRecordStatus) -> usize {
        self.tech_records
            .iter()
            .filter(|version| version.status_code == status)
            .count()
    }

    pub fn has_live_version(&self) -> bool {
        self.tech_records
            .iter()
            .any(|version| version.status_code.is_live())
    }

    pub fn vehicle_type(&self) -> Option<VehicleType> {
        self.tech_records.first().map(TechRecordVersion::vehicle_type)
    }
}

/// Last six characters of a VIN, the secondary lookup key.
pub fn partial_vin(vin: &str) -> String {
    let chars: Vec<char> = vin.chars().collect();
    let start = chars.len().saturating_sub(6);
    chars[start..].iter().collect()
}
