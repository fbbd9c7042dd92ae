use serde::{Deserialize, Serialize};

use super::domain::{TechRecordStatus, TechRecordVersion, VehicleRecord};
use super::error::TechRecordError;
use super::wide::{flatten_record, WideRow};

/// Which versions a search returns per vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusView {
    Current,
    Provisional,
    Archived,
    All,
    /// Current if present, otherwise provisional; a single version is always returned.
    #[default]
    ProvisionalOverCurrent,
}

impl StatusView {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Provisional => "provisional",
            Self::Archived => "archived",
            Self::All => "all",
            Self::ProvisionalOverCurrent => "provisional_over_current",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "current" => Some(Self::Current),
            "provisional" => Some(Self::Provisional),
            "archived" => Some(Self::Archived),
            "all" => Some(Self::All),
            "provisional_over_current" => Some(Self::ProvisionalOverCurrent),
            _ => None,
        }
    }
}

/// Filters fetched vehicles down to the versions a status view asks for.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordListService;

impl RecordListService {
    pub fn filter_versions(
        &self,
        versions: &[TechRecordVersion],
        view: StatusView,
    ) -> Vec<TechRecordVersion> {
        let with_status = |status: TechRecordStatus| -> Vec<TechRecordVersion> {
            versions
                .iter()
                .filter(|version| version.status_code == status)
                .cloned()
                .collect()
        };

        match view {
            StatusView::Current => with_status(TechRecordStatus::Current),
            StatusView::Provisional => with_status(TechRecordStatus::Provisional),
            StatusView::Archived => with_status(TechRecordStatus::Archived),
            StatusView::All => versions.to_vec(),
            StatusView::ProvisionalOverCurrent => {
                if versions.len() == 1 {
                    return versions.to_vec();
                }
                let current = with_status(TechRecordStatus::Current);
                if current.is_empty() {
                    with_status(TechRecordStatus::Provisional)
                } else {
                    current
                }
            }
        }
    }

    /// Applies `view` to each vehicle, dropping vehicles left without versions.
    pub fn apply_view(
        &self,
        vehicles: Vec<VehicleRecord>,
        view: StatusView,
    ) -> Result<Vec<VehicleRecord>, TechRecordError> {
        let filtered: Vec<VehicleRecord> = vehicles
            .into_iter()
            .filter_map(|mut vehicle| {
                vehicle.tech_records = self.filter_versions(&vehicle.tech_records, view);
                (!vehicle.tech_records.is_empty()).then_some(vehicle)
            })
            .collect();

        if filtered.is_empty() {
            Err(TechRecordError::NotFound(format!(
                "no {} tech records found",
                view.label()
            )))
        } else {
            Ok(filtered)
        }
    }

    /// One wide row per version across every vehicle.
    pub fn to_wide(&self, vehicles: &[VehicleRecord]) -> Result<Vec<WideRow>, TechRecordError> {
        let mut rows = Vec::new();
        for vehicle in vehicles {
            rows.extend(flatten_record(vehicle)?);
        }
        Ok(rows)
    }
}
