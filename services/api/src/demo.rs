use crate::infra::{SequenceNumberGenerator, WideRowStore};
use clap::Args;
use serde_json::{json, Value};
use std::sync::Arc;
use vehicle_tech_records::config::RecordsConfig;
use vehicle_tech_records::error::AppError;
use vehicle_tech_records::records::{
    classify, Amendment, CategoryUpdate, EuVehicleCategory, NewVehicle, PromotionOutcome,
    SearchCriteria, StatusView, TechRecordError, TechRecordService, TechRecordStatus,
    TestOutcome, UserDetails, VehicleRecord, VehicleType, VehicleTypeProcessor,
};

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Search identifier as a caller would type it
    pub(crate) term: String,
    /// Optional hint (all, systemNumber, vin, partialVin, vrm, trailerId)
    #[arg(long)]
    pub(crate) criteria: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Vehicle type to walk through the lifecycle (psv, hgv, trl, car)
    #[arg(long, default_value = "psv")]
    pub(crate) vehicle_type: String,
    /// Print every stored version as wide rows after the walkthrough
    #[arg(long)]
    pub(crate) wide: bool,
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let hint = match args.criteria.as_deref() {
        None => None,
        Some(raw) => Some(SearchCriteria::parse(raw).ok_or_else(|| {
            TechRecordError::validation(format!("searchCriteria '{raw}' is not recognised"))
        })?),
    };

    let term = args.term.trim().to_ascii_uppercase();
    let strategy = classify(&term, hint).ok_or_else(|| {
        TechRecordError::validation(format!(
            "search identifier '{term}' does not match any lookup strategy"
        ))
    })?;

    println!("{term} -> {strategy}");
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let vehicle_type = VehicleType::parse(&args.vehicle_type).ok_or_else(|| {
        TechRecordError::InvalidVehicleType(args.vehicle_type.clone())
    })?;
    let fixture = demo_fixture(vehicle_type).ok_or_else(|| {
        TechRecordError::validation(format!(
            "no demo fixture for vehicle type '{}'",
            args.vehicle_type
        ))
    })?;

    let config = RecordsConfig {
        retry_backoff_ms: 0,
        ..RecordsConfig::default()
    };
    let service = TechRecordService::new(
        Arc::new(WideRowStore::default()),
        Arc::new(SequenceNumberGenerator::from_config(&config)),
        config,
    );
    let user = UserDetails {
        id: "demo-examiner".to_string(),
        name: "Demo Examiner".to_string(),
    };

    println!("Vehicle tech record lifecycle demo ({})", args.vehicle_type);

    let draft = NewVehicle {
        vin: "DEMO0VIN00123456".to_string(),
        primary_vrm: (!vehicle_type.is_trailer()).then(|| "DEMO1".to_string()),
        secondary_vrms: Vec::new(),
        tech_record: VehicleTypeProcessor::parse_version(fixture)?,
    };
    let created = service.create(draft, user.clone())?;
    let system_number = created.system_number.clone();
    render_step("create", &created);

    let mut amended = created
        .tech_records
        .first()
        .cloned()
        .ok_or_else(|| TechRecordError::Internal("created vehicle has no versions".to_string()))?;
    amended.manufacture_year = Some(2021);
    let mut amendment = Amendment::new(amended);
    if created.trailer_id.is_none() {
        amendment.primary_vrm = Some("DEMO2".to_string());
    }
    let updated = service.update(&system_number, amendment, user.clone())?;
    render_step("update", &updated);

    let outcome = TestOutcome::new("submitted", "pass", "41");
    match service.promote_by_test_outcome(&system_number, &outcome, None, user.clone())? {
        PromotionOutcome::Promoted(record) => render_step("promote", &record),
        PromotionOutcome::NotRequired => println!("\n[promote] no status update required"),
    }

    let category = demo_category(vehicle_type);
    match service.update_eu_vehicle_category(&system_number, category, user.clone())? {
        CategoryUpdate::Updated(record) => render_step("eu-vehicle-category", &record),
        CategoryUpdate::NoUpdateRequired => {
            println!("\n[eu-vehicle-category] no EU vehicle category update required")
        }
    }

    let live = service.get(&system_number)?;
    let current = live
        .tech_records
        .iter()
        .find(|version| version.status_code == TechRecordStatus::Current)
        .cloned()
        .ok_or_else(|| TechRecordError::Internal("no current version to archive".to_string()))?;
    let archived = service.archive(&system_number, &current, "Vehicle exported", user)?;
    render_step("archive", &archived);

    if args.wide {
        let vehicles = service.search(
            system_number.as_str(),
            SearchCriteria::SystemNumber,
            StatusView::All,
        )?;
        println!("\nWide rows");
        for row in service.listing().to_wide(&vehicles)? {
            println!("  {}", Value::Object(row));
        }
    }

    Ok(())
}

fn render_step(step: &str, vehicle: &VehicleRecord) {
    println!(
        "\n[{step}] system number {} | vin {} | vrm {} | trailer id {} | revision {}",
        vehicle.system_number,
        vehicle.vin,
        vehicle.primary_vrm.as_deref().unwrap_or("-"),
        vehicle.trailer_id.as_deref().unwrap_or("-"),
        vehicle.revision
    );
    for version in &vehicle.tech_records {
        println!(
            "  - {:<11} | {:<8} | {} | {}",
            version.status_code.label(),
            version
                .record_completeness
                .map(|grade| grade.label())
                .unwrap_or("-"),
            version
                .created_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            version.reason_for_creation.as_deref().unwrap_or("-")
        );
    }
}

fn demo_category(vehicle_type: VehicleType) -> EuVehicleCategory {
    match vehicle_type {
        VehicleType::Psv => EuVehicleCategory::M3,
        VehicleType::Hgv => EuVehicleCategory::N3,
        VehicleType::Trl | VehicleType::SmallTrl => EuVehicleCategory::O4,
        VehicleType::Motorcycle => EuVehicleCategory::L3e,
        VehicleType::Lgv => EuVehicleCategory::N1,
        VehicleType::Car => EuVehicleCategory::M1,
    }
}

fn demo_fixture(vehicle_type: VehicleType) -> Option<Value> {
    let axles = json!([
        { "axleNumber": 1, "parkingBrakeMrk": true, "gbWeight": 7500, "designWeight": 8000, "tyreSize": "295/80-22.5" },
        { "axleNumber": 2, "parkingBrakeMrk": false, "gbWeight": 7500, "designWeight": 8000, "tyreSize": "295/80-22.5" }
    ]);

    match vehicle_type {
        VehicleType::Psv => Some(json!({
            "vehicleType": "psv",
            "reasonForCreation": "new vehicle",
            "vehicleConfiguration": "rigid",
            "vehicleClass": { "description": "large psv(ie: greater than 23 seats)" },
            "noOfAxles": 2,
            "axles": axles,
            "manufactureYear": 2019,
            "bodyType": { "description": "single decker" },
            "seatsLowerDeck": 45,
            "seatsUpperDeck": 0,
            "standingCapacity": 20,
            "brakes": { "brakeCode": "178202" },
            "grossKerbWeight": 11000,
            "grossGbWeight": 18000,
            "grossDesignWeight": 19000,
            "approvalType": "NTA"
        })),
        VehicleType::Hgv => Some(json!({
            "vehicleType": "hgv",
            "reasonForCreation": "new vehicle",
            "vehicleConfiguration": "rigid",
            "vehicleClass": { "description": "heavy goods vehicle" },
            "noOfAxles": 3,
            "bodyType": { "description": "box" },
            "grossGbWeight": 26000
        })),
        VehicleType::Trl => Some(json!({
            "vehicleType": "trl",
            "reasonForCreation": "new trailer",
            "vehicleConfiguration": "semi-trailer",
            "vehicleClass": { "description": "trailer" },
            "noOfAxles": 3,
            "manufactureYear": 2020,
            "bodyType": { "description": "flat" },
            "grossGbWeight": 24000,
            "grossDesignWeight": 24000,
            "couplingType": "F",
            "firstUseDate": "2020-03-01",
            "brakes": { "loadSensingValve": true },
            "approvalType": "ECTA"
        })),
        VehicleType::Car => Some(json!({
            "vehicleType": "car",
            "reasonForCreation": "new car",
            "vehicleConfiguration": "other",
            "vehicleClass": { "description": "not applicable" },
            "noOfAxles": 2,
            "vehicleSubclass": ["c"]
        })),
        VehicleType::SmallTrl | VehicleType::Lgv | VehicleType::Motorcycle => None,
    }
}
