//! End-to-end scenarios driven through the public service facade and router.

mod common {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value};

    use vehicle_tech_records::config::RecordsConfig;
    use vehicle_tech_records::records::{
        GeneratorError, LookupStrategy, NumberGenerator, RecordStore, RepositoryError,
        SystemNumber, TechRecordService, TechRecordVersion, UserDetails, VehicleRecord,
        VehicleTypeProcessor,
    };

    #[derive(Default)]
    pub(super) struct Store {
        records: Mutex<BTreeMap<String, VehicleRecord>>,
    }

    impl RecordStore for Store {
        fn find_by_identifier(
            &self,
            term: &str,
            strategy: LookupStrategy,
        ) -> Result<Vec<VehicleRecord>, RepositoryError> {
            let guard = self.records.lock().expect("store mutex poisoned");
            Ok(guard
                .values()
                .filter(|record| match strategy {
                    LookupStrategy::SystemNumber => record.system_number.as_str() == term,
                    LookupStrategy::Vin => record.vin == term,
                    LookupStrategy::PartialVin => record.partial_vin == term,
                    LookupStrategy::Vrm => {
                        record.primary_vrm.as_deref() == Some(term)
                            || record.secondary_vrms.iter().any(|vrm| vrm == term)
                    }
                    LookupStrategy::TrailerId => record.trailer_id.as_deref() == Some(term),
                })
                .cloned()
                .collect())
        }

        fn create(&self, record: VehicleRecord) -> Result<VehicleRecord, RepositoryError> {
            let mut guard = self.records.lock().expect("store mutex poisoned");
            let key = record.system_number.as_str().to_string();
            if guard.contains_key(&key) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(key, record.clone());
            Ok(record)
        }

        fn replace(
            &self,
            mut record: VehicleRecord,
            expected_revision: u64,
        ) -> Result<VehicleRecord, RepositoryError> {
            let mut guard = self.records.lock().expect("store mutex poisoned");
            let key = record.system_number.as_str().to_string();
            let stored = guard.get(&key).ok_or(RepositoryError::NotFound)?;
            if stored.revision != expected_revision {
                return Err(RepositoryError::StaleRevision);
            }
            record.revision = expected_revision + 1;
            guard.insert(key, record.clone());
            Ok(record)
        }
    }

    #[derive(Default)]
    pub(super) struct Numbers {
        issued: AtomicU64,
    }

    impl NumberGenerator for Numbers {
        fn next_system_number(&self) -> Result<SystemNumber, GeneratorError> {
            let next = self.issued.fetch_add(1, Ordering::SeqCst);
            Ok(SystemNumber(format!("{}", 30_000_000 + next)))
        }

        fn next_trailer_id(&self) -> Result<String, GeneratorError> {
            let next = self.issued.fetch_add(1, Ordering::SeqCst);
            Ok(format!("C{:06}", next + 1))
        }
    }

    pub(super) fn service() -> Arc<TechRecordService<Store, Numbers>> {
        let config = RecordsConfig {
            retry_backoff_ms: 0,
            ..RecordsConfig::default()
        };
        Arc::new(TechRecordService::new(
            Arc::new(Store::default()),
            Arc::new(Numbers::default()),
            config,
        ))
    }

    pub(super) fn user() -> UserDetails {
        UserDetails {
            id: "oid-987".to_string(),
            name: "Sam Tester".to_string(),
        }
    }

    pub(super) fn trailer_payload() -> Value {
        json!({
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
        })
    }

    pub(super) fn psv_payload() -> Value {
        json!({
            "vehicleType": "psv",
            "reasonForCreation": "new vehicle",
            "vehicleConfiguration": "rigid",
            "vehicleClass": { "description": "large psv(ie: greater than 23 seats)" },
            "noOfAxles": 2,
            "axles": [
                { "axleNumber": 1, "parkingBrakeMrk": true, "gbWeight": 7500, "designWeight": 8000, "tyreSize": "295/80-22.5" },
                { "axleNumber": 2, "parkingBrakeMrk": false, "gbWeight": 7500, "designWeight": 8000, "tyreSize": "295/80-22.5" }
            ],
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
        })
    }

    pub(super) fn version(payload: Value) -> TechRecordVersion {
        VehicleTypeProcessor::parse_version(payload).expect("fixture parses")
    }
}

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use vehicle_tech_records::records::lifecycle::status_invariant_holds;
use vehicle_tech_records::records::{
    record_router, Amendment, NewVehicle, PromotionOutcome, SearchCriteria, StatusView,
    TechRecordStatus, TechRecordVersion, TestOutcome,
};

use common::*;

fn statuses(versions: &[TechRecordVersion]) -> Vec<TechRecordStatus> {
    versions.iter().map(|version| version.status_code).collect()
}

#[test]
fn trailer_is_findable_by_every_identifier_after_creation() {
    let service = service();
    let created = service
        .create(
            NewVehicle {
                vin: " abcdefgh654321 ".to_string(),
                primary_vrm: None,
                secondary_vrms: Vec::new(),
                tech_record: version(trailer_payload()),
            },
            user(),
        )
        .expect("trailer is created");

    let trailer_id = created.trailer_id.clone().expect("trailer id assigned");
    assert_eq!(created.vin, "ABCDEFGH654321");
    assert_eq!(created.partial_vin, "654321");

    for term in [
        created.system_number.as_str().to_string(),
        "ABCDEFGH654321".to_string(),
        "654321".to_string(),
        trailer_id.to_lowercase(),
    ] {
        let hint = if term == created.system_number.as_str() {
            SearchCriteria::SystemNumber
        } else {
            SearchCriteria::All
        };
        let found = service
            .search(&term, hint, StatusView::All)
            .unwrap_or_else(|err| panic!("{term} should resolve: {err}"));
        assert_eq!(found.len(), 1, "{term}");
        assert_eq!(found[0].system_number, created.system_number);
    }
}

#[test]
fn psv_walks_through_update_promotion_and_archive() {
    let service = service();
    let created = service
        .create(
            NewVehicle {
                vin: "PSVVIN0000112233".to_string(),
                primary_vrm: Some("bus 1".to_string()),
                secondary_vrms: Vec::new(),
                tech_record: version(psv_payload()),
            },
            user(),
        )
        .expect("psv is created");
    assert_eq!(created.primary_vrm.as_deref(), Some("BUS1"));
    assert_eq!(statuses(&created.tech_records), vec![TechRecordStatus::Provisional]);
    let system_number = created.system_number.clone();

    let mut amended = created.tech_records[0].clone();
    amended.manufacture_year = Some(2020);
    let mut amendment = Amendment::new(amended);
    amendment.primary_vrm = Some("BUS2".to_string());
    let updated = service
        .update(&system_number, amendment, user())
        .expect("update succeeds");
    assert!(status_invariant_holds(&updated));
    assert_eq!(updated.primary_vrm.as_deref(), Some("BUS2"));
    assert!(updated.secondary_vrms.contains(&"BUS1".to_string()));
    assert_eq!(
        statuses(&updated.tech_records),
        vec![TechRecordStatus::Archived, TechRecordStatus::Provisional]
    );

    let outcome = TestOutcome::new("submitted", "pass", "95");
    let PromotionOutcome::Promoted(promoted) = service
        .promote_by_test_outcome(&system_number, &outcome, None, user())
        .expect("promotion succeeds")
    else {
        panic!("first test pass should promote");
    };
    assert!(status_invariant_holds(&promoted));
    assert_eq!(promoted.count_status(TechRecordStatus::Current), 1);
    assert_eq!(promoted.count_status(TechRecordStatus::Provisional), 0);

    let current = promoted
        .tech_records
        .iter()
        .find(|version| version.status_code == TechRecordStatus::Current)
        .cloned()
        .expect("current version");
    let archived = service
        .archive(&system_number, &current, "Vehicle scrapped", user())
        .expect("archive succeeds");
    assert!(!archived.has_live_version());

    let listed = service
        .search("BUS2", SearchCriteria::Vrm, StatusView::Archived)
        .expect("archived versions listed");
    assert_eq!(listed[0].tech_records.len(), archived.tech_records.len() - 1);
}

#[test]
fn failing_test_outcomes_leave_the_record_untouched() {
    let service = service();
    let created = service
        .create(
            NewVehicle {
                vin: "PSVVIN0000998877".to_string(),
                primary_vrm: Some("COACH9".to_string()),
                secondary_vrms: Vec::new(),
                tech_record: version(psv_payload()),
            },
            user(),
        )
        .expect("psv is created");

    let outcome = TestOutcome::new("submitted", "fail", "41");
    let result = service
        .promote_by_test_outcome(&created.system_number, &outcome, None, user())
        .expect("no-op succeeds");

    assert_eq!(result, PromotionOutcome::NotRequired);
    let stored = service.get(&created.system_number).expect("stored");
    assert_eq!(stored.revision, created.revision);
}

#[tokio::test]
async fn router_creates_and_lists_wide_rows() {
    let router = record_router(service());
    let body = json!({
        "msUserDetails": { "msOid": "oid-987", "msUser": "Sam Tester" },
        "vin": "PSVVIN0000445566",
        "primaryVrm": "WIDE1",
        "techRecord": psv_payload()
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/vehicles")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serializable")))
        .expect("request builds");
    let response = router.clone().oneshot(request).await.expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = Request::builder()
        .uri("/v1/vehicles/WIDE1?status=all&format=wide")
        .body(Body::empty())
        .expect("request builds");
    let response = router.oneshot(request).await.expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("body reads");
    let rows: Vec<Value> = serde_json::from_slice(&bytes).expect("json rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["primaryVrm"], json!("WIDE1"));
    assert_eq!(rows[0]["techRecord_statusCode"], json!("provisional"));
    assert_eq!(rows[0]["techRecord_axles_1_axleNumber"], json!(2));
}
