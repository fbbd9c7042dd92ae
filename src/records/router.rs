use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{
    EuVehicleCategory, SystemNumber, TechRecordStatus, TechRecordVersion, UserDetails,
};
use super::error::TechRecordError;
use super::identifier::SearchCriteria;
use super::lifecycle::{Amendment, TestOutcome};
use super::listing::StatusView;
use super::processor::VehicleTypeProcessor;
use super::repository::{NumberGenerator, RecordStore};
use super::service::{CategoryUpdate, NewVehicle, PromotionOutcome, TechRecordService};

/// Router builder exposing the tech record workflows.
pub fn record_router<R, N>(service: Arc<TechRecordService<R, N>>) -> Router
where
    R: RecordStore + 'static,
    N: NumberGenerator + 'static,
{
    Router::new()
        .route("/v1/vehicles", post(create_handler::<R, N>))
        .route(
            "/v1/vehicles/:identifier",
            get(search_handler::<R, N>).put(update_handler::<R, N>),
        )
        .route(
            "/v1/vehicles/archive/:system_number",
            put(archive_handler::<R, N>),
        )
        .route(
            "/v1/vehicles/update-status/:system_number",
            put(update_status_handler::<R, N>),
        )
        .route(
            "/v1/vehicles/add-provisional/:system_number",
            post(add_provisional_handler::<R, N>),
        )
        .route(
            "/v1/vehicles/update-eu-vehicle-category/:system_number",
            put(update_eu_vehicle_category_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchQuery {
    status: Option<String>,
    search_criteria: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateQuery {
    old_status_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateStatusQuery {
    test_status: Option<String>,
    test_result: Option<String>,
    test_type_id: Option<String>,
    new_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CategoryQuery {
    eu_vehicle_category: Option<String>,
}

/// Body carrying only the acting user.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserRequest {
    ms_user_details: Option<UserDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateRequest {
    ms_user_details: Option<UserDetails>,
    vin: String,
    primary_vrm: Option<String>,
    #[serde(default)]
    secondary_vrms: Vec<String>,
    tech_record: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateRequest {
    ms_user_details: Option<UserDetails>,
    primary_vrm: Option<String>,
    secondary_vrms: Option<Vec<String>>,
    trailer_id: Option<String>,
    tech_record: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArchiveRequest {
    ms_user_details: Option<UserDetails>,
    tech_record: Value,
    #[serde(default)]
    reason_for_archiving: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProvisionalRequest {
    ms_user_details: Option<UserDetails>,
    tech_record: Value,
}

pub(crate) async fn search_handler<R, N>(
    State(service): State<Arc<TechRecordService<R, N>>>,
    Path(identifier): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Response
where
    R: RecordStore + 'static,
    N: NumberGenerator + 'static,
{
    let criteria = match parse_optional(
        query.search_criteria.as_deref(),
        "searchCriteria",
        SearchCriteria::parse,
    ) {
        Ok(criteria) => criteria.unwrap_or_default(),
        Err(error) => return error.into_response(),
    };
    let view = match parse_optional(query.status.as_deref(), "status", StatusView::parse) {
        Ok(view) => view.unwrap_or_default(),
        Err(error) => return error.into_response(),
    };
    let wide = match query.format.as_deref().map(str::trim) {
        None | Some("") | Some("nested") => false,
        Some("wide") => true,
        Some(other) => {
            return TechRecordError::validation(format!("format '{other}' is not supported"))
                .into_response();
        }
    };

    let lookup = service.clone();
    let searched = run_blocking(move || lookup.search(&identifier, criteria, view)).await;
    let vehicles = match searched {
        Ok(vehicles) => vehicles,
        Err(error) => return error.into_response(),
    };

    if wide {
        match service.listing().to_wide(&vehicles) {
            Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
            Err(error) => error.into_response(),
        }
    } else {
        (StatusCode::OK, axum::Json(vehicles)).into_response()
    }
}

pub(crate) async fn create_handler<R, N>(
    State(service): State<Arc<TechRecordService<R, N>>>,
    axum::Json(request): axum::Json<CreateRequest>,
) -> Response
where
    R: RecordStore + 'static,
    N: NumberGenerator + 'static,
{
    let result = run_blocking(move || {
        let user = require_user(request.ms_user_details)?;
        let tech_record = parse_tech_record(request.tech_record)?;
        let draft = NewVehicle {
            vin: request.vin,
            primary_vrm: request.primary_vrm,
            secondary_vrms: request.secondary_vrms,
            tech_record,
        };
        service.create(draft, user)
    })
    .await;

    match result {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn update_handler<R, N>(
    State(service): State<Arc<TechRecordService<R, N>>>,
    Path(system_number): Path<String>,
    Query(query): Query<UpdateQuery>,
    axum::Json(request): axum::Json<UpdateRequest>,
) -> Response
where
    R: RecordStore + 'static,
    N: NumberGenerator + 'static,
{
    let result = run_blocking(move || {
        let user = require_user(request.ms_user_details)?;
        let old_status = parse_optional(
            query.old_status_code.as_deref(),
            "oldStatusCode",
            TechRecordStatus::parse,
        )?;
        let amendment = Amendment {
            primary_vrm: request.primary_vrm,
            secondary_vrms: request.secondary_vrms,
            trailer_id: request.trailer_id,
            tech_record: parse_tech_record(request.tech_record)?,
            old_status,
        };
        service.update(&SystemNumber(system_number), amendment, user)
    })
    .await;

    match result {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn archive_handler<R, N>(
    State(service): State<Arc<TechRecordService<R, N>>>,
    Path(system_number): Path<String>,
    axum::Json(request): axum::Json<ArchiveRequest>,
) -> Response
where
    R: RecordStore + 'static,
    N: NumberGenerator + 'static,
{
    let result = run_blocking(move || {
        let user = require_user(request.ms_user_details)?;
        let submitted = parse_tech_record(request.tech_record)?;
        service.archive(
            &SystemNumber(system_number),
            &submitted,
            &request.reason_for_archiving,
            user,
        )
    })
    .await;

    match result {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn update_status_handler<R, N>(
    State(service): State<Arc<TechRecordService<R, N>>>,
    Path(system_number): Path<String>,
    Query(query): Query<UpdateStatusQuery>,
    axum::Json(request): axum::Json<UserRequest>,
) -> Response
where
    R: RecordStore + 'static,
    N: NumberGenerator + 'static,
{
    let result = run_blocking(move || {
        let user = require_user(request.ms_user_details)?;
        let outcome = TestOutcome::new(
            required(query.test_status, "testStatus")?,
            required(query.test_result, "testResult")?,
            required(query.test_type_id, "testTypeId")?,
        );
        let target = parse_optional(query.new_status.as_deref(), "newStatus", TechRecordStatus::parse)?;
        service.promote_by_test_outcome(&SystemNumber(system_number), &outcome, target, user)
    })
    .await;

    match result {
        Ok(PromotionOutcome::Promoted(record)) => {
            (StatusCode::OK, axum::Json(record)).into_response()
        }
        Ok(PromotionOutcome::NotRequired) => {
            let payload = json!({ "message": "No status update required" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn add_provisional_handler<R, N>(
    State(service): State<Arc<TechRecordService<R, N>>>,
    Path(system_number): Path<String>,
    axum::Json(request): axum::Json<ProvisionalRequest>,
) -> Response
where
    R: RecordStore + 'static,
    N: NumberGenerator + 'static,
{
    let result = run_blocking(move || {
        let user = require_user(request.ms_user_details)?;
        let candidate = parse_tech_record(request.tech_record)?;
        service.add_provisional_record(&SystemNumber(system_number), candidate, user)
    })
    .await;

    match result {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn update_eu_vehicle_category_handler<R, N>(
    State(service): State<Arc<TechRecordService<R, N>>>,
    Path(system_number): Path<String>,
    Query(query): Query<CategoryQuery>,
    axum::Json(request): axum::Json<UserRequest>,
) -> Response
where
    R: RecordStore + 'static,
    N: NumberGenerator + 'static,
{
    let result = run_blocking(move || {
        let user = require_user(request.ms_user_details)?;
        let raw = required(query.eu_vehicle_category, "euVehicleCategory")?;
        let category = EuVehicleCategory::parse(&raw).ok_or_else(|| {
            TechRecordError::validation(format!("euVehicleCategory '{raw}' is not recognised"))
        })?;
        service.update_eu_vehicle_category(&SystemNumber(system_number), category, user)
    })
    .await;

    match result {
        Ok(CategoryUpdate::Updated(record)) => (StatusCode::OK, axum::Json(record)).into_response(),
        Ok(CategoryUpdate::NoUpdateRequired) => {
            let payload = json!({ "message": "No EU vehicle category update required" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

/// Runs a store-bound workflow on the blocking pool; writes may sleep between retries.
async fn run_blocking<T, F>(work: F) -> Result<T, TechRecordError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TechRecordError> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(err) => Err(TechRecordError::Internal(format!(
            "workflow task failed: {err}"
        ))),
    }
}

fn require_user(details: Option<UserDetails>) -> Result<UserDetails, TechRecordError> {
    details
        .filter(|user| !user.id.trim().is_empty() && !user.name.trim().is_empty())
        .ok_or_else(|| TechRecordError::validation("msUserDetails is required"))
}

fn required(value: Option<String>, name: &str) -> Result<String, TechRecordError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| TechRecordError::validation(format!("{name} is required")))
}

fn parse_optional<T>(
    raw: Option<&str>,
    name: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, TechRecordError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(None),
        Some(raw) => parse(raw)
            .map(Some)
            .ok_or_else(|| TechRecordError::validation(format!("{name} '{raw}' is not recognised"))),
    }
}

/// Accepts a single version object or a one-element array of them.
fn parse_tech_record(payload: Value) -> Result<TechRecordVersion, TechRecordError> {
    let payload = match payload {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        Value::Array(_) => {
            return Err(TechRecordError::validation(
                "techRecord must contain exactly one version",
            ));
        }
        other => other,
    };
    VehicleTypeProcessor::parse_version(payload)
}
