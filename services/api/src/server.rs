use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryDocumentStore, SequenceNumberGenerator, WideRowStore};
use crate::routes::with_record_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use vehicle_tech_records::config::{AppConfig, ConfigError};
use vehicle_tech_records::error::AppError;
use vehicle_tech_records::records::TechRecordService;
use vehicle_tech_records::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let documents = match args.documents_dir.take() {
        Some(dir) => {
            let store = InMemoryDocumentStore::from_dir(&dir)
                .map_err(|err| ConfigError::InvalidDocumentsDir(err.to_string()))?;
            info!(
                dir = %dir.display(),
                documents = store.len().unwrap_or_default(),
                "documents loaded"
            );
            store
        }
        None => {
            warn!("no documents directory given; document downloads will return 404");
            InMemoryDocumentStore::default()
        }
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        documents: Arc::new(documents),
    };

    let store = Arc::new(WideRowStore::default());
    let numbers = Arc::new(SequenceNumberGenerator::from_config(&config.records));
    let record_service = Arc::new(TechRecordService::new(
        store,
        numbers,
        config.records.clone(),
    ));

    let app = with_record_routes(record_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        write_attempts = config.records.write_attempts,
        "tech record service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
