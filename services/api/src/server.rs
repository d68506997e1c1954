use crate::cli::ServeArgs;
use crate::infra::{build_engines, AppState, DocumentBackend};
use crate::routes::with_procurement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use procurement::config::AppConfig;
use procurement::error::AppError;
use procurement::telemetry;
use procurement::workflows::SystemClock;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let documents = Arc::new(DocumentBackend::from_config(&config.storage));
    let document_backend = documents.label();
    let engines = build_engines(&config, documents, Arc::new(SystemClock));

    let app = with_procurement_routes(engines.tenders, engines.carnival)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        document_backend,
        capacity_policy = config.bidding.carnival_capacity.label(),
        "procurement bidding engine ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
