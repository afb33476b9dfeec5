use crate::cli::ServeArgs;
use crate::infra::{log_changes, AppState, StoreBackend};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use complaint_desk::config::AppConfig;
use complaint_desk::error::AppError;
use complaint_desk::telemetry;
use complaint_desk::workflows::complaints::{
    AdminSession, ChangeFeed, ComplaintDesk, DeskOptions, LoggingCodeSender,
};
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

    let feed = ChangeFeed::new();
    let store = Arc::new(StoreBackend::open(&config.storage, feed.clone()));
    let backend = store.describe();
    let session = AdminSession::new(config.admin.clone(), feed.clone());
    let desk = Arc::new(ComplaintDesk::new(
        store,
        Arc::new(LoggingCodeSender),
        session,
        DeskOptions {
            verification: config.intake.verification,
            simulated_latency: config.intake.simulated_latency,
            session_idle: config.intake.session_idle,
        },
    ));

    tokio::spawn(log_changes(feed.subscribe()));

    let app = with_service_routes(desk)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, %backend, "complaint desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}
