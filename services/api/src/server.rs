use crate::cli::ServeArgs;
use crate::infra::{build_collaborators, AppState};
use crate::routes::with_volunteer_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use volunteer_hub::config::AppConfig;
use volunteer_hub::error::AppError;
use volunteer_hub::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let collaborators = build_collaborators(&config.volunteers)?;
    let volunteer_service = Arc::new(collaborators.service(&config.volunteers));

    let app = with_volunteer_routes(volunteer_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        dispatch = ?config.volunteers.dispatch_mode,
        enforce_active_task = config.volunteers.enforce_active_task,
        "volunteer hub ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
