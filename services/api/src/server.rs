use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryPersonnelStore, InMemoryResultStore};
use crate::routes::with_promotion_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use promotion_eval::config::AppConfig;
use promotion_eval::error::AppError;
use promotion_eval::telemetry;
use promotion_eval::workflows::promotion::{PromotionScoringService, RubricConfig};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let store = match args.data_dir.take() {
        Some(dir) => InMemoryPersonnelStore::from_data_dir(&dir)?,
        None => InMemoryPersonnelStore::default(),
    };
    let scoring_service = Arc::new(PromotionScoringService::new(
        Arc::new(store),
        Arc::new(InMemoryResultStore::default()),
        RubricConfig::default(),
    ));

    let policy = config.access.policy();
    if policy.is_open() {
        warn!("no access tokens configured; every caller is treated as admin");
    }

    let app = with_promotion_routes(scoring_service, Arc::new(policy))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "promotion evaluation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
