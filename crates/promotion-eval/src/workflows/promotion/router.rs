use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::error;

use super::access::{require_token, AccessPolicy, Caller};
use super::domain::{CandidateCategory, Dimension};
use super::repository::{PersonnelStore, RepositoryError, ResultSink};
use super::selection::{SelectionPayload, ValidationError};
use super::service::{PromotionScoringService, ScoringServiceError};

type SharedService<D, S> = Arc<PromotionScoringService<D, S>>;

/// Router builder exposing the promotion endpoints under `/v1/api`, guarded by `policy`.
pub fn promotion_router<D, S>(
    service: Arc<PromotionScoringService<D, S>>,
    policy: Arc<AccessPolicy>,
) -> Router
where
    D: PersonnelStore + 'static,
    S: ResultSink + 'static,
{
    Router::new()
        .route("/v1/api/selections", post(selection_handler::<D, S>))
        .route("/v1/api/candidates", get(candidates_handler::<D, S>))
        .route(
            "/v1/api/evaluation-structure",
            get(structure_handler::<D, S>),
        )
        .route(
            "/v1/api/evaluation-structure/refresh",
            post(refresh_structure_handler::<D, S>),
        )
        .route(
            "/v1/api/scores/:dimension",
            post(run_scores_handler::<D, S>).get(stored_scores_handler::<D, S>),
        )
        .route_layer(middleware::from_fn_with_state(policy, require_token))
        .with_state(service)
}

fn success(data: Value, count: Option<usize>, metadata: Value) -> Response {
    let mut payload = json!({
        "status": "success",
        "data": data,
        "metadata": metadata,
    });
    if let (Some(count), Some(object)) = (count, payload.as_object_mut()) {
        object.insert("count".to_string(), json!(count));
    }
    (StatusCode::OK, Json(payload)).into_response()
}

fn failure(status: StatusCode, message: impl Into<String>, details: Option<Value>) -> Response {
    let mut payload = json!({
        "status": "error",
        "message": message.into(),
        "timestamp": Utc::now().to_rfc3339(),
    });
    if let (Some(details), Some(object)) = (details, payload.as_object_mut()) {
        object.insert("details".to_string(), details);
    }
    (status, Json(payload)).into_response()
}

fn valid_categories() -> Value {
    CandidateCategory::ALL
        .iter()
        .map(|category| (category.code().to_string(), json!(category.description())))
        .collect::<serde_json::Map<String, Value>>()
        .into()
}

fn validation_failure(error: &ValidationError) -> Response {
    let details = match error {
        ValidationError::MissingFields { missing } => json!({
            "missing": missing,
            "required": {
                "fecha": "YYYY-MM-DD",
                "grado": "grade code",
                "categoria": CandidateCategory::ALL
                    .iter()
                    .map(CandidateCategory::code)
                    .collect::<Vec<_>>(),
            },
        }),
        ValidationError::InvalidCategory { received } => json!({
            "valid_categories": valid_categories(),
            "received": received,
        }),
        ValidationError::InvalidDate { received }
        | ValidationError::InvalidGrade { received } => json!({ "received": received }),
    };
    failure(StatusCode::BAD_REQUEST, error.to_string(), Some(details))
}

fn service_failure(error: ScoringServiceError, context: &str) -> Response {
    match error {
        ScoringServiceError::Validation(error) => validation_failure(&error),
        ScoringServiceError::DataAccess(RepositoryError::NotFound) => {
            failure(StatusCode::NOT_FOUND, format!("{context}: no records"), None)
        }
        ScoringServiceError::DataAccess(error) => {
            error!(%error, context, "data access failed");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{context}: data access failed"),
                Some(json!(error.to_string())),
            )
        }
    }
}

fn parse_dimension(raw: &str) -> Result<Dimension, Response> {
    Dimension::from_slug(raw).ok_or_else(|| {
        let known: Vec<&str> = Dimension::ALL.iter().map(Dimension::slug).collect();
        failure(
            StatusCode::NOT_FOUND,
            format!("unknown dimension '{raw}'"),
            Some(json!({ "dimensions": known })),
        )
    })
}

pub(crate) async fn selection_handler<D, S>(
    State(service): State<SharedService<D, S>>,
    body: Bytes,
) -> Response
where
    D: PersonnelStore + 'static,
    S: ResultSink + 'static,
{
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        SelectionPayload::default()
    } else {
        match serde_json::from_slice::<SelectionPayload>(&body) {
            Ok(payload) => payload,
            Err(err) => {
                return failure(
                    StatusCode::BAD_REQUEST,
                    "request body must be a JSON object",
                    Some(json!(err.to_string())),
                )
            }
        }
    };

    match service.select(payload) {
        Ok(outcome) => {
            let request = outcome.request;
            let metadata = json!({
                "as_of": request.as_of,
                "grade": request.grade,
                "category": {
                    "code": request.category.code(),
                    "description": request.category.description(),
                },
                "total": outcome.selected.len(),
                "roster_replaced": outcome.replaced,
            });
            let count = outcome.selected.len();
            success(json!(outcome.selected), Some(count), metadata)
        }
        Err(error) => service_failure(error, "candidate selection"),
    }
}

pub(crate) async fn candidates_handler<D, S>(
    State(service): State<SharedService<D, S>>,
) -> Response
where
    D: PersonnelStore + 'static,
    S: ResultSink + 'static,
{
    match service.candidates() {
        Ok(candidates) => {
            let count = candidates.len();
            let metadata = json!({ "ordered_by": "id" });
            success(json!(candidates), Some(count), metadata)
        }
        Err(error) => service_failure(error, "candidate listing"),
    }
}

pub(crate) async fn structure_handler<D, S>(
    State(service): State<SharedService<D, S>>,
) -> Response
where
    D: PersonnelStore + 'static,
    S: ResultSink + 'static,
{
    match service.evaluation_structure() {
        Ok(structure) => {
            let metadata = json!({
                "loaded_at": structure.loaded_at,
                "total_max_points": structure.total_max_points(),
                "timestamp": Utc::now().to_rfc3339(),
            });
            success(json!(structure.aspects), None, metadata)
        }
        Err(error) => service_failure(error, "evaluation structure"),
    }
}

pub(crate) async fn refresh_structure_handler<D, S>(
    State(service): State<SharedService<D, S>>,
    Extension(caller): Extension<Caller>,
) -> Response
where
    D: PersonnelStore + 'static,
    S: ResultSink + 'static,
{
    if !caller.is_admin() {
        return failure(StatusCode::FORBIDDEN, "administrator role required", None);
    }

    let cleared = service.refresh_structure();
    success(
        json!({ "cleared": cleared }),
        None,
        json!({ "timestamp": Utc::now().to_rfc3339() }),
    )
}

pub(crate) async fn run_scores_handler<D, S>(
    State(service): State<SharedService<D, S>>,
    Path(dimension): Path<String>,
) -> Response
where
    D: PersonnelStore + 'static,
    S: ResultSink + 'static,
{
    let dimension = match parse_dimension(&dimension) {
        Ok(dimension) => dimension,
        Err(response) => return response,
    };

    // Runs hold the dimension lock and call the stores synchronously, so they stay off the
    // async workers.
    let worker = Arc::clone(&service);
    let outcome = match tokio::task::spawn_blocking(move || worker.run(dimension)).await {
        Ok(outcome) => outcome,
        Err(join_error) => {
            error!(%dimension, error = %join_error, "scoring run aborted");
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{} scoring run aborted", dimension.label()),
                None,
            );
        }
    };

    match outcome {
        Ok(run) => {
            let count = run.results.len();
            let metadata = json!({
                "dimension": run.dimension,
                "label": run.dimension.label(),
                "max_points": run.max_points,
                "scheme": scheme_metadata(&service, dimension),
                "persisted": run.persisted,
                "computed_at": run.computed_at,
            });
            success(json!(run.results), Some(count), metadata)
        }
        Err(error) => service_failure(error, dimension.label()),
    }
}

pub(crate) async fn stored_scores_handler<D, S>(
    State(service): State<SharedService<D, S>>,
    Path(dimension): Path<String>,
) -> Response
where
    D: PersonnelStore + 'static,
    S: ResultSink + 'static,
{
    let dimension = match parse_dimension(&dimension) {
        Ok(dimension) => dimension,
        Err(response) => return response,
    };

    match service.results(dimension) {
        Ok(results) => {
            let count = results.len();
            let metadata = json!({
                "dimension": dimension,
                "label": dimension.label(),
                "max_points": service.engine().config().max_points(dimension),
                "timestamp": Utc::now().to_rfc3339(),
            });
            success(json!(results), Some(count), metadata)
        }
        Err(error) => service_failure(error, dimension.label()),
    }
}

/// Rubric parameters reported alongside a run so callers can audit the points.
fn scheme_metadata<D, S>(service: &PromotionScoringService<D, S>, dimension: Dimension) -> Value
where
    D: PersonnelStore + 'static,
    S: ResultSink + 'static,
{
    let config = service.engine().config();
    match dimension {
        Dimension::MilitaryCourses => json!({
            "grade_match_points": config.military.grade_match_points,
            "category_bonus_points": config.military.category_bonus_points,
            "other_course_points": config.military.other_course_points,
            "catalog": config.military.catalog,
        }),
        Dimension::CivilianCourses => json!({
            "levels": config.civilian.primary_levels,
            "other_levels": config.civilian.other_levels,
            "other_cap": config.civilian.other_cap,
        }),
        Dimension::Languages => json!({
            "points_by_count": config.languages.points_by_count,
            "weighted_share_percent": config.weighted_share_percent,
        }),
        Dimension::InstitutionalWork => json!({
            "points_by_count": config.institutional_work.points_by_count,
            "weighted_share_percent": config.weighted_share_percent,
            "counted_grade": "current",
        }),
    }
}
