use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{
    Actor, ApplyRequest, DeselectRequest, ManageRequest, TaskId, UserId, VolunteerId,
    VolunteerUpdate, WithdrawRequest,
};
use super::error::VolunteerError;
use super::notifications::VolunteerNotifier;
use super::opportunity::OpportunityLookup;
use super::repository::VolunteerRepository;
use super::resumes::ResumeStore;
use super::service::VolunteerService;

/// Header carrying the user id established by the upstream token check.
pub const ACTOR_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's display name.
pub const ACTOR_NAME_HEADER: &str = "x-user-name";

type SharedService<R, O, N, S> = Arc<VolunteerService<R, O, N, S>>;

/// Router builder exposing the volunteer endpoints.
pub fn volunteer_router<R, O, N, S>(service: SharedService<R, O, N, S>) -> Router
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    Router::new()
        .route("/api/volunteer", post(apply_handler::<R, O, N, S>))
        .route(
            "/api/volunteer/user/resumes",
            get(own_resumes_handler::<R, O, N, S>),
        )
        .route(
            "/api/volunteer/delete",
            post(withdraw_handler::<R, O, N, S>),
        )
        .route("/api/volunteer/assign", post(assign_handler::<R, O, N, S>))
        .route("/api/volunteer/select", post(select_handler::<R, O, N, S>))
        .route(
            "/api/volunteer/select/remove",
            put(deselect_handler::<R, O, N, S>),
        )
        .route(
            "/api/volunteer/complete",
            post(complete_handler::<R, O, N, S>),
        )
        .route(
            "/api/volunteer/:id/resume",
            get(resume_access_handler::<R, O, N, S>),
        )
        .route(
            "/api/volunteer/:id",
            get(get_handler::<R, O, N, S>)
                .put(update_handler::<R, O, N, S>)
                .delete(remove_handler::<R, O, N, S>),
        )
        .with_state(service)
}

#[async_trait]
impl<St> FromRequestParts<St> for Actor
where
    St: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;
        let name = parts
            .headers
            .get(ACTOR_NAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(Actor {
            id: UserId(id),
            name,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskQuery {
    pub(crate) task_id: TaskId,
}

pub(crate) fn error_response(err: VolunteerError) -> Response {
    match err {
        VolunteerError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        VolunteerError::Validation(errors) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
        }
        VolunteerError::NotFound => {
            let payload = json!({ "error": VolunteerError::NotFound.to_string() });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        err @ VolunteerError::Conflict => {
            (StatusCode::CONFLICT, Json(json!({ "error": err.to_string() }))).into_response()
        }
        err @ VolunteerError::TaskNotActive { .. } => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))).into_response()
        }
        VolunteerError::Internal(detail) => {
            error!(%detail, "volunteer request failed");
            let payload = json!({ "error": VolunteerError::Internal(String::new()).to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

fn respond<T: serde::Serialize>(result: Result<T, VolunteerError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn apply_handler<R, O, N, S>(
    State(service): State<SharedService<R, O, N, S>>,
    actor: Actor,
    Json(request): Json<ApplyRequest>,
) -> Response
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    respond(service.apply(&actor, request))
}

pub(crate) async fn own_resumes_handler<R, O, N, S>(
    State(service): State<SharedService<R, O, N, S>>,
    actor: Actor,
) -> Response
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    respond(
        service
            .list_own_resumes(&actor)
            .map(|resumes| json!({ "resumes": resumes })),
    )
}

pub(crate) async fn resume_access_handler<R, O, N, S>(
    State(service): State<SharedService<R, O, N, S>>,
    actor: Actor,
    Path(id): Path<u64>,
    Query(query): Query<TaskQuery>,
) -> Response
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    respond(service.resume_access(&actor, VolunteerId(id), query.task_id))
}

pub(crate) async fn get_handler<R, O, N, S>(
    State(service): State<SharedService<R, O, N, S>>,
    _actor: Actor,
    Path(id): Path<u64>,
    Query(query): Query<TaskQuery>,
) -> Response
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    respond(service.get_volunteer(VolunteerId(id), query.task_id))
}

pub(crate) async fn update_handler<R, O, N, S>(
    State(service): State<SharedService<R, O, N, S>>,
    actor: Actor,
    Path(id): Path<u64>,
    Json(changes): Json<VolunteerUpdate>,
) -> Response
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    respond(service.update_volunteer(&actor, VolunteerId(id), changes))
}

pub(crate) async fn withdraw_handler<R, O, N, S>(
    State(service): State<SharedService<R, O, N, S>>,
    actor: Actor,
    Json(request): Json<WithdrawRequest>,
) -> Response
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    respond(service.withdraw(&actor, request.task_id))
}

pub(crate) async fn assign_handler<R, O, N, S>(
    State(service): State<SharedService<R, O, N, S>>,
    actor: Actor,
    Json(request): Json<ManageRequest>,
) -> Response
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    respond(service.assign(&actor, request))
}

pub(crate) async fn select_handler<R, O, N, S>(
    State(service): State<SharedService<R, O, N, S>>,
    actor: Actor,
    Json(request): Json<ManageRequest>,
) -> Response
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    respond(service.select(&actor, request))
}

pub(crate) async fn deselect_handler<R, O, N, S>(
    State(service): State<SharedService<R, O, N, S>>,
    actor: Actor,
    Json(request): Json<DeselectRequest>,
) -> Response
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    respond(service.deselect(&actor, request.task_id, request.volunteer_id))
}

pub(crate) async fn complete_handler<R, O, N, S>(
    State(service): State<SharedService<R, O, N, S>>,
    actor: Actor,
    Json(request): Json<ManageRequest>,
) -> Response
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    respond(service.complete(&actor, request))
}

pub(crate) async fn remove_handler<R, O, N, S>(
    State(service): State<SharedService<R, O, N, S>>,
    actor: Actor,
    Path(id): Path<u64>,
    Query(query): Query<TaskQuery>,
) -> Response
where
    R: VolunteerRepository + 'static,
    O: OpportunityLookup + 'static,
    N: VolunteerNotifier + 'static,
    S: ResumeStore + 'static,
{
    match service.remove(&actor, query.task_id, VolunteerId(id)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}
