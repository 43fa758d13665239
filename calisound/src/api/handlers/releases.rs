//! Release planning: plan CRUD, the promotional timeline, and AI copy.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use sqlx::PgConnection;
use utoipa::IntoParams;

use crate::{
    AppState,
    api::models::{
        auth::CurrentUser,
        pagination::{PaginatedResponse, Pagination},
        releases::{
            CopyResponse, CopyStatus, PlanCreate, PlanDetailResponse, PlanResponse, PlanStatus, PlanUpdate,
            TaskResponse, TaskToggleRequest,
        },
    },
    auth::require_admin,
    db::{
        errors::DbError,
        handlers::{
            Repository,
            activity::ActivityLogs,
            releases::{PlanFilter, ReleasePlans},
        },
        models::{
            activity::ActivityCreateDBRequest,
            releases::{CopyUpsertDBRequest, PlanDBResponse},
        },
    },
    errors::Error,
    planning::timeline::generate_tasks,
    platforms::Platform,
    types::{PlanId, TaskId},
};

fn plan_not_found(id: PlanId) -> Error {
    Error::NotFound {
        resource: "Release plan".to_string(),
        id: id.to_string(),
    }
}

fn pending_copy_row(plan_id: PlanId, platform: Platform) -> CopyUpsertDBRequest {
    CopyUpsertDBRequest {
        plan_id,
        platform: platform.as_str().to_string(),
        body: None,
        model: None,
        status: CopyStatus::Pending.as_str().to_string(),
        error: None,
    }
}

/// Kick off background copy generation for a plan.
///
/// Fire and forget: the request that triggered this returns immediately and
/// each platform's row is flipped to generated or failed as results land.
/// Without an API key the rows simply stay pending.
fn spawn_copy_generation(state: &AppState, plan: &PlanDBResponse, platforms: Vec<Platform>) {
    if platforms.is_empty() || !state.copy.enabled() {
        return;
    }

    let db = state.db.clone();
    let generator = state.copy.clone();
    let plan_id = plan.id;
    let title = plan.title.clone();
    let artist = plan.artist.clone();
    let release_date = plan.release_date;

    tokio::spawn(async move {
        for platform in platforms {
            let row = match generator.generate(&title, &artist, release_date, platform).await {
                Ok(body) => CopyUpsertDBRequest {
                    plan_id,
                    platform: platform.as_str().to_string(),
                    body: Some(body),
                    model: Some(generator.model().to_string()),
                    status: CopyStatus::Generated.as_str().to_string(),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(%plan_id, platform = %platform, error = %e, "Copy generation failed");
                    CopyUpsertDBRequest {
                        plan_id,
                        platform: platform.as_str().to_string(),
                        body: None,
                        model: Some(generator.model().to_string()),
                        status: CopyStatus::Failed.as_str().to_string(),
                        error: Some(e.user_message()),
                    }
                }
            };

            let mut conn = match db.acquire().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(%plan_id, error = %e, "Could not store generated copy");
                    return;
                }
            };
            if let Err(e) = ReleasePlans::new(&mut conn).upsert_copy(&row).await {
                tracing::warn!(%plan_id, platform = %row.platform, error = %e, "Could not store generated copy");
            }
        }
    });
}

async fn plan_detail(conn: &mut PgConnection, plan: PlanDBResponse) -> Result<PlanDetailResponse, Error> {
    let mut repo = ReleasePlans::new(conn);
    let tasks = repo.list_tasks(plan.id).await?;
    let copy = repo.list_copy(plan.id).await?;

    Ok(PlanDetailResponse {
        plan: PlanResponse::try_from(plan)?,
        tasks: tasks.into_iter().map(TaskResponse::from).collect(),
        copy: copy.into_iter().map(CopyResponse::try_from).collect::<Result<Vec<_>, _>>()?,
    })
}

/// Plan listing filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PlanQuery {
    /// Restrict to one lifecycle status
    pub status: Option<PlanStatus>,
}

/// Create a release plan
///
/// The promotional timeline is generated immediately; per-platform copy is
/// generated in the background.
#[utoipa::path(
    post,
    path = "/admin/api/v1/releases",
    request_body = PlanCreate,
    tag = "releases",
    responses(
        (status = 201, description = "Plan created with its timeline", body = PlanDetailResponse),
        (status = 400, description = "Invalid plan"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<PlanCreate>,
) -> Result<(StatusCode, Json<PlanDetailResponse>), Error> {
    require_admin(&user)?;
    request.validate()?;
    let platforms = request.platforms.clone();

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = ReleasePlans::new(&mut tx);
    let plan = repo.create(&request.into_db_request(user.id)).await?;

    let tasks = generate_tasks(plan.id, &plan.title, &plan.artist, plan.release_date);
    repo.insert_tasks(plan.id, &tasks).await?;
    for platform in &platforms {
        repo.upsert_copy(&pending_copy_row(plan.id, *platform)).await?;
    }

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "create", "release_plan", Some(plan.id.to_string()))
                .with_detail(serde_json::json!({"title": plan.title, "release_date": plan.release_date})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    spawn_copy_generation(&state, &plan, platforms);

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let detail = plan_detail(&mut pool_conn, plan).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// List release plans
#[utoipa::path(
    get,
    path = "/admin/api/v1/releases",
    tag = "releases",
    params(PlanQuery, Pagination),
    responses(
        (status = 200, description = "Plans, upcoming first", body = PaginatedResponse<PlanResponse>),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_plans(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PlanQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<PlanResponse>>, Error> {
    require_admin(&user)?;

    let (skip, limit) = pagination.params();
    let filter = PlanFilter {
        status: query.status.map(|s| s.as_str().to_string()),
        skip,
        limit,
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ReleasePlans::new(&mut pool_conn);

    let plans = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = plans.into_iter().map(PlanResponse::try_from).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Get a release plan with its timeline and copy
#[utoipa::path(
    get,
    path = "/admin/api/v1/releases/{id}",
    tag = "releases",
    params(("id" = PlanId, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Plan found", body = PlanDetailResponse),
        (status = 404, description = "Plan not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PlanId>,
) -> Result<Json<PlanDetailResponse>, Error> {
    require_admin(&user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ReleasePlans::new(&mut pool_conn);

    let plan = repo.get_by_id(id).await?.ok_or_else(|| plan_not_found(id))?;
    let detail = plan_detail(&mut pool_conn, plan).await?;
    Ok(Json(detail))
}

/// Update a release plan
///
/// Changing the title, artist, or release date rebuilds the timeline from
/// scratch, which resets any done flags.
#[utoipa::path(
    patch,
    path = "/admin/api/v1/releases/{id}",
    request_body = PlanUpdate,
    tag = "releases",
    params(("id" = PlanId, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Plan updated", body = PlanDetailResponse),
        (status = 404, description = "Plan not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PlanId>,
    Json(request): Json<PlanUpdate>,
) -> Result<Json<PlanDetailResponse>, Error> {
    require_admin(&user)?;

    let rebuild_timeline = request.title.is_some() || request.artist.is_some() || request.release_date.is_some();

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = ReleasePlans::new(&mut tx);
    let plan = match repo.update(id, &request.into()).await {
        Ok(plan) => plan,
        Err(DbError::NotFound) => return Err(plan_not_found(id)),
        Err(e) => return Err(e.into()),
    };

    if rebuild_timeline {
        repo.clear_tasks(plan.id).await?;
        let tasks = generate_tasks(plan.id, &plan.title, &plan.artist, plan.release_date);
        repo.insert_tasks(plan.id, &tasks).await?;
    }

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "update", "release_plan", Some(plan.id.to_string()))
                .with_detail(serde_json::json!({"title": plan.title, "timeline_rebuilt": rebuild_timeline})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let detail = plan_detail(&mut pool_conn, plan).await?;
    Ok(Json(detail))
}

/// Delete a release plan
#[utoipa::path(
    delete,
    path = "/admin/api/v1/releases/{id}",
    tag = "releases",
    params(("id" = PlanId, Path, description = "Plan ID")),
    responses(
        (status = 204, description = "Plan deleted with its tasks and copy"),
        (status = 404, description = "Plan not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_plan(State(state): State<AppState>, user: CurrentUser, Path(id): Path<PlanId>) -> Result<StatusCode, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = ReleasePlans::new(&mut tx);
    if !repo.delete(id).await? {
        return Err(plan_not_found(id));
    }

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(&ActivityCreateDBRequest::new(Some(user.id), "delete", "release_plan", Some(id.to_string())))
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a timeline task done or not done
#[utoipa::path(
    patch,
    path = "/admin/api/v1/releases/{id}/tasks/{task_id}",
    request_body = TaskToggleRequest,
    tag = "releases",
    params(
        ("id" = PlanId, Path, description = "Plan ID"),
        ("task_id" = TaskId, Path, description = "Task ID"),
    ),
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 404, description = "Task not found on this plan"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn toggle_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, task_id)): Path<(PlanId, TaskId)>,
    Json(request): Json<TaskToggleRequest>,
) -> Result<Json<TaskResponse>, Error> {
    require_admin(&user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ReleasePlans::new(&mut pool_conn);

    let task = repo
        .set_task_done(id, task_id, request.done)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Task".to_string(),
            id: task_id.to_string(),
        })?;

    Ok(Json(TaskResponse::from(task)))
}

/// Regenerate one platform's copy
///
/// Resets the row to pending and queues a fresh generation.
#[utoipa::path(
    post,
    path = "/admin/api/v1/releases/{id}/copy/{platform}/regenerate",
    tag = "releases",
    params(
        ("id" = PlanId, Path, description = "Plan ID"),
        ("platform" = String, Path, description = "Social platform"),
    ),
    responses(
        (status = 202, description = "Generation queued", body = CopyResponse),
        (status = 400, description = "Platform not on this plan, or generation not configured"),
        (status = 404, description = "Plan not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn regenerate_copy(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, platform)): Path<(PlanId, String)>,
) -> Result<(StatusCode, Json<CopyResponse>), Error> {
    require_admin(&user)?;

    let platform: Platform = platform.parse()?;
    if !state.copy.enabled() {
        return Err(Error::BadRequest {
            message: "Copy generation is not configured (no AI API key)".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ReleasePlans::new(&mut pool_conn);

    let plan = repo.get_by_id(id).await?.ok_or_else(|| plan_not_found(id))?;
    if !plan.platforms.iter().any(|p| p == platform.as_str()) {
        return Err(Error::BadRequest {
            message: format!("Plan does not target {platform}"),
        });
    }

    let row = repo.upsert_copy(&pending_copy_row(plan.id, platform)).await?;
    spawn_copy_generation(&state, &plan, vec![platform]);

    Ok((StatusCode::ACCEPTED, Json(CopyResponse::try_from(row)?)))
}
