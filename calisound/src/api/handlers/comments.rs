//! Set comments: public submission and reading, admin moderation queue.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    api::models::{
        auth::CurrentUser,
        comments::{AdminCommentResponse, CommentResponse, CommentStatus, CommentStatusUpdate, CommentSubmit},
        pagination::{PaginatedResponse, Pagination},
        sets::SetStatus,
    },
    auth::require_admin,
    db::{
        errors::DbError,
        handlers::{
            Repository,
            activity::ActivityLogs,
            comments::{CommentFilter, Comments},
            sets::Sets,
        },
        models::{activity::ActivityCreateDBRequest, comments::CommentUpdateDBRequest, sets::SetDBResponse},
    },
    errors::Error,
    limits::client_ip,
    types::{CommentId, SetId},
};

async fn published_set_by_slug(conn: &mut sqlx::PgConnection, slug: &str) -> Result<SetDBResponse, Error> {
    let mut sets = Sets::new(conn);
    sets.get_by_slug(slug)
        .await?
        .filter(|s| s.status == SetStatus::Published.as_str())
        .ok_or_else(|| Error::NotFound {
            resource: "Set".to_string(),
            id: slug.to_string(),
        })
}

/// List approved comments on a set
#[utoipa::path(
    get,
    path = "/api/v1/sets/{slug}/comments",
    tag = "comments",
    params(("slug" = String, Path, description = "Set slug"), Pagination),
    responses(
        (status = 200, description = "Approved comments, oldest first", body = PaginatedResponse<CommentResponse>),
        (status = 404, description = "No published set with this slug"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_set_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<CommentResponse>>, Error> {
    let (skip, limit) = pagination.params();

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let set = published_set_by_slug(&mut pool_conn, &slug).await?;

    let filter = CommentFilter {
        set_id: Some(set.id),
        status: Some(CommentStatus::Approved.as_str().to_string()),
        skip,
        limit,
    };

    let mut repo = Comments::new(&mut pool_conn);
    let comments = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = comments.into_iter().map(CommentResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Submit a comment on a set
///
/// Comments start in the pending state and only appear publicly once an
/// admin approves them. Submission is rate limited per client IP.
#[utoipa::path(
    post,
    path = "/api/v1/sets/{slug}/comments",
    request_body = CommentSubmit,
    tag = "comments",
    params(("slug" = String, Path, description = "Set slug")),
    responses(
        (status = 202, description = "Comment accepted for moderation"),
        (status = 400, description = "Invalid submission"),
        (status = 404, description = "No published set with this slug"),
        (status = 429, description = "Too many submissions from this address"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn submit_comment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CommentSubmit>,
) -> Result<StatusCode, Error> {
    let ip = client_ip(&headers);
    state.limiter.check("comments", &ip, &state.config.limits.comments)?;
    request.validate()?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let set = published_set_by_slug(&mut pool_conn, &slug).await?;

    let mut repo = Comments::new(&mut pool_conn);
    repo.create(&request.into_db_request(set.id, ip)).await?;

    Ok(StatusCode::ACCEPTED)
}

/// Moderation queue filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AdminCommentQuery {
    /// Restrict to one moderation status
    pub status: Option<CommentStatus>,
    /// Restrict to one set
    pub set_id: Option<SetId>,
}

/// List comments for moderation
#[utoipa::path(
    get,
    path = "/admin/api/v1/comments",
    tag = "admin",
    params(AdminCommentQuery, Pagination),
    responses(
        (status = 200, description = "Comments in any status", body = PaginatedResponse<AdminCommentResponse>),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_comments(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AdminCommentQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<AdminCommentResponse>>, Error> {
    require_admin(&user)?;

    let (skip, limit) = pagination.params();
    let filter = CommentFilter {
        set_id: query.set_id,
        status: query.status.map(|s| s.as_str().to_string()),
        skip,
        limit,
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Comments::new(&mut pool_conn);

    let comments = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = comments
        .into_iter()
        .map(AdminCommentResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Change a comment's moderation status
#[utoipa::path(
    patch,
    path = "/admin/api/v1/comments/{id}/status",
    request_body = CommentStatusUpdate,
    tag = "admin",
    params(("id" = CommentId, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment updated", body = AdminCommentResponse),
        (status = 404, description = "Comment not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_comment_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CommentId>,
    Json(request): Json<CommentStatusUpdate>,
) -> Result<Json<AdminCommentResponse>, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let update = CommentUpdateDBRequest {
        status: request.status.as_str().to_string(),
    };
    let mut repo = Comments::new(&mut tx);
    let comment = match repo.update(id, &update).await {
        Ok(comment) => comment,
        Err(DbError::NotFound) => {
            return Err(Error::NotFound {
                resource: "Comment".to_string(),
                id: id.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "moderate", "comment", Some(comment.id.to_string()))
                .with_detail(serde_json::json!({"status": comment.status})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(AdminCommentResponse::try_from(comment)?))
}

/// Delete a comment
#[utoipa::path(
    delete,
    path = "/admin/api/v1/comments/{id}",
    tag = "admin",
    params(("id" = CommentId, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 404, description = "Comment not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CommentId>,
) -> Result<StatusCode, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Comments::new(&mut tx);
    if !repo.delete(id).await? {
        return Err(Error::NotFound {
            resource: "Comment".to_string(),
            id: id.to_string(),
        });
    }

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(&ActivityCreateDBRequest::new(Some(user.id), "delete", "comment", Some(id.to_string())))
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}
