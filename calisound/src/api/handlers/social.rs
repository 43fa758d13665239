//! Social post composer: drafts, per-platform variants, validation, scheduling.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgConnection;
use utoipa::IntoParams;

use crate::{
    AppState,
    api::models::{
        auth::CurrentUser,
        pagination::{PaginatedResponse, Pagination},
        social::{
            JobResponse, JobStatus, PostCreate, PostDetailResponse, PostResponse, PostStatus, PostUpdate,
            ScheduleRequest, ValidationReport, VariantViolations,
        },
    },
    auth::require_admin,
    db::{
        errors::DbError,
        handlers::{
            Repository,
            activity::ActivityLogs,
            social::{JobFilter, PostFilter, SocialPosts},
        },
        models::{
            activity::ActivityCreateDBRequest,
            social::{JobCreateDBRequest, PostDBResponse, VariantDBResponse},
        },
    },
    errors::Error,
    platforms::{VariantDraft, validate_variant},
    types::{JobId, PostId, VariantId},
};

fn post_not_found(id: PostId) -> Error {
    Error::NotFound {
        resource: "Social post".to_string(),
        id: id.to_string(),
    }
}

/// Run every variant against its platform's rules.
fn validate_variants(variants: &[VariantDBResponse]) -> Result<ValidationReport, Error> {
    let mut violations = Vec::new();
    for variant in variants {
        let platform = variant.platform.parse()?;
        let issues = validate_variant(
            platform,
            &VariantDraft {
                body: &variant.body,
                hashtags: &variant.hashtags,
                media_aspect_ratio: variant.media_aspect_ratio.as_deref(),
                media_count: variant.media_count,
            },
        );
        if !issues.is_empty() {
            violations.push(VariantViolations { platform, issues });
        }
    }
    Ok(ValidationReport {
        valid: violations.is_empty(),
        violations,
    })
}

async fn post_detail(conn: &mut PgConnection, post: PostDBResponse) -> Result<PostDetailResponse, Error> {
    let mut repo = SocialPosts::new(conn);
    let variants = repo.list_variants(post.id).await?;
    Ok(PostDetailResponse {
        post: PostResponse::try_from(post)?,
        variants: variants
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

/// Post listing filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PostQuery {
    /// Restrict to one lifecycle status
    pub status: Option<PostStatus>,
}

/// Create a social post
#[utoipa::path(
    post,
    path = "/admin/api/v1/social/posts",
    request_body = PostCreate,
    tag = "social",
    responses(
        (status = 201, description = "Post created with its variants", body = PostDetailResponse),
        (status = 400, description = "Invalid post"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<PostCreate>,
) -> Result<(StatusCode, Json<PostDetailResponse>), Error> {
    require_admin(&user)?;
    request.validate()?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = SocialPosts::new(&mut tx);
    let post = repo.create(&request.into_db_request(user.id)).await?;
    for variant in request.variants {
        repo.upsert_variant(&variant.into_db_request(post.id)).await?;
    }

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "create", "social_post", Some(post.id.to_string()))
                .with_detail(serde_json::json!({"title": post.title})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let detail = post_detail(&mut pool_conn, post).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// List social posts
#[utoipa::path(
    get,
    path = "/admin/api/v1/social/posts",
    tag = "social",
    params(PostQuery, Pagination),
    responses(
        (status = 200, description = "Posts, newest first", body = PaginatedResponse<PostResponse>),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_posts(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PostQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<PostResponse>>, Error> {
    require_admin(&user)?;

    let (skip, limit) = pagination.params();
    let filter = PostFilter {
        status: query.status.map(|s| s.as_str().to_string()),
        skip,
        limit,
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SocialPosts::new(&mut pool_conn);

    let posts = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = posts.into_iter().map(PostResponse::try_from).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Get a social post with its variants
#[utoipa::path(
    get,
    path = "/admin/api/v1/social/posts/{id}",
    tag = "social",
    params(("id" = PostId, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post found", body = PostDetailResponse),
        (status = 404, description = "Post not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PostId>,
) -> Result<Json<PostDetailResponse>, Error> {
    require_admin(&user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SocialPosts::new(&mut pool_conn);

    let post = repo.get_by_id(id).await?.ok_or_else(|| post_not_found(id))?;
    let detail = post_detail(&mut pool_conn, post).await?;
    Ok(Json(detail))
}

/// Update a social post
///
/// Variants in the request are inserted or overwritten by platform.
#[utoipa::path(
    patch,
    path = "/admin/api/v1/social/posts/{id}",
    request_body = PostUpdate,
    tag = "social",
    params(("id" = PostId, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post updated", body = PostDetailResponse),
        (status = 404, description = "Post not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PostId>,
    Json(request): Json<PostUpdate>,
) -> Result<Json<PostDetailResponse>, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = SocialPosts::new(&mut tx);
    let post = match repo.update(id, &(&request).into()).await {
        Ok(post) => post,
        Err(DbError::NotFound) => return Err(post_not_found(id)),
        Err(e) => return Err(e.into()),
    };
    for variant in request.variants {
        repo.upsert_variant(&variant.into_db_request(post.id)).await?;
    }

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "update", "social_post", Some(post.id.to_string()))
                .with_detail(serde_json::json!({"title": post.title})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let detail = post_detail(&mut pool_conn, post).await?;
    Ok(Json(detail))
}

/// Delete a social post
#[utoipa::path(
    delete,
    path = "/admin/api/v1/social/posts/{id}",
    tag = "social",
    params(("id" = PostId, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Post deleted with its variants and jobs"),
        (status = 404, description = "Post not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_post(State(state): State<AppState>, user: CurrentUser, Path(id): Path<PostId>) -> Result<StatusCode, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = SocialPosts::new(&mut tx);
    if !repo.delete(id).await? {
        return Err(post_not_found(id));
    }

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(&ActivityCreateDBRequest::new(Some(user.id), "delete", "social_post", Some(id.to_string())))
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove one platform variant from a post
#[utoipa::path(
    delete,
    path = "/admin/api/v1/social/posts/{id}/variants/{variant_id}",
    tag = "social",
    params(
        ("id" = PostId, Path, description = "Post ID"),
        ("variant_id" = VariantId, Path, description = "Variant ID"),
    ),
    responses(
        (status = 204, description = "Variant removed"),
        (status = 404, description = "Variant not found on this post"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_variant(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, variant_id)): Path<(PostId, VariantId)>,
) -> Result<StatusCode, Error> {
    require_admin(&user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SocialPosts::new(&mut pool_conn);

    if !repo.delete_variant(id, variant_id).await? {
        return Err(Error::NotFound {
            resource: "Variant".to_string(),
            id: variant_id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Validate a post's variants
#[utoipa::path(
    post,
    path = "/admin/api/v1/social/posts/{id}/validate",
    tag = "social",
    params(("id" = PostId, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Validation report", body = ValidationReport),
        (status = 404, description = "Post not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn validate_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PostId>,
) -> Result<Json<ValidationReport>, Error> {
    require_admin(&user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SocialPosts::new(&mut pool_conn);

    repo.get_by_id(id).await?.ok_or_else(|| post_not_found(id))?;
    let variants = repo.list_variants(id).await?;

    Ok(Json(validate_variants(&variants)?))
}

/// Schedule a post
///
/// Creates one queued job per variant and flips the post to scheduled.
/// Rejected when validation fails, the post has no variants, or the
/// requested time is in the past.
#[utoipa::path(
    post,
    path = "/admin/api/v1/social/posts/{id}/schedule",
    request_body = ScheduleRequest,
    tag = "social",
    params(("id" = PostId, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Jobs queued", body = Vec<JobResponse>),
        (status = 400, description = "Validation failed or time is in the past"),
        (status = 404, description = "Post not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn schedule_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<PostId>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<Vec<JobResponse>>, Error> {
    require_admin(&user)?;

    if request.scheduled_at <= Utc::now() {
        return Err(Error::BadRequest {
            message: "Scheduled time must be in the future".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = SocialPosts::new(&mut tx);
    let post = repo.get_by_id(id).await?.ok_or_else(|| post_not_found(id))?;
    let variants = repo.list_variants(id).await?;

    if variants.is_empty() {
        return Err(Error::BadRequest {
            message: "Post has no variants to schedule".to_string(),
        });
    }
    let report = validate_variants(&variants)?;
    if !report.valid {
        return Err(Error::BadRequest {
            message: format!(
                "Validation failed for: {}",
                report
                    .violations
                    .iter()
                    .map(|v| v.platform.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        });
    }

    let mut jobs = Vec::with_capacity(variants.len());
    for variant in &variants {
        let job = repo
            .create_job(&JobCreateDBRequest {
                post_id: post.id,
                platform: variant.platform.clone(),
                scheduled_at: request.scheduled_at,
                status: JobStatus::Queued.as_str().to_string(),
            })
            .await?;
        jobs.push(job);
    }

    repo.update(
        post.id,
        &crate::db::models::social::PostUpdateDBRequest {
            title: None,
            body: None,
            status: Some(PostStatus::Scheduled.as_str().to_string()),
        },
    )
    .await?;

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "schedule", "social_post", Some(post.id.to_string()))
                .with_detail(serde_json::json!({"scheduled_at": request.scheduled_at, "jobs": jobs.len()})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = jobs.into_iter().map(JobResponse::try_from).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(data))
}

/// Jobs listing filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct JobQuery {
    /// Restrict to one job status
    pub status: Option<JobStatus>,
    /// Restrict to one post
    pub post_id: Option<PostId>,
}

/// List scheduled jobs
#[utoipa::path(
    get,
    path = "/admin/api/v1/social/jobs",
    tag = "social",
    params(JobQuery, Pagination),
    responses(
        (status = 200, description = "Jobs, soonest first", body = PaginatedResponse<JobResponse>),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_jobs(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<JobQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<JobResponse>>, Error> {
    require_admin(&user)?;

    let (skip, limit) = pagination.params();
    let filter = JobFilter {
        post_id: query.post_id,
        status: query.status.map(|s| s.as_str().to_string()),
        skip,
        limit,
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SocialPosts::new(&mut pool_conn);

    let jobs = repo.list_jobs(&filter).await?;
    let total = repo.count_jobs(&filter).await?;

    let data = jobs.into_iter().map(JobResponse::try_from).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Cancel a queued job
#[utoipa::path(
    post,
    path = "/admin/api/v1/social/jobs/{id}/cancel",
    tag = "social",
    params(("id" = JobId, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job cancelled", body = JobResponse),
        (status = 404, description = "No queued job with this ID"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn cancel_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<JobId>,
) -> Result<Json<JobResponse>, Error> {
    require_admin(&user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SocialPosts::new(&mut pool_conn);

    let job = repo.cancel_job(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Queued job".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(JobResponse::try_from(job)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_admin_user, create_test_app, login_admin};
    use sqlx::PgPool;

    fn post_body() -> serde_json::Value {
        serde_json::json!({
            "title": "Release day",
            "body": "Out now",
            "variants": [
                {"platform": "x", "body": "Night Drive is out now", "hashtags": ["calisound"]},
                {"platform": "instagram", "body": "Night Drive is out now", "media_aspect_ratio": "4:5", "media_count": 3}
            ]
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_post_with_variants(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let response = server.post("/admin/api/v1/social/posts").json(&post_body()).await;
        response.assert_status(StatusCode::CREATED);

        let detail: PostDetailResponse = response.json();
        assert_eq!(detail.post.status, PostStatus::Draft);
        assert_eq!(detail.variants.len(), 2);

        // Duplicate platform in one request is rejected
        server
            .post("/admin/api/v1/social/posts")
            .json(&serde_json::json!({
                "title": "Dup",
                "variants": [
                    {"platform": "x", "body": "a"},
                    {"platform": "x", "body": "b"}
                ]
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_validation_reports_violations(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let detail: PostDetailResponse = server
            .post("/admin/api/v1/social/posts")
            .json(&serde_json::json!({
                "title": "Too long",
                "variants": [{"platform": "x", "body": "a".repeat(300)}]
            }))
            .await
            .json();

        let report: ValidationReport = server
            .post(&format!("/admin/api/v1/social/posts/{}/validate", detail.post.id))
            .await
            .json();
        assert!(!report.valid);
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].issues[0].contains("280"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_schedule_queues_one_job_per_variant(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let detail: PostDetailResponse = server.post("/admin/api/v1/social/posts").json(&post_body()).await.json();
        let when = Utc::now() + chrono::Duration::hours(2);

        let jobs: Vec<JobResponse> = server
            .post(&format!("/admin/api/v1/social/posts/{}/schedule", detail.post.id))
            .json(&serde_json::json!({"scheduled_at": when}))
            .await
            .json();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.status == JobStatus::Queued));

        let post: PostDetailResponse = server
            .get(&format!("/admin/api/v1/social/posts/{}", detail.post.id))
            .await
            .json();
        assert_eq!(post.post.status, PostStatus::Scheduled);

        let listing: PaginatedResponse<JobResponse> = server.get("/admin/api/v1/social/jobs?status=queued").await.json();
        assert_eq!(listing.total_count, 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_schedule_rejects_past_and_invalid(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let detail: PostDetailResponse = server.post("/admin/api/v1/social/posts").json(&post_body()).await.json();

        let past = Utc::now() - chrono::Duration::hours(1);
        server
            .post(&format!("/admin/api/v1/social/posts/{}/schedule", detail.post.id))
            .json(&serde_json::json!({"scheduled_at": past}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // An oversized variant blocks scheduling
        let invalid: PostDetailResponse = server
            .post("/admin/api/v1/social/posts")
            .json(&serde_json::json!({
                "title": "Broken",
                "variants": [{"platform": "x", "body": "a".repeat(300)}]
            }))
            .await
            .json();
        let when = Utc::now() + chrono::Duration::hours(2);
        server
            .post(&format!("/admin/api/v1/social/posts/{}/schedule", invalid.post.id))
            .json(&serde_json::json!({"scheduled_at": when}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cancel_job_only_once(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let detail: PostDetailResponse = server.post("/admin/api/v1/social/posts").json(&post_body()).await.json();
        let when = Utc::now() + chrono::Duration::hours(2);
        let jobs: Vec<JobResponse> = server
            .post(&format!("/admin/api/v1/social/posts/{}/schedule", detail.post.id))
            .json(&serde_json::json!({"scheduled_at": when}))
            .await
            .json();

        let cancelled: JobResponse = server
            .post(&format!("/admin/api/v1/social/jobs/{}/cancel", jobs[0].id))
            .await
            .json();
        assert_eq!(cancelled.status, JobStatus::Cancelled);

        // Already cancelled, nothing queued to cancel
        server
            .post(&format!("/admin/api/v1/social/jobs/{}/cancel", jobs[0].id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_overwrites_variant_by_platform(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let detail: PostDetailResponse = server.post("/admin/api/v1/social/posts").json(&post_body()).await.json();

        let updated: PostDetailResponse = server
            .patch(&format!("/admin/api/v1/social/posts/{}", detail.post.id))
            .json(&serde_json::json!({
                "variants": [{"platform": "x", "body": "Rewritten"}]
            }))
            .await
            .json();
        assert_eq!(updated.variants.len(), 2);
        let x = updated
            .variants
            .iter()
            .find(|v| v.platform == crate::platforms::Platform::X)
            .unwrap();
        assert_eq!(x.body, "Rewritten");

        server
            .delete(&format!(
                "/admin/api/v1/social/posts/{}/variants/{}",
                detail.post.id, x.id
            ))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }
}
