//! DJ sets: public listing and playback pages, admin CRUD, bulk import.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    api::models::{
        auth::CurrentUser,
        pagination::{PaginatedResponse, Pagination},
        sets::{SetCreate, SetImportResult, SetImportRow, SetImportRowResult, SetResponse, SetStatus, SetUpdate},
    },
    auth::require_admin,
    db::{
        errors::DbError,
        handlers::{
            Repository,
            activity::ActivityLogs,
            cities::Cities,
            sets::{SetFilter, Sets},
        },
        models::activity::ActivityCreateDBRequest,
    },
    errors::Error,
    types::SetId,
};

/// Public listing filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PublicSetQuery {
    /// Restrict to sets from one city, by slug
    pub city: Option<String>,
}

/// Admin listing filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AdminSetQuery {
    /// Restrict to one publication status
    pub status: Option<SetStatus>,
}

/// List published sets
#[utoipa::path(
    get,
    path = "/api/v1/sets",
    tag = "sets",
    params(PublicSetQuery, Pagination),
    responses(
        (status = 200, description = "Published sets, newest first", body = PaginatedResponse<SetResponse>),
        (status = 404, description = "Unknown city slug"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_public_sets(
    State(state): State<AppState>,
    Query(query): Query<PublicSetQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<SetResponse>>, Error> {
    let (skip, limit) = pagination.params();

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let city_id = match &query.city {
        Some(slug) => {
            let mut cities = Cities::new(&mut pool_conn);
            let city = cities.get_by_slug(slug).await?.ok_or_else(|| Error::NotFound {
                resource: "City".to_string(),
                id: slug.clone(),
            })?;
            Some(city.id)
        }
        None => None,
    };

    let filter = SetFilter {
        status: Some(SetStatus::Published.as_str().to_string()),
        city_id,
        skip,
        limit,
    };

    let mut repo = Sets::new(&mut pool_conn);
    let sets = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = sets.into_iter().map(SetResponse::try_from).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Get a published set by slug
///
/// Fetching a set counts as a play; the response carries the bumped counter.
#[utoipa::path(
    get,
    path = "/api/v1/sets/{slug}",
    tag = "sets",
    params(("slug" = String, Path, description = "Set slug")),
    responses(
        (status = 200, description = "Set found", body = SetResponse),
        (status = 404, description = "No published set with this slug"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_public_set(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<SetResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Sets::new(&mut pool_conn);

    let mut set = repo
        .get_by_slug(&slug)
        .await?
        .filter(|s| s.status == SetStatus::Published.as_str())
        .ok_or_else(|| Error::NotFound {
            resource: "Set".to_string(),
            id: slug,
        })?;

    if let Some(play_count) = repo.increment_play_count(set.id).await? {
        set.play_count = play_count;
    }

    Ok(Json(SetResponse::try_from(set)?))
}

/// List all sets
#[utoipa::path(
    get,
    path = "/admin/api/v1/sets",
    tag = "admin",
    params(AdminSetQuery, Pagination),
    responses(
        (status = 200, description = "Sets in any status", body = PaginatedResponse<SetResponse>),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_sets(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AdminSetQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<SetResponse>>, Error> {
    require_admin(&user)?;

    let (skip, limit) = pagination.params();
    let filter = SetFilter {
        status: query.status.map(|s| s.as_str().to_string()),
        city_id: None,
        skip,
        limit,
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Sets::new(&mut pool_conn);

    let sets = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = sets.into_iter().map(SetResponse::try_from).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Get a set by ID
#[utoipa::path(
    get,
    path = "/admin/api/v1/sets/{id}",
    tag = "admin",
    params(("id" = SetId, Path, description = "Set ID")),
    responses(
        (status = 200, description = "Set found", body = SetResponse),
        (status = 404, description = "Set not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_set(State(state): State<AppState>, user: CurrentUser, Path(id): Path<SetId>) -> Result<Json<SetResponse>, Error> {
    require_admin(&user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Sets::new(&mut pool_conn);

    let set = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Set".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(SetResponse::try_from(set)?))
}

/// Create a set
#[utoipa::path(
    post,
    path = "/admin/api/v1/sets",
    request_body = SetCreate,
    tag = "admin",
    responses(
        (status = 201, description = "Set created", body = SetResponse),
        (status = 409, description = "Slug already in use"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_set(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<SetCreate>,
) -> Result<(StatusCode, Json<SetResponse>), Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Sets::new(&mut tx);
    let set = repo.create(&request.into()).await?;

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "create", "set", Some(set.id.to_string()))
                .with_detail(serde_json::json!({"title": set.title, "slug": set.slug, "status": set.status})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok((StatusCode::CREATED, Json(SetResponse::try_from(set)?)))
}

/// Update a set
#[utoipa::path(
    patch,
    path = "/admin/api/v1/sets/{id}",
    request_body = SetUpdate,
    tag = "admin",
    params(("id" = SetId, Path, description = "Set ID")),
    responses(
        (status = 200, description = "Set updated", body = SetResponse),
        (status = 404, description = "Set not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_set(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<SetId>,
    Json(request): Json<SetUpdate>,
) -> Result<Json<SetResponse>, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Sets::new(&mut tx);
    let set = match repo.update(id, &request.into()).await {
        Ok(set) => set,
        Err(DbError::NotFound) => {
            return Err(Error::NotFound {
                resource: "Set".to_string(),
                id: id.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "update", "set", Some(set.id.to_string()))
                .with_detail(serde_json::json!({"title": set.title, "status": set.status})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(SetResponse::try_from(set)?))
}

/// Delete a set
#[utoipa::path(
    delete,
    path = "/admin/api/v1/sets/{id}",
    tag = "admin",
    params(("id" = SetId, Path, description = "Set ID")),
    responses(
        (status = 204, description = "Set deleted"),
        (status = 404, description = "Set not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_set(State(state): State<AppState>, user: CurrentUser, Path(id): Path<SetId>) -> Result<StatusCode, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Sets::new(&mut tx);
    if !repo.delete(id).await? {
        return Err(Error::NotFound {
            resource: "Set".to_string(),
            id: id.to_string(),
        });
    }

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(&ActivityCreateDBRequest::new(Some(user.id), "delete", "set", Some(id.to_string())))
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bulk import sets
///
/// Rows are inserted one at a time; a failing row is reported and skipped,
/// never aborting the rest of the batch.
#[utoipa::path(
    post,
    path = "/admin/api/v1/sets/import",
    request_body = Vec<SetImportRow>,
    tag = "admin",
    responses(
        (status = 200, description = "Per-row import results", body = SetImportResult),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn import_sets(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(rows): Json<Vec<SetImportRow>>,
) -> Result<Json<SetImportResult>, Error> {
    require_admin(&user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut results = Vec::with_capacity(rows.len());
    let mut imported = 0usize;

    for row in rows {
        let slug = row.slug.clone();
        let mut repo = Sets::new(&mut pool_conn);
        match repo.create(&row.into()).await {
            Ok(set) => {
                imported += 1;
                results.push(SetImportRowResult {
                    slug,
                    success: true,
                    id: Some(set.id),
                    error: None,
                });
            }
            Err(e) => {
                let error = Error::from(e).user_message();
                tracing::warn!(slug = %slug, error = %error, "Skipping import row");
                results.push(SetImportRowResult {
                    slug,
                    success: false,
                    id: None,
                    error: Some(error),
                });
            }
        }
    }

    let failed = results.len() - imported;
    let mut activity = ActivityLogs::new(&mut pool_conn);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "import", "set", None)
                .with_detail(serde_json::json!({"imported": imported, "failed": failed})),
        )
        .await?;

    Ok(Json(SetImportResult {
        imported,
        failed,
        rows: results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_admin_user, create_test_app, login_admin};
    use sqlx::PgPool;

    fn set_body(title: &str, slug: &str, status: &str) -> serde_json::Value {
        serde_json::json!({"title": title, "slug": slug, "status": status})
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_only_published_sets_are_public(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        server
            .post("/admin/api/v1/sets")
            .json(&set_body("Night Drive", "night-drive", "published"))
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post("/admin/api/v1/sets")
            .json(&set_body("Unreleased", "unreleased", "draft"))
            .await
            .assert_status(StatusCode::CREATED);

        let listing: PaginatedResponse<SetResponse> = server.get("/api/v1/sets").await.json();
        assert_eq!(listing.total_count, 1);
        assert_eq!(listing.data[0].slug, "night-drive");
        assert!(listing.data[0].published_at.is_some());

        server.get("/api/v1/sets/unreleased").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_fetching_a_set_counts_a_play(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        server
            .post("/admin/api/v1/sets")
            .json(&set_body("Night Drive", "night-drive", "published"))
            .await
            .assert_status(StatusCode::CREATED);

        let first: SetResponse = server.get("/api/v1/sets/night-drive").await.json();
        let second: SetResponse = server.get("/api/v1/sets/night-drive").await.json();
        assert_eq!(first.play_count, 1);
        assert_eq!(second.play_count, 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_city_filter_by_slug(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let city: crate::api::models::cities::CityResponse = server
            .post("/admin/api/v1/cities")
            .json(&serde_json::json!({"name": "Los Angeles", "slug": "los-angeles"}))
            .await
            .json();

        server
            .post("/admin/api/v1/sets")
            .json(&serde_json::json!({"title": "LA Set", "slug": "la-set", "status": "published", "city_id": city.id}))
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post("/admin/api/v1/sets")
            .json(&set_body("Elsewhere", "elsewhere", "published"))
            .await
            .assert_status(StatusCode::CREATED);

        let listing: PaginatedResponse<SetResponse> = server.get("/api/v1/sets?city=los-angeles").await.json();
        assert_eq!(listing.total_count, 1);
        assert_eq!(listing.data[0].slug, "la-set");

        server.get("/api/v1/sets?city=nowhere").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_import_continues_past_failures(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        server
            .post("/admin/api/v1/sets")
            .json(&set_body("Already There", "taken", "published"))
            .await
            .assert_status(StatusCode::CREATED);

        let rows = serde_json::json!([
            {"title": "One", "slug": "one"},
            {"title": "Dupe", "slug": "taken"},
            {"title": "Two", "slug": "two"},
        ]);
        let response = server.post("/admin/api/v1/sets/import").json(&rows).await;
        response.assert_status_ok();

        let result: SetImportResult = response.json();
        assert_eq!(result.imported, 2);
        assert_eq!(result.failed, 1);
        assert!(!result.rows[1].success);
        assert!(result.rows[1].error.is_some());
        assert!(result.rows[2].success);
    }
}
