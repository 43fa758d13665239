//! City pages: public listing plus admin CRUD.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        auth::CurrentUser,
        cities::{CityCreate, CityResponse, CityUpdate},
        pagination::{PaginatedResponse, Pagination},
    },
    auth::require_admin,
    db::{
        errors::DbError,
        handlers::{
            Repository,
            activity::ActivityLogs,
            cities::{Cities, CityFilter},
        },
        models::activity::ActivityCreateDBRequest,
    },
    errors::Error,
    types::CityId,
};

/// List active cities
#[utoipa::path(
    get,
    path = "/api/v1/cities",
    tag = "cities",
    params(Pagination),
    responses(
        (status = 200, description = "Active cities ordered by position", body = PaginatedResponse<CityResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_public_cities(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<CityResponse>>, Error> {
    let (skip, limit) = pagination.params();
    let filter = CityFilter::new(true, skip, limit);

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Cities::new(&mut pool_conn);

    let cities = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = cities.into_iter().map(CityResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Get one active city by slug
#[utoipa::path(
    get,
    path = "/api/v1/cities/{slug}",
    tag = "cities",
    params(("slug" = String, Path, description = "City slug")),
    responses(
        (status = 200, description = "City found", body = CityResponse),
        (status = 404, description = "No active city with this slug"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_public_city(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<CityResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Cities::new(&mut pool_conn);

    let city = repo
        .get_by_slug(&slug)
        .await?
        .filter(|c| c.active)
        .ok_or_else(|| Error::NotFound {
            resource: "City".to_string(),
            id: slug,
        })?;

    Ok(Json(CityResponse::from(city)))
}

/// List all cities, active or not
#[utoipa::path(
    get,
    path = "/admin/api/v1/cities",
    tag = "admin",
    params(Pagination),
    responses(
        (status = 200, description = "All cities", body = PaginatedResponse<CityResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_cities(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<CityResponse>>, Error> {
    require_admin(&user)?;

    let (skip, limit) = pagination.params();
    let filter = CityFilter::new(false, skip, limit);

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Cities::new(&mut pool_conn);

    let cities = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = cities.into_iter().map(CityResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Get a city by ID
#[utoipa::path(
    get,
    path = "/admin/api/v1/cities/{id}",
    tag = "admin",
    params(("id" = CityId, Path, description = "City ID")),
    responses(
        (status = 200, description = "City found", body = CityResponse),
        (status = 404, description = "City not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_city(State(state): State<AppState>, user: CurrentUser, Path(id): Path<CityId>) -> Result<Json<CityResponse>, Error> {
    require_admin(&user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Cities::new(&mut pool_conn);

    let city = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "City".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(CityResponse::from(city)))
}

/// Create a city
#[utoipa::path(
    post,
    path = "/admin/api/v1/cities",
    request_body = CityCreate,
    tag = "admin",
    responses(
        (status = 201, description = "City created", body = CityResponse),
        (status = 409, description = "Slug already in use"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_city(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CityCreate>,
) -> Result<(StatusCode, Json<CityResponse>), Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Cities::new(&mut tx);
    let city = repo.create(&request.into()).await?;

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "create", "city", Some(city.id.to_string()))
                .with_detail(serde_json::json!({"name": city.name, "slug": city.slug})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok((StatusCode::CREATED, Json(CityResponse::from(city))))
}

/// Update a city
#[utoipa::path(
    patch,
    path = "/admin/api/v1/cities/{id}",
    request_body = CityUpdate,
    tag = "admin",
    params(("id" = CityId, Path, description = "City ID")),
    responses(
        (status = 200, description = "City updated", body = CityResponse),
        (status = 404, description = "City not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_city(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CityId>,
    Json(request): Json<CityUpdate>,
) -> Result<Json<CityResponse>, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Cities::new(&mut tx);
    let city = match repo.update(id, &request.into()).await {
        Ok(city) => city,
        Err(DbError::NotFound) => {
            return Err(Error::NotFound {
                resource: "City".to_string(),
                id: id.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "update", "city", Some(city.id.to_string()))
                .with_detail(serde_json::json!({"name": city.name})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(CityResponse::from(city)))
}

/// Delete a city
#[utoipa::path(
    delete,
    path = "/admin/api/v1/cities/{id}",
    tag = "admin",
    params(("id" = CityId, Path, description = "City ID")),
    responses(
        (status = 204, description = "City deleted"),
        (status = 404, description = "City not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_city(State(state): State<AppState>, user: CurrentUser, Path(id): Path<CityId>) -> Result<StatusCode, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Cities::new(&mut tx);
    if !repo.delete(id).await? {
        return Err(Error::NotFound {
            resource: "City".to_string(),
            id: id.to_string(),
        });
    }

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(&ActivityCreateDBRequest::new(Some(user.id), "delete", "city", Some(id.to_string())))
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_admin_user, create_test_app, login_admin};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_city_crud_and_public_visibility(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let response = server
            .post("/admin/api/v1/cities")
            .json(&serde_json::json!({"name": "Los Angeles", "slug": "los-angeles"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let city: CityResponse = response.json();

        let response = server
            .post("/admin/api/v1/cities")
            .json(&serde_json::json!({"name": "San Diego", "slug": "san-diego", "active": false}))
            .await;
        response.assert_status(StatusCode::CREATED);

        // Public listing shows only the active city
        let listing: PaginatedResponse<CityResponse> = server.get("/api/v1/cities").await.json();
        assert_eq!(listing.total_count, 1);
        assert_eq!(listing.data[0].slug, "los-angeles");

        // Admin listing shows both
        let listing: PaginatedResponse<CityResponse> = server.get("/admin/api/v1/cities").await.json();
        assert_eq!(listing.total_count, 2);

        // Public lookup 404s on the inactive city
        server.get("/api/v1/cities/san-diego").await.assert_status(StatusCode::NOT_FOUND);
        server.get("/api/v1/cities/los-angeles").await.assert_status_ok();

        let response = server
            .patch(&format!("/admin/api/v1/cities/{}", city.id))
            .json(&serde_json::json!({"region": "California"}))
            .await;
        response.assert_status_ok();
        let updated: CityResponse = response.json();
        assert_eq!(updated.region.as_deref(), Some("California"));

        let response = server.delete(&format!("/admin/api/v1/cities/{}", city.id)).await;
        response.assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/admin/api/v1/cities/{}", city.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_slug_conflicts(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let body = serde_json::json!({"name": "Los Angeles", "slug": "los-angeles"});
        server.post("/admin/api/v1/cities").json(&body).await.assert_status(StatusCode::CREATED);
        server.post("/admin/api/v1/cities").json(&body).await.assert_status(StatusCode::CONFLICT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_routes_require_session(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        server.get("/admin/api/v1/cities").await.assert_status(StatusCode::UNAUTHORIZED);
        server
            .post("/admin/api/v1/cities")
            .json(&serde_json::json!({"name": "LA", "slug": "la"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_mutations_require_csrf_header(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        let session = login_admin(&mut server, "admin@example.com", "a strong password").await;

        // Strip the CSRF header installed by login_admin; the cookie alone
        // must not authorize a mutation
        server.clear_headers();
        crate::test_utils::add_session_cookie(&mut server, &session);

        server
            .post("/admin/api/v1/cities")
            .json(&serde_json::json!({"name": "LA", "slug": "la"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        // Reads still work without it
        server.get("/admin/api/v1/cities").await.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_mutations_are_logged(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        server
            .post("/admin/api/v1/cities")
            .json(&serde_json::json!({"name": "Los Angeles", "slug": "los-angeles"}))
            .await
            .assert_status(StatusCode::CREATED);

        let mut conn = pool.acquire().await.unwrap();
        let mut activity = ActivityLogs::new(&mut conn);
        let entries = activity
            .list(&crate::db::handlers::activity::ActivityFilter {
                entity_type: Some("city".to_string()),
                skip: 0,
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "create");
    }
}
