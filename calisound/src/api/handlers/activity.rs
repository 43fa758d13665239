//! Admin activity log listing.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    api::models::{
        activity::ActivityResponse,
        auth::CurrentUser,
        pagination::{PaginatedResponse, Pagination},
    },
    auth::require_admin,
    db::handlers::activity::{ActivityFilter, ActivityLogs},
    errors::Error,
};

/// Activity log filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ActivityQuery {
    /// Restrict to one entity type, e.g. "set" or "comment"
    pub entity_type: Option<String>,
}

/// List admin activity
#[utoipa::path(
    get,
    path = "/admin/api/v1/activity",
    tag = "admin",
    params(ActivityQuery, Pagination),
    responses(
        (status = 200, description = "Activity entries, newest first", body = PaginatedResponse<ActivityResponse>),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_activity(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ActivityQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ActivityResponse>>, Error> {
    require_admin(&user)?;

    let (skip, limit) = pagination.params();
    let filter = ActivityFilter {
        entity_type: query.entity_type,
        skip,
        limit,
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut logs = ActivityLogs::new(&mut pool_conn);

    let entries = logs.list(&filter).await?;
    let total = logs.count(&filter).await?;

    let data = entries.into_iter().map(ActivityResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_admin_user, create_test_app, login_admin};
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_activity_lists_admin_mutations(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        server
            .post("/admin/api/v1/cities")
            .json(&serde_json::json!({"name": "Los Angeles", "slug": "los-angeles"}))
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post("/admin/api/v1/sets")
            .json(&serde_json::json!({"title": "Night Drive", "slug": "night-drive"}))
            .await
            .assert_status(StatusCode::CREATED);

        let all: PaginatedResponse<ActivityResponse> = server.get("/admin/api/v1/activity").await.json();
        assert_eq!(all.total_count, 2);
        // Newest first
        assert_eq!(all.data[0].entity_type, "set");
        assert_eq!(all.data[1].entity_type, "city");
        assert!(all.data.iter().all(|e| e.actor_id.is_some()));

        let cities_only: PaginatedResponse<ActivityResponse> =
            server.get("/admin/api/v1/activity?entity_type=city").await.json();
        assert_eq!(cities_only.total_count, 1);
        assert_eq!(cities_only.data[0].action, "create");
    }
}
