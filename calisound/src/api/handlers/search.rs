//! Media search proxy endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    errors::Error,
    media_search::{SearchHit, SearchSource},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Upstream to search
    pub source: SearchSource,
    /// Search terms
    pub q: String,
}

/// Search YouTube or Spotify
///
/// Proxies the upstream search API so clients never see our credentials.
/// Results are cached briefly, so repeat queries are cheap.
#[utoipa::path(
    get,
    path = "/api/v1/search",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Trimmed search results", body = Vec<SearchHit>),
        (status = 400, description = "Empty query, unknown source, or source not configured"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn search_media(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>, Error> {
    let hits = state.search.search(query.source, &query.q).await?;
    Ok(Json(hits))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::create_test_app;
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_search_requires_query_and_known_source(pool: PgPool) {
        let server = create_test_app(pool).await;

        // Test config leaves both upstreams unconfigured
        server
            .get("/api/v1/search?source=youtube&q=sunset")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/api/v1/search?source=youtube&q=%20")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/api/v1/search?source=soundcloud&q=sunset")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
