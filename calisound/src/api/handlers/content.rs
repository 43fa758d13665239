//! Site content blocks, the link hub redirect, and the contact form.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::Redirect,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    api::models::{
        auth::CurrentUser,
        content::{
            ContactResponse, ContactSubmit, ContentCreate, ContentKind, ContentResponse, ContentUpdate, LinkClickStats,
        },
        pagination::{PaginatedResponse, Pagination},
    },
    auth::require_admin,
    db::{
        errors::DbError,
        handlers::{
            Repository,
            activity::ActivityLogs,
            contact::{ContactFilter, ContactMessages},
            content::{Content, ContentFilter},
        },
        models::{activity::ActivityCreateDBRequest, contact::ContactUpdateDBRequest},
    },
    errors::Error,
    limits::client_ip,
    types::{ContactMessageId, ContentId},
};

/// List published content of one kind
#[utoipa::path(
    get,
    path = "/api/v1/content/{kind}",
    tag = "content",
    params(("kind" = ContentKind, Path, description = "Content kind"), Pagination),
    responses(
        (status = 200, description = "Published blocks in position order", body = PaginatedResponse<ContentResponse>),
        (status = 400, description = "Unknown content kind"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_public_content(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ContentResponse>>, Error> {
    let kind: ContentKind = kind.parse()?;
    let (skip, limit) = pagination.params();

    let filter = ContentFilter {
        kind: Some(kind.as_str().to_string()),
        published_only: true,
        skip,
        limit,
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Content::new(&mut pool_conn);

    let blocks = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = blocks
        .into_iter()
        .map(ContentResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Follow a link-hub link
///
/// Records the click and redirects to the link's destination with a 307.
#[utoipa::path(
    get,
    path = "/api/v1/links/{id}/go",
    tag = "content",
    params(("id" = ContentId, Path, description = "Link content ID")),
    responses(
        (status = 307, description = "Redirect to the link destination"),
        (status = 404, description = "Link not found or unpublished"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn follow_link(
    State(state): State<AppState>,
    Path(id): Path<ContentId>,
    headers: HeaderMap,
) -> Result<Redirect, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Content::new(&mut pool_conn);

    let not_found = || Error::NotFound {
        resource: "Link".to_string(),
        id: id.to_string(),
    };

    let block = repo
        .get_by_id(id)
        .await?
        .filter(|b| b.kind == ContentKind::Link.as_str() && b.published)
        .ok_or_else(not_found)?;
    let url = block.url.ok_or_else(not_found)?;

    let ip = client_ip(&headers);
    let referrer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());
    repo.record_click(id, Some(&ip), referrer).await?;

    Ok(Redirect::temporary(&url))
}

/// Submit a contact message
///
/// The message is stored first; the email notification is best effort and
/// never fails the request.
#[utoipa::path(
    post,
    path = "/api/v1/contact",
    request_body = ContactSubmit,
    tag = "content",
    responses(
        (status = 202, description = "Message received"),
        (status = 400, description = "Invalid submission"),
        (status = 429, description = "Too many submissions from this address"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn submit_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ContactSubmit>,
) -> Result<StatusCode, Error> {
    let ip = client_ip(&headers);
    state.limiter.check("contact", &ip, &state.config.limits.contact)?;
    request.validate()?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ContactMessages::new(&mut pool_conn);
    let message = repo.create(&request.into_db_request(ip)).await?;

    if let Err(e) = state.email.send_contact_notification(&message).await {
        tracing::warn!(message_id = %message.id, error = %e, "Failed to send contact notification email");
    }

    Ok(StatusCode::ACCEPTED)
}

/// Admin content listing filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AdminContentQuery {
    /// Restrict to one content kind
    pub kind: Option<ContentKind>,
}

/// List all content blocks
#[utoipa::path(
    get,
    path = "/admin/api/v1/content",
    tag = "admin",
    params(AdminContentQuery, Pagination),
    responses(
        (status = 200, description = "Content blocks, published or not", body = PaginatedResponse<ContentResponse>),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_content(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AdminContentQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ContentResponse>>, Error> {
    require_admin(&user)?;

    let (skip, limit) = pagination.params();
    let filter = ContentFilter {
        kind: query.kind.map(|k| k.as_str().to_string()),
        published_only: false,
        skip,
        limit,
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Content::new(&mut pool_conn);

    let blocks = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = blocks
        .into_iter()
        .map(ContentResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Create a content block
#[utoipa::path(
    post,
    path = "/admin/api/v1/content",
    request_body = ContentCreate,
    tag = "admin",
    responses(
        (status = 201, description = "Content created", body = ContentResponse),
        (status = 400, description = "Invalid content"),
        (status = 409, description = "Slug already in use for this kind"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_content(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ContentCreate>,
) -> Result<(StatusCode, Json<ContentResponse>), Error> {
    require_admin(&user)?;
    request.validate()?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Content::new(&mut tx);
    let block = repo.create(&request.into()).await?;

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "create", "content", Some(block.id.to_string()))
                .with_detail(serde_json::json!({"kind": block.kind, "slug": block.slug})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok((StatusCode::CREATED, Json(ContentResponse::try_from(block)?)))
}

/// Update a content block
#[utoipa::path(
    patch,
    path = "/admin/api/v1/content/{id}",
    request_body = ContentUpdate,
    tag = "admin",
    params(("id" = ContentId, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Content updated", body = ContentResponse),
        (status = 404, description = "Content not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_content(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ContentId>,
    Json(request): Json<ContentUpdate>,
) -> Result<Json<ContentResponse>, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Content::new(&mut tx);
    let block = match repo.update(id, &request.into()).await {
        Ok(block) => block,
        Err(DbError::NotFound) => {
            return Err(Error::NotFound {
                resource: "Content".to_string(),
                id: id.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "update", "content", Some(block.id.to_string()))
                .with_detail(serde_json::json!({"kind": block.kind, "slug": block.slug})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(ContentResponse::try_from(block)?))
}

/// Delete a content block
#[utoipa::path(
    delete,
    path = "/admin/api/v1/content/{id}",
    tag = "admin",
    params(("id" = ContentId, Path, description = "Content ID")),
    responses(
        (status = 204, description = "Content deleted"),
        (status = 404, description = "Content not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_content(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ContentId>,
) -> Result<StatusCode, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Content::new(&mut tx);
    if !repo.delete(id).await? {
        return Err(Error::NotFound {
            resource: "Content".to_string(),
            id: id.to_string(),
        });
    }

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(&ActivityCreateDBRequest::new(Some(user.id), "delete", "content", Some(id.to_string())))
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Click totals for every link
#[utoipa::path(
    get,
    path = "/admin/api/v1/links/stats",
    tag = "admin",
    responses(
        (status = 200, description = "Click totals per link", body = Vec<LinkClickStats>),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn link_stats(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<LinkClickStats>>, Error> {
    require_admin(&user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Content::new(&mut pool_conn);

    let counts = repo.click_counts().await?;
    let stats = counts
        .into_iter()
        .map(|c| LinkClickStats {
            content_id: c.content_id,
            clicks: c.clicks,
        })
        .collect();
    Ok(Json(stats))
}

/// Contact inbox filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ContactQuery {
    /// Only messages nobody has dealt with yet
    #[serde(default)]
    pub unhandled: bool,
}

/// List contact messages
#[utoipa::path(
    get,
    path = "/admin/api/v1/contact",
    tag = "admin",
    params(ContactQuery, Pagination),
    responses(
        (status = 200, description = "Contact messages, newest first", body = PaginatedResponse<ContactResponse>),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_contact_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ContactQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ContactResponse>>, Error> {
    require_admin(&user)?;

    let (skip, limit) = pagination.params();
    let filter = ContactFilter {
        unhandled_only: query.unhandled,
        skip,
        limit,
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ContactMessages::new(&mut pool_conn);

    let messages = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = messages.into_iter().map(ContactResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Mark a contact message handled or unhandled.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ContactHandledUpdate {
    pub handled: bool,
}

/// Update a contact message
#[utoipa::path(
    patch,
    path = "/admin/api/v1/contact/{id}",
    request_body = ContactHandledUpdate,
    tag = "admin",
    params(("id" = ContactMessageId, Path, description = "Contact message ID")),
    responses(
        (status = 200, description = "Message updated", body = ContactResponse),
        (status = 404, description = "Message not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_contact_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ContactMessageId>,
    Json(request): Json<ContactHandledUpdate>,
) -> Result<Json<ContactResponse>, Error> {
    require_admin(&user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ContactMessages::new(&mut pool_conn);

    let message = match repo.update(id, &ContactUpdateDBRequest { handled: request.handled }).await {
        Ok(message) => message,
        Err(DbError::NotFound) => {
            return Err(Error::NotFound {
                resource: "Contact message".to_string(),
                id: id.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(ContactResponse::from(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_admin_user, create_test_app, login_admin};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_public_content_hides_unpublished(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        server
            .post("/admin/api/v1/content")
            .json(&serde_json::json!({"kind": "faq", "slug": "bookings", "title": "Bookings?", "body": "Email us."}))
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post("/admin/api/v1/content")
            .json(&serde_json::json!({
                "kind": "faq", "slug": "hidden", "title": "Hidden", "body": "...", "published": false
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let public: PaginatedResponse<ContentResponse> = server.get("/api/v1/content/faq").await.json();
        assert_eq!(public.total_count, 1);
        assert_eq!(public.data[0].slug, "bookings");

        let admin: PaginatedResponse<ContentResponse> = server.get("/admin/api/v1/content?kind=faq").await.json();
        assert_eq!(admin.total_count, 2);

        server.get("/api/v1/content/banner").await.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_link_redirect_records_click(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let link: ContentResponse = server
            .post("/admin/api/v1/content")
            .json(&serde_json::json!({
                "kind": "link", "slug": "bandcamp", "title": "Bandcamp",
                "url": "https://calisound.bandcamp.com"
            }))
            .await
            .json();

        let response = server.get(&format!("/api/v1/links/{}/go", link.id)).await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://calisound.bandcamp.com"
        );

        let stats: Vec<LinkClickStats> = server.get("/admin/api/v1/links/stats").await.json();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].content_id, link.id);
        assert_eq!(stats[0].clicks, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unpublished_link_does_not_redirect(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;
        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let link: ContentResponse = server
            .post("/admin/api/v1/content")
            .json(&serde_json::json!({
                "kind": "link", "slug": "secret", "title": "Secret",
                "url": "https://example.com", "published": false
            }))
            .await
            .json();

        server
            .get(&format!("/api/v1/links/{}/go", link.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_contact_form_lands_in_inbox(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "admin@example.com", "a strong password").await;

        server
            .post("/api/v1/contact")
            .json(&serde_json::json!({
                "name": "Ada", "email": "ada@example.com",
                "subject": "Booking", "body": "Can you play our festival?"
            }))
            .await
            .assert_status(StatusCode::ACCEPTED);
        server
            .post("/api/v1/contact")
            .json(&serde_json::json!({"name": "Ada", "email": "nope", "body": "hi"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        login_admin(&mut server, "admin@example.com", "a strong password").await;

        let inbox: PaginatedResponse<ContactResponse> = server.get("/admin/api/v1/contact?unhandled=true").await.json();
        assert_eq!(inbox.total_count, 1);
        let message = &inbox.data[0];
        assert_eq!(message.email, "ada@example.com");
        assert!(!message.handled);

        let updated: ContactResponse = server
            .patch(&format!("/admin/api/v1/contact/{}", message.id))
            .json(&serde_json::json!({"handled": true}))
            .await
            .json();
        assert!(updated.handled);

        let inbox: PaginatedResponse<ContactResponse> = server.get("/admin/api/v1/contact?unhandled=true").await.json();
        assert_eq!(inbox.total_count, 0);
    }
}
