//! Virtual club WebSocket endpoint and admin character management.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    api::models::{
        auth::CurrentUser,
        club::{CharacterCreate, CharacterResponse, CharacterUpdate},
        pagination::{PaginatedResponse, Pagination},
    },
    auth::require_admin,
    club::{AvatarState, ClientMessage},
    db::{
        errors::DbError,
        handlers::{
            Repository,
            activity::ActivityLogs,
            club_characters::{CharacterFilter, ClubCharacters},
        },
        models::activity::ActivityCreateDBRequest,
    },
    errors::Error,
    types::CharacterId,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ClubWsQuery {
    /// Room to join
    pub room: String,
    /// Display name shown to other occupants
    pub name: String,
    /// Optional character to use as the avatar
    pub character_id: Option<CharacterId>,
}

/// Join a club room
///
/// Upgrades to a WebSocket. The server sends a presence snapshot first,
/// then fans out join/leave/chat/move events. Clients send chat and move
/// messages; anything malformed is dropped silently.
#[utoipa::path(
    get,
    path = "/club/ws",
    tag = "club",
    params(ClubWsQuery),
    responses(
        (status = 101, description = "Switching to the WebSocket protocol"),
        (status = 400, description = "Missing room or name"),
        (status = 404, description = "Character not found"),
    )
)]
#[tracing::instrument(skip_all, fields(room = %query.room, name = %query.name))]
pub async fn club_ws(
    State(state): State<AppState>,
    Query(query): Query<ClubWsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, Error> {
    let room = query.room.trim().to_string();
    let name = query.name.trim().to_string();
    if room.is_empty() || name.is_empty() {
        return Err(Error::BadRequest {
            message: "Both room and name are required".to_string(),
        });
    }

    let (sprite, color) = match query.character_id {
        Some(id) => {
            let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
            let mut repo = ClubCharacters::new(&mut pool_conn);
            let character = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
                resource: "Character".to_string(),
                id: id.to_string(),
            })?;
            (Some(character.sprite), Some(character.color))
        }
        None => (None, None),
    };

    let avatar = AvatarState {
        name,
        x: 0.0,
        y: 0.0,
        sprite,
        color,
    };
    Ok(ws.on_upgrade(move |socket| handle_club_socket(socket, state, room, avatar)))
}

async fn handle_club_socket(socket: WebSocket, state: AppState, room: String, avatar: AvatarState) {
    let name = avatar.name.clone();
    let (mut sink, mut stream) = socket.split();
    let (conn, mut rx, snapshot) = state.club.join(&room, avatar);
    tracing::debug!(%room, %name, "Club join");

    let joined = match serde_json::to_string(&snapshot) {
        Ok(text) => sink.send(Message::Text(text.into())).await.is_ok(),
        Err(_) => false,
    };
    if !joined {
        state.club.leave(&room, conn);
        return;
    }

    // Forward room events to this client until it falls behind or drops
    let send_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Chat { message }) => {
                    // Empty or oversized chat is dropped, not fatal
                    let _ = state.club.chat(&room, &name, &message);
                }
                Ok(ClientMessage::Move { x, y }) => state.club.move_to(&room, conn, x, y),
                Err(_) => {}
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    tracing::debug!(%room, %name, "Club leave");
    state.club.leave(&room, conn);
    send_task.abort();
}

/// List club characters
#[utoipa::path(
    get,
    path = "/admin/api/v1/characters",
    tag = "admin",
    params(Pagination),
    responses(
        (status = 200, description = "Characters by name", body = PaginatedResponse<CharacterResponse>),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_characters(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<CharacterResponse>>, Error> {
    require_admin(&user)?;

    let (skip, limit) = pagination.params();
    let filter = CharacterFilter { skip, limit };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ClubCharacters::new(&mut pool_conn);

    let characters = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = characters.into_iter().map(CharacterResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Create a club character
#[utoipa::path(
    post,
    path = "/admin/api/v1/characters",
    request_body = CharacterCreate,
    tag = "admin",
    responses(
        (status = 201, description = "Character created", body = CharacterResponse),
        (status = 400, description = "Invalid character"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_character(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CharacterCreate>,
) -> Result<(StatusCode, Json<CharacterResponse>), Error> {
    require_admin(&user)?;
    request.validate()?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = ClubCharacters::new(&mut tx);
    let character = repo.create(&request.into()).await?;

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "create", "character", Some(character.id.to_string()))
                .with_detail(serde_json::json!({"name": character.name})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok((StatusCode::CREATED, Json(CharacterResponse::from(character))))
}

/// Update a club character
#[utoipa::path(
    patch,
    path = "/admin/api/v1/characters/{id}",
    request_body = CharacterUpdate,
    tag = "admin",
    params(("id" = CharacterId, Path, description = "Character ID")),
    responses(
        (status = 200, description = "Character updated", body = CharacterResponse),
        (status = 404, description = "Character not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_character(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CharacterId>,
    Json(request): Json<CharacterUpdate>,
) -> Result<Json<CharacterResponse>, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = ClubCharacters::new(&mut tx);
    let character = match repo.update(id, &request.into()).await {
        Ok(character) => character,
        Err(DbError::NotFound) => {
            return Err(Error::NotFound {
                resource: "Character".to_string(),
                id: id.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(
            &ActivityCreateDBRequest::new(Some(user.id), "update", "character", Some(character.id.to_string()))
                .with_detail(serde_json::json!({"name": character.name})),
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(CharacterResponse::from(character)))
}

/// Delete a club character
#[utoipa::path(
    delete,
    path = "/admin/api/v1/characters/{id}",
    tag = "admin",
    params(("id" = CharacterId, Path, description = "Character ID")),
    responses(
        (status = 204, description = "Character deleted"),
        (status = 404, description = "Character not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_character(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CharacterId>,
) -> Result<StatusCode, Error> {
    require_admin(&user)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = ClubCharacters::new(&mut tx);
    if !repo.delete(id).await? {
        return Err(Error::NotFound {
            resource: "Character".to_string(),
            id: id.to_string(),
        });
    }

    let mut activity = ActivityLogs::new(&mut tx);
    activity
        .record(&ActivityCreateDBRequest::new(Some(user.id), "delete", "character", Some(id.to_string())))
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}
