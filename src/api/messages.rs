// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Messaging endpoints.
//!
//! A thread only exists behind a paid connection: every read and write
//! checks the connection row first. Live updates go out over WebSocket
//! subscriptions; the subscriber's own messages are not echoed back, the
//! HTTP response already confirmed them.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::identity::resolve_profile;
use crate::auth::Auth;
use crate::error::ApiError;
use crate::events::AppEvent;
use crate::session::CreatorAuth;
use crate::state::AppState;
use crate::storage::{SenderRole, StoredMessage};

const MAX_MESSAGE_CHARS: usize = 2_000;

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageView {
    pub id: Uuid,
    pub sender: SenderRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<StoredMessage> for MessageView {
    fn from(message: StoredMessage) -> Self {
        Self {
            id: message.id,
            sender: message.sender,
            content: message.content,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub content: String,
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::unprocessable("Message content is empty"));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::unprocessable(format!(
            "Message content exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(())
}

fn require_connection(state: &AppState, user_id: Uuid, creator_id: Uuid) -> Result<(), ApiError> {
    if state.connections.exists(user_id, creator_id)? {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "Messaging is locked until the creator has been unlocked",
        ))
    }
}

fn append_message(
    state: &AppState,
    user_id: Uuid,
    creator_id: Uuid,
    sender: SenderRole,
    content: String,
) -> Result<StoredMessage, ApiError> {
    let message = StoredMessage {
        id: Uuid::new_v4(),
        user_id,
        creator_id,
        sender,
        content,
        created_at: Utc::now(),
    };
    state.messages.append(&message)?;
    state.events.publish(AppEvent::message_created(&message));
    Ok(message)
}

#[utoipa::path(
    get,
    path = "/v1/creators/{creator_id}/messages",
    tag = "Messages",
    params(("creator_id" = Uuid, Path, description = "Creator thread to read")),
    responses(
        (status = 200, description = "Thread, oldest first", body = [MessageView]),
        (status = 403, description = "Creator not unlocked")
    )
)]
pub async fn list_user_thread(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(creator_id): Path<Uuid>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let profile = resolve_profile(&state, &user)?;
    require_connection(&state, profile.id, creator_id)?;

    let thread = state.messages.thread(profile.id, creator_id)?;
    Ok(Json(thread.into_iter().map(MessageView::from).collect()))
}

#[utoipa::path(
    post,
    path = "/v1/creators/{creator_id}/messages",
    tag = "Messages",
    params(("creator_id" = Uuid, Path, description = "Creator thread to write to")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = MessageView),
        (status = 403, description = "Creator not unlocked"),
        (status = 422, description = "Empty or oversized content")
    )
)]
pub async fn send_user_message(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(creator_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>), ApiError> {
    validate_content(&request.content)?;
    let profile = resolve_profile(&state, &user)?;
    require_connection(&state, profile.id, creator_id)?;

    let message = append_message(
        &state,
        profile.id,
        creator_id,
        SenderRole::User,
        request.content,
    )?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

#[utoipa::path(
    get,
    path = "/v1/threads/{user_id}/messages",
    tag = "Messages",
    params(("user_id" = Uuid, Path, description = "Supporter thread to read")),
    responses(
        (status = 200, description = "Thread, oldest first", body = [MessageView]),
        (status = 403, description = "No connection with this user")
    )
)]
pub async fn list_creator_thread(
    State(state): State<AppState>,
    CreatorAuth(session): CreatorAuth,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    require_connection(&state, user_id, session.creator_id)?;

    let thread = state.messages.thread(user_id, session.creator_id)?;
    Ok(Json(thread.into_iter().map(MessageView::from).collect()))
}

#[utoipa::path(
    post,
    path = "/v1/threads/{user_id}/messages",
    tag = "Messages",
    params(("user_id" = Uuid, Path, description = "Supporter thread to write to")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = MessageView),
        (status = 403, description = "No connection with this user"),
        (status = 422, description = "Empty or oversized content")
    )
)]
pub async fn send_creator_message(
    State(state): State<AppState>,
    CreatorAuth(session): CreatorAuth,
    Path(user_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>), ApiError> {
    validate_content(&request.content)?;
    require_connection(&state, user_id, session.creator_id)?;

    let message = append_message(
        &state,
        user_id,
        session.creator_id,
        SenderRole::Creator,
        request.content,
    )?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

/// Live updates for one thread, from the user side.
#[utoipa::path(
    get,
    path = "/v1/creators/{creator_id}/messages/ws",
    tag = "Messages",
    params(("creator_id" = Uuid, Path, description = "Creator thread to follow")),
    responses((status = 101, description = "WebSocket upgrade"))
)]
pub async fn user_thread_ws(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(creator_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let profile = resolve_profile(&state, &user)?;
    require_connection(&state, profile.id, creator_id)?;

    let rx = state.events.subscribe();
    Ok(ws.on_upgrade(move |socket| {
        stream_thread_events(socket, rx, profile.id, creator_id, SenderRole::User)
    }))
}

/// Live updates for one thread, from the creator side.
#[utoipa::path(
    get,
    path = "/v1/threads/{user_id}/ws",
    tag = "Messages",
    params(("user_id" = Uuid, Path, description = "Supporter thread to follow")),
    responses((status = 101, description = "WebSocket upgrade"))
)]
pub async fn creator_thread_ws(
    State(state): State<AppState>,
    CreatorAuth(session): CreatorAuth,
    Path(user_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    require_connection(&state, user_id, session.creator_id)?;

    let rx = state.events.subscribe();
    Ok(ws.on_upgrade(move |socket| {
        stream_thread_events(socket, rx, user_id, session.creator_id, SenderRole::Creator)
    }))
}

/// Live dashboard feed: every event touching the creator, across threads.
/// New unlocks arrive here without the dashboard polling the supporter list.
#[utoipa::path(
    get,
    path = "/v1/creators/me/events",
    tag = "Messages",
    responses((status = 101, description = "WebSocket upgrade"))
)]
pub async fn creator_dashboard_ws(
    State(state): State<AppState>,
    CreatorAuth(session): CreatorAuth,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let rx = state.events.subscribe();
    let creator_id = session.creator_id;
    Ok(ws.on_upgrade(move |socket| stream_creator_events(socket, rx, creator_id)))
}

/// Forward events for one thread, suppressing the subscriber's own side.
async fn stream_thread_events(
    socket: WebSocket,
    mut rx: broadcast::Receiver<AppEvent>,
    user_id: Uuid,
    creator_id: Uuid,
    subscriber: SenderRole,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    if event.pair() != (user_id, creator_id) {
                        continue;
                    }
                    if event.sender() == Some(subscriber) {
                        continue;
                    }
                    if forward(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // The client missed events and should refetch the thread.
                    if sink
                        .send(WsMessage::Text(r#"{"type":"lagged"}"#.into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn stream_creator_events(
    socket: WebSocket,
    mut rx: broadcast::Receiver<AppEvent>,
    creator_id: Uuid,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    if event.pair().1 != creator_id {
                        continue;
                    }
                    if event.sender() == Some(SenderRole::Creator) {
                        continue;
                    }
                    if forward(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    if sink
                        .send(WsMessage::Text(r#"{"type":"lagged"}"#.into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn forward(
    sink: &mut futures_util::stream::SplitSink<WebSocket, WsMessage>,
    event: &AppEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(payload) => sink.send(WsMessage::Text(payload.into())).await,
        Err(_) => Ok(()),
    }
}
