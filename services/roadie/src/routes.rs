//! HTTP surface: login, interaction management, and the WebSocket attach
//! endpoint.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use futures_util::{SinkExt, StreamExt};
use roadie_core::CoordinatorHandle;
use roadie_core::registry::{ConnectionHandle, ConnectionId};
use roadie_types::{InteractionSummary, ServerEvent};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{self, UserIdentity};
use crate::error::ApiError;
use crate::state::AppState;

/// Outbound frames buffered per connection. The hub drops frames for a
/// connection that falls this far behind rather than stalling the actor.
const OUTBOUND_BUFFER: usize = 128;

pub fn router(state: AppState) -> Router {
    // A separate frontend drives this API, so CORS stays permissive.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route(
            "/api/v1/interactions",
            post(create_interaction).get(list_interactions),
        )
        .route("/api/v1/interactions/{interactionId}/ws", get(ws_attach))
        .route_layer(middleware::from_fn(auth::require_user));

    Router::new()
        .route("/api/v1/auth/login", post(auth::login))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_interaction(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let coordinator = state.coordinator(&user.0).await?;
    let interaction_id = coordinator.create_interaction().await?;
    Ok(Json(
        serde_json::json!({ "success": true, "interactionId": interaction_id }),
    ))
}

async fn list_interactions(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> Result<Json<Vec<InteractionSummary>>, ApiError> {
    let coordinator = state.coordinator(&user.0).await?;
    Ok(Json(coordinator.list_interactions().await?))
}

/// Upgrades the connection and binds it to the interaction in the path.
/// The coordinator is resolved first so an identity problem fails as a
/// plain HTTP response instead of after the upgrade.
async fn ws_attach(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(interaction_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if interaction_id.trim().is_empty() {
        return Err(ApiError(roadie_core::RoadieError::validation(
            "interactionId must not be blank",
        )));
    }
    let coordinator = state.coordinator(&user.0).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, coordinator, interaction_id)))
}

async fn handle_socket(
    mut socket: WebSocket,
    coordinator: CoordinatorHandle,
    interaction_id: String,
) {
    let conn_id = ConnectionId::new();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

    let conn = ConnectionHandle::new(conn_id, outbound_tx);
    if let Err(e) = coordinator.attach(conn, interaction_id.clone()).await {
        tracing::warn!(connection_id = %conn_id, interaction_id, error = %e, "attach rejected");
        if let Ok(frame) = serde_json::to_string(&ServerEvent::error(e.to_string())) {
            let _ = socket.send(Message::Text(frame.into())).await;
        }
        let _ = socket.close().await;
        return;
    }
    tracing::info!(connection_id = %conn_id, interaction_id, "socket attached");

    pump(socket, &coordinator, conn_id, outbound_rx).await;

    let _ = coordinator.detach(conn_id).await;
    tracing::info!(connection_id = %conn_id, "socket closed");
}

/// Shuttles frames both ways until either side closes. When the
/// coordinator drops this connection it closes the outbound channel, which
/// yields the buffered frames first, so an error event reaches the client
/// before the socket shuts.
async fn pump(
    socket: WebSocket,
    coordinator: &CoordinatorHandle,
    conn_id: ConnectionId,
    mut outbound_rx: mpsc::Receiver<String>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                let Some(frame) = outbound else { break };
                if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Binary(audio))) => {
                        if coordinator.submit_audio(conn_id, audio).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        if text.as_str() == "ping" {
                            if ws_tx.send(Message::Text("pong".into())).await.is_err() {
                                break;
                            }
                        } else {
                            tracing::debug!(connection_id = %conn_id, "ignoring text frame");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Ping and pong frames are answered by the protocol layer.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %conn_id, error = %e, "socket receive failed");
                        break;
                    }
                }
            }
        }
    }

    let _ = ws_tx.close().await;
}
