use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    serve, Json, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use tokio::sync::mpsc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::chat::{invalid_frame, Conversation, InboundMessage, OutboundEvent, OUTBOUND_CAPACITY};
use crate::constants::{Starter, STARTERS};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    conversation: Arc<Conversation>,
}

impl AppState {
    pub fn new(conversation: Arc<Conversation>, templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir.into())),
            conversation,
        }
    }
}

// Templates are re-read whenever the directory changes.
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, Html<String>> {
    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                let context = minijinja::context! {
                    title => "Ashley",
                    starters => STARTERS.to_vec(),
                };
                tmpl.render(context)
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            Html(format!("Internal Server Error: {}", e))
        })
}

async fn starters_handler() -> Json<Vec<Starter>> {
    Json(STARTERS.to_vec())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn decode_inbound(text: &str) -> Result<InboundMessage, OutboundEvent> {
    serde_json::from_str::<InboundMessage>(text).map_err(|e| {
        warn!(error = %e, "Received malformed chat message");
        invalid_frame(format!("malformed message: {}", e))
    })
}

/// Writes one event to the client. Returns `false` once the client is gone.
async fn send_event(socket: &mut WebSocket, event: &OutboundEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json_msg) => {
            if socket.send(Message::Text(json_msg)).await.is_err() {
                warn!("WebSocket client disconnected or send error. Closing connection.");
                return false;
            }
        }
        Err(e) => error!("Failed to serialize outbound event: {}", e),
    }
    true
}

// Each inbound message runs as its own task; all of them report through one channel.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("New WebSocket connection established");
    let (tx, mut rx) = mpsc::channel::<OutboundEvent>(OUTBOUND_CAPACITY);

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                if !send_event(&mut socket, &event).await {
                    break;
                }
            }

            incoming = socket.recv() => {
                let decoded = match incoming {
                    Some(Ok(Message::Text(text))) => {
                        debug!(len = text.len(), "Received text frame");
                        decode_inbound(&text)
                    }
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => decode_inbound(text),
                        Err(e) => {
                            warn!("Received non UTF-8 binary frame");
                            Err(invalid_frame(format!("binary frame is not text: {}", e)))
                        }
                    },
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) => {
                        info!("Client requested WebSocket close");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        break;
                    }
                    None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                };

                match decoded {
                    Ok(message) => {
                        let conversation = state.conversation.clone();
                        let turn_tx = tx.clone();
                        tokio::spawn(async move {
                            let outcome = conversation.on_message(message, &turn_tx).await;
                            debug!(?outcome, "WebSocket turn finished");
                        });
                    }
                    // Written directly: this loop is the only reader of `rx`.
                    Err(event) => {
                        if !send_event(&mut socket, &event).await {
                            break;
                        }
                    }
                }
            }
        }
    }
    info!("WebSocket connection closed");
}

pub fn build_router(state: AppState, public_dir: impl AsRef<Path>) -> Router {
    // Starter icons live under /public
    let static_files_service = ServeDir::new(public_dir.as_ref()).not_found_service(
        tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>((StatusCode::NOT_FOUND, "Not Found").into_response())
        }),
    );

    Router::new()
        .route("/", get(index_handler))
        .route("/starters", get(starters_handler))
        .route("/ws", get(ws_handler))
        .nest_service("/public", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server(port: u16, conversation: Arc<Conversation>) -> Result<()> {
    let state = AppState::new(conversation, "templates");
    let app = build_router(state, "public");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_inbound() {
        let msg = decode_inbound(r#"{"content":"hi","elements":[{"name":"a.png"}]}"#).unwrap();
        assert_eq!(msg.content, "hi");
        assert_eq!(msg.elements[0].name, "a.png");

        match decode_inbound("{not json") {
            Err(OutboundEvent::Error { error }) => assert!(error.contains("malformed message")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
