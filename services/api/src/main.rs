mod config;

use crate::config::Config;
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use bargein_core::openai_speech::OpenAiSpeech;
use bargein_core::{Coordinator, InMemorySessionDirectory, UserTurn};
use bargein_types::{ChannelId, ClientEvent};
use futures::{SinkExt, StreamExt};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

/// Shared by every connection.
struct AppState {
    coordinator: Arc<Coordinator>,
    directory: Arc<InMemorySessionDirectory>,
}

/// Accepts the upgrade for the listener on `channel`.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(channel): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("WebSocket upgrade request received for channel {}", channel);
    ws.on_upgrade(move |socket| handle_socket(socket, ChannelId::new(channel), state))
}

/// Runs one listener connection.
///
/// Outbound coordinator events are written by a separate task so that a slow
/// socket never holds up the session.
async fn handle_socket(socket: WebSocket, channel: ChannelId, state: Arc<AppState>) {
    let session = state.directory.bind(&channel);
    let attachment = state.coordinator.attach(&session).await;
    let attachment_id = attachment.id;
    let mut events = attachment.events;
    info!("WebSocket connection established: {} -> {}", channel, session);

    let (mut sender, mut receiver) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to serialize {}: {}", event.kind(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                // Client disconnected.
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => state.coordinator.handle(&channel, event).await,
                Err(e) => warn!("Ignoring malformed signal on {}: {}", channel, e),
            },
            Ok(Message::Close(_)) => break,
            Ok(other) => debug!("Ignoring non-text frame: {:?}", other),
            Err(e) => {
                info!("WebSocket error: {}", e);
                break;
            }
        }
    }

    state.coordinator.detach(&session, attachment_id).await;
    // Another connection may have bound the channel meanwhile; it keeps the mapping.
    state.directory.release(&channel);
    writer.abort();
    info!("WebSocket connection closed: {}", channel);
}

/// Consumes accepted user turns. With echo enabled every turn is answered by
/// speaking it back, which is enough to exercise barge-in end to end.
async fn run_conversation(
    coordinator: Arc<Coordinator>,
    mut turns: mpsc::UnboundedReceiver<UserTurn>,
    echo_replies: bool,
) {
    while let Some(turn) = turns.recv().await {
        info!("User said on {}: \"{}\"", turn.session_id, turn.text);
        if !echo_replies {
            continue;
        }
        let reply = format!("You said: {}", turn.text);
        if let Err(e) = coordinator.begin_response(&turn.session_id, &reply).await {
            warn!("Could not reply on {}: {}", turn.session_id, e);
        }
    }
}

fn router(state: Arc<AppState>) -> Router {
    // Permissive CORS so a separately served frontend can connect.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/{channel}", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Initialize Speech Clients ---
    let speech = Arc::new(
        OpenAiSpeech::new(
            config.openai_api_key.clone(),
            config.tts_model.clone(),
            config.stt_model.clone(),
        )
        .with_base_url(&config.openai_base_url),
    );

    // --- 4. Build the Coordinator ---
    let directory = Arc::new(InMemorySessionDirectory::new());
    let (coordinator, turns) = Coordinator::new(
        config.coordinator.clone(),
        directory.clone(),
        speech.clone(),
        speech,
    );
    let coordinator = Arc::new(coordinator);
    let conversation = tokio::spawn(run_conversation(
        coordinator.clone(),
        turns,
        config.echo_replies,
    ));

    // --- 5. Serve ---
    let app = router(Arc::new(AppState {
        coordinator,
        directory,
    }));
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    info!("Starting WebSocket server, listening on {}", config.bind_address);

    tokio::select! {
        result = axum::serve(listener, app).into_future() => result?,
        _ = conversation => {},
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down...");
        }
    }
    info!("Shutting down...");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bargein_core::{SpeechOptions, SpeechStream, SpeechToText, TextToSpeech, Utterance};
    use bargein_types::{PauseReason, ServerEvent, Status};
    use bytes::Bytes;
    use std::time::Duration;

    /// Speaks every text as two chunks and then keeps the stream open.
    struct ScriptedSpeech;

    #[async_trait]
    impl TextToSpeech for ScriptedSpeech {
        async fn generate(&self, _text: &str, _options: &SpeechOptions) -> anyhow::Result<SpeechStream> {
            let chunks = futures::stream::iter(vec![
                Ok::<_, anyhow::Error>(Bytes::from_static(b"one")),
                Ok(Bytes::from_static(b"two")),
            ])
            .chain(futures::stream::pending());
            Ok(SpeechStream {
                mime_type: "audio/mpeg".to_string(),
                chunks: chunks.boxed(),
            })
        }
    }

    #[async_trait]
    impl SpeechToText for ScriptedSpeech {
        async fn transcribe(&self, _audio: Vec<u8>) -> anyhow::Result<Utterance> {
            Ok(Utterance {
                text: String::new(),
                confidence: 0.0,
            })
        }
    }

    async fn serve() -> String {
        let speech = Arc::new(ScriptedSpeech);
        let directory = Arc::new(InMemorySessionDirectory::new());
        let (coordinator, turns) = Coordinator::new(
            Default::default(),
            directory.clone(),
            speech.clone(),
            speech,
        );
        let coordinator = Arc::new(coordinator);
        tokio::spawn(run_conversation(coordinator.clone(), turns, true));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::new(AppState {
            coordinator,
            directory,
        }));
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("ws://{}", addr)
    }

    async fn next(events: &mut bargein_client::ServerRx) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for server event")
            .unwrap()
    }

    #[tokio::test]
    async fn spoken_reply_can_be_paused_and_interrupted() {
        let url = serve().await;
        let client = bargein_client::connect(&url, "room-1").await.unwrap();
        let mut events = client.server_events().unwrap();

        client.speak("hello").await.unwrap();
        let ServerEvent::StreamStart(start) = next(&mut events).await else {
            panic!("expected stream.start");
        };
        let id = start.response_id().clone();
        assert!(matches!(next(&mut events).await, ServerEvent::StreamChunk(_)));
        assert!(matches!(next(&mut events).await, ServerEvent::StreamChunk(_)));

        client.utterance_started().await.unwrap();
        let ServerEvent::PauseChanged(paused) = next(&mut events).await else {
            panic!("expected pause.changed");
        };
        assert!(paused.paused());
        assert_eq!(paused.reason(), PauseReason::SpeechStarted);
        assert_eq!(paused.response_id(), &id);
        assert!(matches!(
            next(&mut events).await,
            ServerEvent::StatusChanged(ref s) if s.status() == Status::Interrupting
        ));

        client
            .utterance_result("please stop", 0.93, Some(id.clone()))
            .await
            .unwrap();
        assert!(matches!(
            next(&mut events).await,
            ServerEvent::ResponseInterrupted(ref r) if r.response_id() == &id
        ));
        assert!(matches!(next(&mut events).await, ServerEvent::StatusChanged(_)));
        assert!(matches!(
            next(&mut events).await,
            ServerEvent::UserTurn(ref t) if t.text() == "please stop"
        ));

        // the echo reply is a fresh response
        let ServerEvent::StreamStart(reply) = next(&mut events).await else {
            panic!("expected the echo reply to start");
        };
        assert_ne!(reply.response_id(), &id);
    }

    #[tokio::test]
    async fn health_endpoint_answers() {
        let url = serve().await.replace("ws://", "http://");
        let body = reqwest::get(format!("{}/health", url))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }
}
