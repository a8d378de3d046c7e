use crate::types;
use crate::types::events::client::*;
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

mod config;
mod consts;

pub use config::{Config, ConfigBuilder};

pub type ClientTx = tokio::sync::mpsc::Sender<types::ClientEvent>;
type ServerTx = tokio::sync::broadcast::Sender<types::ServerEvent>;
pub type ServerRx = tokio::sync::broadcast::Receiver<types::ServerEvent>;

// Holds the channel capacity, the endpoint configuration and the transmitters
// wired to the websocket tasks once connected.
pub struct Client {
    capacity: usize,
    config: Config,
    c_tx: Option<ClientTx>,
    s_tx: Option<ServerTx>,
    closed: CancellationToken,
}

impl Client {
    fn new(capacity: usize, config: Config) -> Self {
        Self {
            capacity,
            config,
            c_tx: None,
            s_tx: None,
            closed: CancellationToken::new(),
        }
    }

    async fn connect(&mut self) -> Result<()> {
        if self.c_tx.is_some() {
            return Err(anyhow::anyhow!("already connected"));
        }

        let endpoint = self.config.endpoint();
        let (ws_stream, _) = tokio_tungstenite::connect_async(endpoint.as_str()).await?;
        tracing::info!("connected to {}", endpoint);

        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<types::ClientEvent>(self.capacity);
        let (s_tx, _) = tokio::sync::broadcast::channel(self.capacity);

        self.c_tx = Some(c_tx);
        self.s_tx = Some(s_tx.clone());

        // Writer: serialize queued client events onto the socket.
        tokio::spawn(async move {
            while let Some(event) = c_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                    }
                }
            }
            let _ = write.close().await;
        });

        // Reader: parse server events and broadcast them to subscribers.
        let closed = self.closed.clone();
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => match serde_json::from_str::<types::ServerEvent>(&text) {
                        Ok(event) => {
                            tracing::debug!("received message: {}", event.kind());
                            if let Err(e) = s_tx.send(event) {
                                tracing::error!("failed to send event: {}", e);
                            }
                        }
                        Err(e) => {
                            tracing::error!("failed to deserialize event: {}, text=> {:?}", e, text);
                        }
                    },
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("connection closed: {:?}", reason);
                        break;
                    }
                    _ => {}
                }
            }
            closed.cancel();
        });
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // Get a server receiver that we can use to receive server events.
    pub fn server_events(&self) -> Result<ServerRx> {
        match self.s_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    /// Resolves once the server side of the connection has gone away.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// Send a client event.
    pub async fn send_client_event(&self, event: types::ClientEvent) -> Result<()> {
        match self.c_tx {
            Some(ref tx) => {
                tx.send(event).await?;
                Ok(())
            }
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    pub async fn utterance_started(&self) -> Result<()> {
        let event = types::ClientEvent::UtteranceStarted(UtteranceStartedEvent::new());
        self.send_client_event(event).await
    }

    pub async fn utterance_result(
        &self,
        text: &str,
        confidence: f32,
        paused_response_id: Option<types::ResponseId>,
    ) -> Result<()> {
        let mut data = UtteranceResultEvent::new(text, confidence);
        if let Some(id) = paused_response_id {
            data = data.with_paused_response_id(id);
        }
        self.send_client_event(types::ClientEvent::UtteranceResult(data))
            .await
    }

    pub async fn utterance_audio(
        &self,
        audio: &[u8],
        paused_response_id: Option<types::ResponseId>,
    ) -> Result<()> {
        let mut data = UtteranceAudioEvent::new(types::audio::encode(audio));
        if let Some(id) = paused_response_id {
            data = data.with_paused_response_id(id);
        }
        self.send_client_event(types::ClientEvent::UtteranceAudio(data))
            .await
    }

    pub async fn playback_ended(&self, response_id: types::ResponseId) -> Result<()> {
        let event = types::ClientEvent::PlaybackEnded(PlaybackEndedEvent::new(response_id));
        self.send_client_event(event).await
    }

    pub async fn speak(&self, text: &str) -> Result<()> {
        let event = types::ClientEvent::Speak(SpeakEvent::new(text));
        self.send_client_event(event).await
    }
}

// Public function to create a client with specific config and connect to the coordinator.
pub async fn connect_with_config(capacity: usize, config: Config) -> Result<Client> {
    let mut client = Client::new(capacity, config);
    client.connect().await?;
    Ok(client)
}

// Connects to `channel` on the coordinator at `base_url` with default capacity.
pub async fn connect(base_url: &str, channel: &str) -> Result<Client> {
    let config = Config::builder()
        .with_base_url(base_url)
        .with_channel(channel)
        .build();
    connect_with_config(consts::DEFAULT_CAPACITY, config).await
}
