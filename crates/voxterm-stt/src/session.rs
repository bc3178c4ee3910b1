use crate::transcript::TranscriptState;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use voxterm_core::{AudioChunk, SttConfigSection, SttError, TranscriptUpdate};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handshake payload. Must be the first message on the session; the backend
/// multiplexes control and data on one channel and rejects anything else.
#[derive(Debug, Clone, Serialize)]
pub struct SttConfig {
    pub api_key: String,
    pub model: String,
    pub sample_rate: u32,
    pub num_channels: u16,
    pub audio_format: String,
    pub language_hints: Vec<String>,
    pub language_hints_strict: bool,
}

impl SttConfig {
    pub fn from_section(section: &SttConfigSection, sample_rate: u32, num_channels: u16) -> Self {
        Self {
            api_key: section.api_key.clone(),
            model: section.model.clone(),
            sample_rate,
            num_channels,
            audio_format: "pcm_s16le".to_string(),
            language_hints: section.language_hints.clone(),
            language_hints_strict: section.language_hints_strict,
        }
    }
}

/// One live STT backend session.
///
/// `connect` opens the transport and writes the JSON handshake before
/// returning, so no session value exists on which audio could be sent
/// ahead of the configuration message.
pub struct TranscriptionSession {
    ws: WsStream,
}

impl TranscriptionSession {
    pub async fn connect(url: &str, config: &SttConfig) -> Result<Self, SttError> {
        let (mut ws, _) = connect_async(url)
            .await
            .map_err(|e| SttError::Transport(e.to_string()))?;

        let payload =
            serde_json::to_string(config).map_err(|e| SttError::Handshake(e.to_string()))?;
        ws.send(Message::Text(payload))
            .await
            .map_err(|e| SttError::Handshake(e.to_string()))?;

        tracing::debug!(model = %config.model, "STT session connected, handshake sent");
        Ok(Self { ws })
    }

    /// Split into independently progressing send and receive halves so a
    /// stall on one side can never deadlock the other.
    pub fn split(self) -> (AudioSink, TokenStream) {
        let (write, read) = self.ws.split();
        (
            AudioSink {
                write,
                closed: false,
            },
            TokenStream {
                read,
                state: TranscriptState::new(),
            },
        )
    }
}

/// Outbound half: raw binary PCM frames only, nothing else, ever.
pub struct AudioSink {
    write: SplitSink<WsStream, Message>,
    closed: bool,
}

impl AudioSink {
    pub async fn send_audio(&mut self, chunk: &AudioChunk) -> Result<(), SttError> {
        if self.closed {
            return Err(SttError::Protocol(
                "audio sent after session close".to_string(),
            ));
        }
        // Empty blocks carry no signal; skip them rather than waking the backend.
        if chunk.is_empty() {
            return Ok(());
        }
        self.write
            .send(Message::Binary(chunk.pcm_bytes()))
            .await
            .map_err(|e| SttError::Transport(e.to_string()))
    }

    /// Close the outbound half. Idempotent; errors during close are
    /// irrelevant since the session is being discarded anyway.
    pub async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.write.send(Message::Close(None)).await;
            let _ = self.write.close().await;
        }
    }
}

/// Inbound half: one transcript update per backend message, in arrival
/// order. Owns the [`TranscriptState`]; nothing else mutates it, so the
/// caller can run detection inline on each update without racing a writer.
pub struct TokenStream {
    read: SplitStream<WsStream>,
    state: TranscriptState,
}

impl TokenStream {
    /// `Ok(None)` after a clean close handshake; an unexpected transport
    /// drop is an error, because mid-command it means the transcript is
    /// incomplete and must be discarded.
    pub async fn next_update(&mut self) -> Result<Option<TranscriptUpdate>, SttError> {
        while let Some(msg) = self.read.next().await {
            match msg {
                Ok(Message::Text(text)) => return self.state.apply_message(&text).map(Some),
                Ok(Message::Close(_)) => return Ok(None),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(other) => {
                    tracing::warn!("ignoring unexpected backend frame: {:?}", other);
                    continue;
                }
                Err(e) => return Err(SttError::Transport(e.to_string())),
            }
        }
        Err(SttError::ConnectionClosed)
    }

    pub fn full_transcript(&self) -> String {
        self.state.full_transcript()
    }

    pub fn state(&self) -> &TranscriptState {
        &self.state
    }
}
