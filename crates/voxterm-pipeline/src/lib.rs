use std::time::Duration;
use tokio::sync::mpsc;
use voxterm_core::{AudioChunk, SttError};
use voxterm_detect::StopPhraseDetector;
use voxterm_stt::{SttConfig, TranscriptionSession};

const MAX_CONNECT_FAILURES: u32 = 3;
const RECONNECT_DELAY: Duration = Duration::from_millis(250);

/// Wires captured audio into an STT session and session updates into the
/// stop-phrase detector, emitting one command string per detected phrase.
///
/// One session lives per command: after a command is emitted (or the
/// session dies), the transport is torn down and a fresh session with
/// empty transcript state is connected for the next command. A partial
/// transcript from a dead session is discarded, never dispatched.
pub struct CommandPipeline {
    url: String,
    stt_config: SttConfig,
    detector: StopPhraseDetector,
    chunk_rx: mpsc::UnboundedReceiver<AudioChunk>,
    command_tx: mpsc::UnboundedSender<String>,
    command_rx: Option<mpsc::UnboundedReceiver<String>>,
}

impl CommandPipeline {
    pub fn new(
        url: &str,
        stt_config: SttConfig,
        detector: StopPhraseDetector,
        chunk_rx: mpsc::UnboundedReceiver<AudioChunk>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        Self {
            url: url.to_string(),
            stt_config,
            detector,
            chunk_rx,
            command_tx,
            command_rx: Some(command_rx),
        }
    }

    /// The stream of completed commands. Can only be taken once.
    pub fn take_command_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<String>> {
        self.command_rx.take()
    }

    /// Run until the capture side closes its channel (clean shutdown) or
    /// connecting to the backend fails repeatedly.
    pub async fn run(mut self) -> Result<(), SttError> {
        let mut connect_failures = 0u32;

        'sessions: loop {
            let session = match TranscriptionSession::connect(&self.url, &self.stt_config).await {
                Ok(s) => {
                    connect_failures = 0;
                    s
                }
                Err(e) => {
                    connect_failures += 1;
                    if connect_failures >= MAX_CONNECT_FAILURES {
                        tracing::error!("giving up after {} connect failures", connect_failures);
                        return Err(e);
                    }
                    tracing::warn!("STT connect failed ({}): {}", connect_failures, e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue 'sessions;
                }
            };
            let (mut sink, mut tokens) = session.split();
            tracing::debug!("listening for next command");

            // Send and receive progress independently; neither arm awaits
            // the other beyond normal network backpressure.
            loop {
                tokio::select! {
                    maybe_chunk = self.chunk_rx.recv() => match maybe_chunk {
                        Some(chunk) => {
                            if let Err(e) = sink.send_audio(&chunk).await {
                                tracing::warn!("audio send failed, restarting session: {}", e);
                                sink.close().await;
                                tokio::time::sleep(RECONNECT_DELAY).await;
                                continue 'sessions;
                            }
                        }
                        None => {
                            tracing::info!("audio capture stopped, shutting down pipeline");
                            sink.close().await;
                            return Ok(());
                        }
                    },
                    update = tokens.next_update() => match update {
                        Ok(Some(update)) => {
                            let result = self.detector.process(&update.transcript);
                            if result.detected {
                                tracing::info!(command = %result.command, "stop phrase detected");
                                sink.close().await;
                                if self.command_tx.send(result.command).is_err() {
                                    tracing::info!("command consumer gone, shutting down");
                                    return Ok(());
                                }
                                continue 'sessions;
                            }
                        }
                        // Failure teardowns are paced like failed connects;
                        // only command emission reconnects immediately.
                        Ok(None) => {
                            tracing::warn!("backend closed the session, discarding partial transcript");
                            sink.close().await;
                            tokio::time::sleep(RECONNECT_DELAY).await;
                            continue 'sessions;
                        }
                        Err(e) => {
                            tracing::error!("session failed, discarding partial transcript: {}", e);
                            sink.close().await;
                            tokio::time::sleep(RECONNECT_DELAY).await;
                            continue 'sessions;
                        }
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_stt_config() -> SttConfig {
        SttConfig {
            api_key: "k".to_string(),
            model: "stt-rt-v4".to_string(),
            sample_rate: 16000,
            num_channels: 1,
            audio_format: "pcm_s16le".to_string(),
            language_hints: vec!["en".to_string()],
            language_hints_strict: true,
        }
    }

    #[tokio::test]
    async fn test_command_receiver_taken_once() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut pipeline = CommandPipeline::new(
            "ws://127.0.0.1:1",
            test_stt_config(),
            StopPhraseDetector::default(),
            rx,
        );
        assert!(pipeline.take_command_receiver().is_some());
        assert!(pipeline.take_command_receiver().is_none());
    }

    #[tokio::test]
    async fn test_run_fails_after_repeated_connect_failures() {
        // Nothing listens on this port; connect fails every attempt.
        let (_tx, rx) = mpsc::unbounded_channel();
        let pipeline = CommandPipeline::new(
            "ws://127.0.0.1:9",
            test_stt_config(),
            StopPhraseDetector::default(),
            rx,
        );
        let result = tokio::time::timeout(Duration::from_secs(10), pipeline.run())
            .await
            .expect("run did not give up in time");
        assert!(result.is_err());
    }
}
