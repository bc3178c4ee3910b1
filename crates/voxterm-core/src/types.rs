use serde::Deserialize;

/// One block of captured microphone audio. Produced once by the capture
/// callback, consumed once by the pipeline, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioChunk {
    /// Raw little-endian PCM bytes, the only payload the backend accepts
    /// after the handshake.
    pub fn pcm_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.samples.len() * 2);
        for s in &self.samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True when every sample is zero. Muted or idle inputs deliver
    /// full-size blocks of zeros, so emptiness alone does not spot them.
    pub fn is_silence(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }
}

/// Backend-reported transcript fragment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Token {
    pub text: String,
    #[serde(default)]
    pub is_final: bool,
}

/// Accumulated transcript after one backend message, paired with whether
/// that message finalized any text. Delivered atomically per message.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptUpdate {
    pub transcript: String,
    pub has_final: bool,
}

/// Outcome of running the stop-phrase detector over a transcript.
/// `command` is only meaningful when `detected` is true.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub detected: bool,
    pub command: String,
}

impl DetectionResult {
    pub fn none() -> Self {
        Self {
            detected: false,
            command: String::new(),
        }
    }
}
