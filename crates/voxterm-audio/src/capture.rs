use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use voxterm_core::{AudioChunk, DeviceError};

// ── Chunker ───────────────────────────────────────────────────

/// Regroups arbitrary-length callback slices into exact fixed-size chunks.
///
/// The device is asked for the target block size, but drivers are free to
/// deliver whatever they like; accumulating here keeps emitted chunks at
/// exactly `chunk_samples` regardless, in capture order, with no drops.
pub struct Chunker {
    buf: Vec<i16>,
    chunk_samples: usize,
}

impl Chunker {
    pub fn new(chunk_samples: usize) -> Self {
        Self {
            buf: Vec::with_capacity(chunk_samples * 2),
            chunk_samples,
        }
    }

    /// Append captured samples; returns every complete chunk now available.
    pub fn push(&mut self, data: &[i16]) -> Vec<Vec<i16>> {
        self.buf.extend_from_slice(data);
        let mut out = Vec::new();
        while self.buf.len() >= self.chunk_samples {
            let rest = self.buf.split_off(self.chunk_samples);
            out.push(std::mem::replace(&mut self.buf, rest));
        }
        out
    }

    /// Samples buffered but not yet forming a complete chunk.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

// ── CaptureHandle ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Ok,
    Error,
    Disabled,
}

#[derive(Clone)]
pub struct CaptureHandle {
    enabled: Arc<AtomicBool>,
    status: Arc<AtomicU8>,
}

impl CaptureHandle {
    fn new() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
            status: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, v: bool) {
        self.enabled.store(v, Ordering::Relaxed);
    }

    pub fn status(&self) -> CaptureStatus {
        match self.status.load(Ordering::Relaxed) {
            1 => CaptureStatus::Error,
            2 => CaptureStatus::Disabled,
            _ => CaptureStatus::Ok,
        }
    }

    pub fn set_status(&self, s: CaptureStatus) {
        let v = match s {
            CaptureStatus::Ok => 0,
            CaptureStatus::Error => 1,
            CaptureStatus::Disabled => 2,
        };
        self.status.store(v, Ordering::Relaxed);
    }
}

// ── CaptureNode ───────────────────────────────────────────────

/// Owns one live cpal input stream. The device callback runs on the audio
/// thread and pushes complete [`AudioChunk`]s into an unbounded channel;
/// the consumer side awaits them from async context. Dropping the node
/// closes the stream and the sender, so the chunk sequence terminates
/// cleanly instead of blocking forever.
pub struct CaptureNode {
    _stream: Stream,
}

impl CaptureNode {
    pub fn new(
        device: &Device,
        chunk_tx: mpsc::UnboundedSender<AudioChunk>,
        sample_rate: u32,
        channels: u16,
        chunk_samples: usize,
    ) -> Result<(Self, CaptureHandle), DeviceError> {
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(chunk_samples as u32),
        };

        let handle = CaptureHandle::new();
        let enabled_flag = Arc::clone(&handle.enabled);
        let status_flag = Arc::clone(&handle.status);

        // Device errors are reported, never allowed to corrupt audio or
        // kill the capture thread.
        let err_callback = move |err: cpal::StreamError| {
            tracing::error!("capture stream error: {}", err);
            status_flag.store(1, Ordering::Relaxed); // Error
        };

        let mut chunker = Chunker::new(chunk_samples);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if !enabled_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    for samples in chunker.push(data) {
                        let chunk = AudioChunk {
                            samples,
                            sample_rate,
                            channels,
                        };
                        // Receiver gone means the pipeline is shutting down.
                        let _ = chunk_tx.send(chunk);
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| DeviceError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        Ok((Self { _stream: stream }, handle))
    }
}
