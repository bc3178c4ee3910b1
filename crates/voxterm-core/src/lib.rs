pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AppConfig, AudioConfig, CorrectionConfig, DetectorConfig, GeneralConfig, SttConfigSection,
    TerminalConfig,
};
pub use error::{ConfigError, DeviceError, DispatchError, SttError};
pub use types::{AudioChunk, DetectionResult, Token, TranscriptUpdate};
