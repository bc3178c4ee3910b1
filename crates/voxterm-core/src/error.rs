use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("missing required setting: {0}")]
    MissingValue(String),
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device not found: {0}")]
    NotFound(String),

    #[error("failed to enumerate devices: {0}")]
    Enumeration(String),

    #[error("failed to build stream: {0}")]
    StreamBuild(String),

    #[error("stream error: {0}")]
    Stream(String),
}

#[derive(Debug, Error)]
pub enum SttError {
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection closed unexpectedly")]
    ConnectionClosed,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("correction failed: {0}")]
    Correction(String),

    #[error("terminal command failed: {0}")]
    Terminal(String),
}
