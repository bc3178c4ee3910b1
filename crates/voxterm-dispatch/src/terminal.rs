use async_trait::async_trait;
use tokio::process::Command;
use voxterm_core::{ConfigError, DispatchError};

/// Remote control of a terminal: read the current pane and type commands
/// into it. Each call is independent; within one `send_command` the text
/// is always sent before the submit key.
#[async_trait]
pub trait Terminal: Send + Sync {
    async fn get_text(&self) -> Result<String, DispatchError>;
    async fn send_command(&self, text: &str) -> Result<(), DispatchError>;
}

/// Kitty remote control over its listen socket (`kitty @ --to <socket>`).
/// Requires `allow_remote_control yes` in the kitty config.
pub struct KittyTerminal {
    socket_path: String,
}

impl KittyTerminal {
    pub fn new(socket_path: &str) -> Self {
        Self {
            socket_path: socket_path.to_string(),
        }
    }

    /// Socket path from `$KITTY_LISTEN_ON`, the address kitty exports to
    /// its child processes.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("KITTY_LISTEN_ON")
            .map_err(|_| ConfigError::EnvVarNotFound("KITTY_LISTEN_ON".to_string()))?;
        if path.is_empty() {
            return Err(ConfigError::MissingValue("KITTY_LISTEN_ON".to_string()));
        }
        Ok(Self::new(&path))
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    async fn kitty(&self, args: &[&str]) -> Result<String, DispatchError> {
        let output = Command::new("kitty")
            .arg("@")
            .arg("--to")
            .arg(&self.socket_path)
            .args(args)
            .output()
            .await
            .map_err(|e| DispatchError::Terminal(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DispatchError::Terminal(format!(
                "kitty @ {} failed: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl Terminal for KittyTerminal {
    async fn get_text(&self) -> Result<String, DispatchError> {
        self.kitty(&["get-text"]).await
    }

    async fn send_command(&self, text: &str) -> Result<(), DispatchError> {
        self.kitty(&["send-text", text]).await?;
        self.kitty(&["send-key", "Return"]).await?;
        Ok(())
    }
}
