use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    pub stt: SttConfigSection,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub terminal: Option<TerminalConfig>,

    #[serde(default)]
    pub correction: Option<CorrectionConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    #[serde(default = "default_chunk_samples")]
    pub chunk_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            chunk_samples: default_chunk_samples(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SttConfigSection {
    #[serde(default = "default_stt_url")]
    pub url: String,

    pub api_key: String,

    #[serde(default = "default_stt_model")]
    pub model: String,

    #[serde(default = "default_language_hints")]
    pub language_hints: Vec<String>,

    #[serde(default = "default_true")]
    pub language_hints_strict: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_stop_phrase")]
    pub stop_phrase: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            stop_phrase: default_stop_phrase(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TerminalConfig {
    pub socket_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorrectionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    pub api_key: String,

    #[serde(default = "default_correction_model")]
    pub model: String,

    #[serde(default = "default_correction_base_url")]
    pub base_url: String,

    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_device_name() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_chunk_samples() -> usize {
    4096
}

fn default_stt_url() -> String {
    "wss://stt-rt.soniox.com/transcribe-websocket".to_string()
}

fn default_stt_model() -> String {
    "stt-rt-v4".to_string()
}

fn default_language_hints() -> Vec<String> {
    vec!["vi".to_string(), "en".to_string()]
}

fn default_stop_phrase() -> String {
    "thank you".to_string()
}

fn default_correction_model() -> String {
    "grok-3-fast".to_string()
}

fn default_correction_base_url() -> String {
    "https://api.x.ai/v1".to_string()
}

fn default_context_limit() -> usize {
    2000
}

fn default_true() -> bool {
    true
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        config.validate()?;
        Ok(config)
    }

    /// Startup-time checks beyond what serde enforces. Missing credentials
    /// fail here, before any device or network is touched.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.stt.api_key.is_empty() {
            return Err(ConfigError::MissingValue("stt.api_key".to_string()));
        }
        if let Some(ref correction) = self.correction {
            if correction.enabled && correction.api_key.is_empty() {
                return Err(ConfigError::MissingValue("correction.api_key".to_string()));
            }
        }
        if let Some(ref terminal) = self.terminal {
            if terminal.socket_path.is_empty() {
                return Err(ConfigError::MissingValue("terminal.socket_path".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[stt]
api_key = "test-key"
"#;

    #[test]
    fn test_config_parse_minimal_toml() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.audio.device_name, "default");
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.audio.chunk_samples, 4096);
        assert_eq!(config.stt.api_key, "test-key");
        assert_eq!(config.stt.model, "stt-rt-v4");
        assert!(config.stt.language_hints_strict);
        assert_eq!(config.detector.stop_phrase, "thank you");
        assert!(config.terminal.is_none());
        assert!(config.correction.is_none());
    }

    #[test]
    fn test_config_parse_full_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[audio]
device_name = "USB Microphone"
sample_rate = 16000
chunk_samples = 2048

[stt]
url = "ws://localhost:9999"
api_key = "secret"
model = "stt-rt-v4"
language_hints = ["en"]
language_hints_strict = false

[detector]
stop_phrase = "over and out"

[terminal]
socket_path = "unix:/tmp/kitty-1"

[correction]
api_key = "grok-key"
model = "grok-3-fast"
context_limit = 1000
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.audio.device_name, "USB Microphone");
        assert_eq!(config.audio.chunk_samples, 2048);
        assert_eq!(config.stt.url, "ws://localhost:9999");
        assert_eq!(config.stt.language_hints, vec!["en"]);
        assert!(!config.stt.language_hints_strict);
        assert_eq!(config.detector.stop_phrase, "over and out");
        assert_eq!(config.terminal.unwrap().socket_path, "unix:/tmp/kitty-1");
        let correction = config.correction.unwrap();
        assert!(correction.enabled);
        assert_eq!(correction.context_limit, 1000);
    }

    #[test]
    fn test_config_env_var_interpolation() {
        std::env::set_var("VOXTERM_TEST_KEY", "from-env");
        let toml_str = r#"
[stt]
api_key = "${VOXTERM_TEST_KEY}"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.stt.api_key, "from-env");
        std::env::remove_var("VOXTERM_TEST_KEY");
    }

    #[test]
    fn test_config_missing_env_var_error() {
        let toml_str = r#"
[stt]
api_key = "${DEFINITELY_DOES_NOT_EXIST_12345}"
"#;
        let result = AppConfig::from_toml_str(toml_str);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("DEFINITELY_DOES_NOT_EXIST_12345"));
    }

    #[test]
    fn test_config_empty_api_key_rejected() {
        let toml_str = r#"
[stt]
api_key = ""
"#;
        match AppConfig::from_toml_str(toml_str) {
            Err(ConfigError::MissingValue(field)) => assert_eq!(field, "stt.api_key"),
            other => panic!("expected MissingValue, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_config_missing_stt_section_rejected() {
        assert!(AppConfig::from_toml_str("").is_err());
    }

    #[test]
    fn test_config_correction_requires_key_when_enabled() {
        let toml_str = r#"
[stt]
api_key = "k"

[correction]
enabled = true
api_key = ""
"#;
        match AppConfig::from_toml_str(toml_str) {
            Err(ConfigError::MissingValue(field)) => assert_eq!(field, "correction.api_key"),
            other => panic!("expected MissingValue, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_config_invalid_toml_error() {
        let result = AppConfig::from_toml_str("this is not valid toml [[[");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = std::env::temp_dir().join("voxterm_test_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.toml");
        std::fs::write(
            &path,
            r#"
[general]
log_level = "warn"

[stt]
api_key = "file-key"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.stt.api_key, "file-key");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_load_from_file_not_found() {
        let result = AppConfig::load_from_file(std::path::Path::new("/nonexistent/path.toml"));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("failed to read config file"));
    }
}
