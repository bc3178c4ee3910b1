use async_trait::async_trait;
use serde_json::{json, Value};
use voxterm_core::{CorrectionConfig, DispatchError};

const SYSTEM_PROMPT: &str = "\
You are a voice transcription corrector for terminal commands. The user \
speaks mixed Vietnamese/English; technical terms (tools, APIs, file names) \
are in English. Translate the MEANING into natural English, not word by \
word. Preserve every idea the user intended, merge repetitions, and drop \
fillers and false starts. Keep profanity intact, translated to equivalent \
English. Fix common STT mishearings: 'cross code'/'cloud code' -> 'Claude \
Code', 'tea mux'/'T mux' -> 'tmux', 'L M'/'elem' -> 'LLM', 'A.P.I' -> \
'API', 'get hub' -> 'GitHub', 'pie test' -> 'pytest', 'you v' -> 'uv', \
'pee npm' -> 'pnpm'. Return only the corrected command text, no \
explanations.";

/// Corrects a raw STT transcript into a clean command, optionally using
/// recent terminal output for disambiguation. A single stateless call.
#[async_trait]
pub trait Corrector: Send + Sync {
    async fn correct(
        &self,
        transcript: &str,
        terminal_context: &str,
    ) -> Result<String, DispatchError>;
}

/// Passes the transcript through untouched. Used when correction is
/// disabled or unconfigured.
pub struct NoopCorrector;

#[async_trait]
impl Corrector for NoopCorrector {
    async fn correct(
        &self,
        transcript: &str,
        _terminal_context: &str,
    ) -> Result<String, DispatchError> {
        Ok(transcript.to_string())
    }
}

/// LLM correction via an OpenAI-compatible chat-completions endpoint
/// (Grok by default).
pub struct GrokCorrector {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    context_limit: usize,
}

impl GrokCorrector {
    pub fn new(config: &CorrectionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            context_limit: config.context_limit,
        }
    }

    /// Trailing window of the terminal context, bounded to keep token
    /// usage sane.
    fn context_tail(context: &str, limit: usize) -> &str {
        if context.len() <= limit {
            return context;
        }
        let mut start = context.len() - limit;
        while !context.is_char_boundary(start) {
            start += 1;
        }
        &context[start..]
    }

    fn build_user_content(&self, transcript: &str, terminal_context: &str) -> String {
        let mut content = String::new();
        if !terminal_context.is_empty() {
            let tail = Self::context_tail(terminal_context, self.context_limit);
            content.push_str(&format!(
                "## Terminal Context (most recent output):\n```\n{}\n```\n\n",
                tail
            ));
        }
        content.push_str(&format!(
            "## Voice Transcript (may have pronunciation errors):\n\"{}\"",
            transcript
        ));
        content
    }
}

#[async_trait]
impl Corrector for GrokCorrector {
    async fn correct(
        &self,
        transcript: &str,
        terminal_context: &str,
    ) -> Result<String, DispatchError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": self.build_user_content(transcript, terminal_context)},
            ],
            "temperature": 0.1,
        });

        let response: Value = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Correction(e.to_string()))?
            .json()
            .await
            .map_err(|e| DispatchError::Correction(e.to_string()))?;

        if let Some(error) = response.get("error") {
            let message = error["message"].as_str().unwrap_or("unknown error");
            return Err(DispatchError::Correction(message.to_string()));
        }

        let content = response["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| {
                DispatchError::Correction("no content in completion response".to_string())
            })?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrector(limit: usize) -> GrokCorrector {
        GrokCorrector::new(&CorrectionConfig {
            enabled: true,
            api_key: "k".to_string(),
            model: "grok-3-fast".to_string(),
            base_url: "https://api.x.ai/v1".to_string(),
            context_limit: limit,
        })
    }

    #[tokio::test]
    async fn test_noop_corrector_passes_through() {
        let corrected = NoopCorrector
            .correct("ls -la", "irrelevant context")
            .await
            .unwrap();
        assert_eq!(corrected, "ls -la");
    }

    #[test]
    fn test_user_content_without_context() {
        let content = corrector(2000).build_user_content("pie test please", "");
        assert!(content.starts_with("## Voice Transcript"));
        assert!(content.contains("pie test please"));
        assert!(!content.contains("Terminal Context"));
    }

    #[test]
    fn test_user_content_with_context() {
        let content = corrector(2000).build_user_content("fix it", "error: missing semicolon");
        assert!(content.starts_with("## Terminal Context"));
        assert!(content.contains("error: missing semicolon"));
        assert!(content.contains("fix it"));
    }

    #[test]
    fn test_context_truncated_to_trailing_window() {
        let context = "x".repeat(100) + "TAIL";
        let content = corrector(4).build_user_content("cmd", &context);
        assert!(content.contains("TAIL"));
        assert!(!content.contains("xTAIL"));
    }

    #[test]
    fn test_context_tail_respects_char_boundaries() {
        // Multi-byte characters at the cut point must not panic
        let context = "ờ".repeat(50);
        let tail = GrokCorrector::context_tail(&context, 5);
        assert!(tail.len() <= 5);
        assert!(tail.chars().all(|c| c == 'ờ'));
    }
}
