use regex::Regex;
use voxterm_core::DetectionResult;

/// Detects a trailing stop phrase (default "thank you") that marks the end
/// of a spoken command, and strips it from the transcript.
///
/// Only a true trailing match counts: the phrase appearing mid-sentence
/// never triggers, and only the listed punctuation-led variants are
/// recognized. This is a deliberately narrow matcher, not a general
/// punctuation-stripping pass.
pub struct StopPhraseDetector {
    phrase: String,
    phrase_lower: String,
    trailing_punct: Regex,
}

const SEPARATORS: [&str; 3] = [". ", ", ", "! "];

impl StopPhraseDetector {
    pub fn new(phrase: &str) -> Self {
        Self {
            phrase: phrase.to_string(),
            phrase_lower: phrase.to_lowercase(),
            trailing_punct: Regex::new(r"[,.\s]+$").unwrap(),
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn process(&self, transcript: &str) -> DetectionResult {
        let trimmed = transcript.trim();
        if trimmed.is_empty() {
            return DetectionResult::none();
        }

        // Direct match at the end: strip the phrase, then any trailing
        // run of commas, periods, and whitespace.
        if let Some(cut) = ci_suffix_start(trimmed, &self.phrase_lower) {
            let command = trimmed[..cut].trim();
            let command = self.trailing_punct.replace(command, "");
            return DetectionResult {
                detected: true,
                command: command.to_string(),
            };
        }

        // Punctuation-led variants: the exact separator+phrase suffix is
        // removed, nothing more.
        for sep in SEPARATORS {
            let variation = format!("{}{}", sep, self.phrase_lower);
            if let Some(cut) = ci_suffix_start(trimmed, &variation) {
                let command = trimmed[..cut].trim();
                return DetectionResult {
                    detected: true,
                    command: command.to_string(),
                };
            }
        }

        DetectionResult::none()
    }
}

/// Byte index in `haystack` where the shortest suffix whose lowercase
/// equals `suffix_lower` begins. Case folds can change byte length
/// (U+212A lowercases to a one-byte "k"), so the index must come from
/// walking `haystack` itself, never from a lowercased copy of it.
fn ci_suffix_start(haystack: &str, suffix_lower: &str) -> Option<usize> {
    let mut lowered_len = 0usize;
    for (i, ch) in haystack.char_indices().rev() {
        lowered_len += ch.to_lowercase().map(char::len_utf8).sum::<usize>();
        if lowered_len > suffix_lower.len() {
            return None;
        }
        if lowered_len == suffix_lower.len() && haystack[i..].to_lowercase() == suffix_lower {
            return Some(i);
        }
    }
    None
}

impl Default for StopPhraseDetector {
    fn default() -> Self {
        Self::new("thank you")
    }
}
