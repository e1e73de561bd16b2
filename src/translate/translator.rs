// file: src/translate/translator.rs
// description: hosted generative-model client with chunking and retry
// reference: https://ai.google.dev/api/generate-content

use crate::config::TranslatorConfig;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
];

/// A model capable of translating one bounded chunk of text.
#[async_trait]
pub trait TranslationModel: Send + Sync {
    async fn translate_chunk(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    candidate_count: u32,
    max_output_tokens: u32,
    temperature: f64,
    top_p: f64,
    top_k: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

/// HTTP client for a Gemini-style `generateContent` endpoint.
pub struct GenerativeModelClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    target_language: String,
    generation: GenerationConfig,
    safety_threshold: String,
}

impl GenerativeModelClient {
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            PipelineError::Config("translator.api_key is required for translation".to_string())
        })?;

        Ok(Self {
            client: Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            target_language: config.target_language.clone(),
            generation: GenerationConfig {
                candidate_count: config.candidate_count,
                max_output_tokens: config.max_output_tokens,
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
            },
            safety_threshold: config.safety_threshold.clone(),
        })
    }

    fn request_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn safety_settings(&self) -> Vec<SafetySetting> {
        SAFETY_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: (*category).to_string(),
                threshold: self.safety_threshold.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl TranslationModel for GenerativeModelClient {
    async fn translate_chunk(&self, text: &str) -> Result<String> {
        let prompt = format!(
            "Translate the following text to {}: {}",
            self.target_language, text
        );

        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                candidate_count: self.generation.candidate_count,
                max_output_tokens: self.generation.max_output_tokens,
                temperature: self.generation.temperature,
                top_p: self.generation.top_p,
                top_k: self.generation.top_k,
            },
            safety_settings: self.safety_settings(),
        };

        debug!("Requesting translation for {} chars", text.len());

        let response = self
            .client
            .post(self.request_url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                PipelineError::TranslationUnavailable(format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(PipelineError::TranslationUnavailable(format!(
                "model endpoint returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            PipelineError::TranslationUnavailable(format!("unparseable response: {}", e))
        })?;

        if parsed.candidates.is_empty() {
            return Err(PipelineError::TranslationUnavailable(
                "no candidates returned".to_string(),
            ));
        }

        let mut translated = String::new();
        for candidate in parsed.candidates {
            // Truncated output would silently drop text, so it is rejected
            // outright; chunking keeps inputs under the output budget.
            if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
                return Err(PipelineError::TranslationUnavailable(
                    "model output truncated at max_output_tokens".to_string(),
                ));
            }
            if let Some(content) = candidate.content {
                for part in content.parts {
                    translated.push_str(&part.text);
                }
            }
        }

        Ok(translated)
    }
}

/// One translatable piece of a larger document, together with the
/// separator that preceded it in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    /// Emitted before this chunk's output on reassembly. `"\n"` when the
    /// chunk started at a line boundary, empty for the first chunk and
    /// for the continuation pieces of a hard-split line.
    pub separator: &'static str,
}

impl TextChunk {
    fn new(text: impl Into<String>, separator: &'static str) -> Self {
        Self {
            text: text.into(),
            separator,
        }
    }
}

/// Split `text` into chunks of at most `max_chars` characters, breaking at
/// line boundaries. A single line longer than the budget is hard-split on
/// character boundaries. Each chunk records the separator it was cut at,
/// so concatenating `separator + text` over the chunks in order rebuilds
/// the input exactly.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<TextChunk> {
    if text.chars().count() <= max_chars {
        return vec![TextChunk::new(text, "")];
    }

    let mut chunks: Vec<TextChunk> = Vec::new();
    let mut current: Option<TextChunk> = None;

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if line_len > max_chars {
            if let Some(chunk) = current.take() {
                chunks.push(chunk);
            }
            let sep = if chunks.is_empty() { "" } else { "\n" };
            let pieces: Vec<char> = line.chars().collect();
            for (i, piece) in pieces.chunks(max_chars).enumerate() {
                let text: String = piece.iter().collect();
                chunks.push(TextChunk::new(text, if i == 0 { sep } else { "" }));
            }
            continue;
        }

        match current.as_mut() {
            None => {
                let sep = if chunks.is_empty() { "" } else { "\n" };
                current = Some(TextChunk::new(line, sep));
            }
            Some(chunk) => {
                if chunk.text.chars().count() + 1 + line_len <= max_chars {
                    chunk.text.push('\n');
                    chunk.text.push_str(line);
                } else {
                    if let Some(full) = current.take() {
                        chunks.push(full);
                    }
                    current = Some(TextChunk::new(line, "\n"));
                }
            }
        }
    }

    if let Some(chunk) = current {
        chunks.push(chunk);
    }

    chunks
}

/// Chunking and retry wrapper over a [`TranslationModel`].
pub struct Translator {
    model: Arc<dyn TranslationModel>,
    max_chunk_chars: usize,
    retry_attempts: u32,
    retry_base_delay: Duration,
}

impl Translator {
    pub fn new(
        model: Arc<dyn TranslationModel>,
        max_chunk_chars: usize,
        retry_attempts: u32,
        retry_base_delay: Duration,
    ) -> Self {
        Self {
            model,
            max_chunk_chars,
            retry_attempts,
            retry_base_delay,
        }
    }

    pub fn from_config(model: Arc<dyn TranslationModel>, config: &TranslatorConfig) -> Self {
        Self::new(
            model,
            config.max_chunk_chars,
            config.retry_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    /// Translate `text`, chunking oversized input and reassembling the
    /// per-chunk outputs in order. Each output is glued on with the
    /// separator its chunk was cut at, so hard-split lines come back
    /// together without a fabricated line break.
    pub async fn translate(&self, text: &str) -> Result<String> {
        let chunks = chunk_text(text, self.max_chunk_chars);
        debug!("Translating {} chunk(s)", chunks.len());

        let mut output = String::new();
        for chunk in &chunks {
            let translated = self.translate_with_retry(&chunk.text).await?;
            output.push_str(chunk.separator);
            output.push_str(&translated);
        }

        Ok(output)
    }

    async fn translate_with_retry(&self, chunk: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.model.translate_chunk(chunk).await {
                Ok(translated) => return Ok(translated),
                Err(e) if attempt < self.retry_attempts => {
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt);
                    warn!(
                        "Translation attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoModel;

    #[async_trait]
    impl TranslationModel for EchoModel {
        async fn translate_chunk(&self, text: &str) -> Result<String> {
            Ok(format!("fr:{}", text))
        }
    }

    struct FlakyModel {
        failures: AtomicU32,
    }

    #[async_trait]
    impl TranslationModel for FlakyModel {
        async fn translate_chunk(&self, text: &str) -> Result<String> {
            if self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > 0 { Some(n - 1) } else { None }
            })
            .is_ok()
            {
                return Err(PipelineError::TranslationUnavailable(
                    "quota exceeded".to_string(),
                ));
            }
            Ok(text.to_string())
        }
    }

    struct IdentityModel;

    #[async_trait]
    impl TranslationModel for IdentityModel {
        async fn translate_chunk(&self, text: &str) -> Result<String> {
            Ok(text.to_string())
        }
    }

    fn reassemble(chunks: &[TextChunk]) -> String {
        chunks
            .iter()
            .map(|c| format!("{}{}", c.separator, c.text))
            .collect()
    }

    #[test]
    fn test_chunk_text_small_input_is_single_chunk() {
        let chunks = chunk_text("hello\nworld", 100);
        assert_eq!(chunks, vec![TextChunk::new("hello\nworld", "")]);
    }

    #[test]
    fn test_chunk_text_splits_at_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = chunk_text(text, 9);
        assert_eq!(
            chunks,
            vec![
                TextChunk::new("aaaa\nbbbb", ""),
                TextChunk::new("cccc", "\n"),
            ]
        );
    }

    #[test]
    fn test_chunk_text_hard_splits_oversized_line() {
        let text = "abcdefghij";
        let chunks = chunk_text(text, 4);
        assert_eq!(
            chunks,
            vec![
                TextChunk::new("abcd", ""),
                TextChunk::new("efgh", ""),
                TextChunk::new("ij", ""),
            ]
        );
    }

    #[test]
    fn test_chunk_text_preserves_all_content() {
        let text = "one\ntwo\nthree\nfour\nfive";
        let chunks = chunk_text(text, 8);
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_chunk_text_preserves_hard_split_boundaries() {
        let text = "ab\ncdefghij\nkl";
        let chunks = chunk_text(text, 4);
        assert_eq!(reassemble(&chunks), text);
    }

    #[tokio::test]
    async fn test_translator_reassembles_chunks_in_order() {
        let translator = Translator::new(Arc::new(EchoModel), 9, 0, Duration::ZERO);
        let out = translator.translate("aaaa\nbbbb\ncccc").await.unwrap();
        assert_eq!(out, "fr:aaaa\nbbbb\nfr:cccc");
    }

    #[tokio::test]
    async fn test_oversized_line_round_trips_without_inserted_breaks() {
        let translator = Translator::new(Arc::new(IdentityModel), 4, 0, Duration::ZERO);
        let out = translator.translate("abcdefgh").await.unwrap();
        assert_eq!(out, "abcdefgh");
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let model = Arc::new(FlakyModel {
            failures: AtomicU32::new(2),
        });
        let translator = Translator::new(model, 1000, 3, Duration::ZERO);
        let out = translator.translate("stable text").await.unwrap();
        assert_eq!(out, "stable text");
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let model = Arc::new(FlakyModel {
            failures: AtomicU32::new(10),
        });
        let translator = Translator::new(model, 1000, 2, Duration::ZERO);
        let err = translator.translate("text").await.unwrap_err();
        assert!(matches!(err, PipelineError::TranslationUnavailable(_)));
    }
}
