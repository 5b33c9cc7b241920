//! Streaming text generation clients.
//!
//! Two wire formats are supported:
//! - **ollama**: `POST {base}/api/chat`, newline-delimited JSON frames
//! - **openai**: `POST {base}/chat/completions`, server-sent `data:` frames
//!
//! A stream that ends without its terminal frame is reported as
//! [`GenerationError::Incomplete`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::{GenerationError, GenerationResult};

pub const DEFAULT_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Lazily produced text chunks; concatenated they form the full response.
pub type ChunkStream = BoxStream<'static, GenerationResult<String>>;

/// A streaming text-generation collaborator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Start generating a response to `prompt`.
    async fn generate(&self, prompt: &str) -> GenerationResult<ChunkStream>;

    /// Model name, for logging.
    fn model(&self) -> &str;
}

/// Wire protocol spoken by the generator endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Ollama,
    OpenAi,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Backend::Ollama),
            "openai" => Ok(Backend::OpenAi),
            other => Err(format!("unknown generator backend '{other}' (expected ollama or openai)")),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Backend::Ollama => "ollama",
            Backend::OpenAi => "openai",
        })
    }
}

/// Connection settings for the generator endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub backend: Backend,
    pub base_url: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Connection timeout; streaming responses are not bounded.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Build the client for `config.backend`.
pub fn build_generator(config: GeneratorConfig) -> GenerationResult<Arc<dyn TextGenerator>> {
    Ok(Arc::new(HttpGenerator::new(config)?))
}

/// HTTP client for both supported wire formats.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl HttpGenerator {
    pub fn new(config: GeneratorConfig) -> GenerationResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| GenerationError::Client(format!("invalid api key header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.backend {
            Backend::Ollama => format!("{base}/api/chat"),
            Backend::OpenAi => format!("{base}/chat/completions"),
        }
    }
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> GenerationResult<ChunkStream> {
        let url = self.endpoint();
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": true,
        });

        debug!(url = %url, model = %self.config.model, backend = %self.config.backend, "generation_request");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(|e| e.to_string()))
            .boxed();
        let parse: LineParser = match self.config.backend {
            Backend::Ollama => parse_ollama_line,
            Backend::OpenAi => parse_sse_line,
        };
        Ok(frame_stream(bytes, parse))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// =============================================================================
// Framing
// =============================================================================

/// One decoded line of the response body.
#[derive(Debug, Default, PartialEq)]
struct Frame {
    text: String,
    done: bool,
}

type LineParser = fn(&str) -> GenerationResult<Frame>;

type ByteStream = BoxStream<'static, Result<Vec<u8>, String>>;

struct FrameReader {
    body: ByteStream,
    buffer: Vec<u8>,
    parse: LineParser,
    eof: bool,
    done: bool,
}

impl FrameReader {
    async fn next_chunk(&mut self) -> Option<GenerationResult<String>> {
        loop {
            if self.done {
                return None;
            }

            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
                let line = match std::str::from_utf8(&raw) {
                    Ok(line) => line.trim(),
                    Err(e) => return self.fail(GenerationError::Malformed(e.to_string())),
                };
                if line.is_empty() {
                    continue;
                }
                match (self.parse)(line) {
                    Ok(frame) => {
                        self.done = frame.done;
                        if !frame.text.is_empty() {
                            return Some(Ok(frame.text));
                        }
                    }
                    Err(e) => return self.fail(e),
                }
                continue;
            }

            if self.eof {
                return self.fail(GenerationError::Incomplete);
            }

            match self.body.next().await {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => return self.fail(GenerationError::Transport(e)),
                None => {
                    self.eof = true;
                    if !self.buffer.is_empty() {
                        self.buffer.push(b'\n');
                    }
                }
            }
        }
    }

    fn fail(&mut self, error: GenerationError) -> Option<GenerationResult<String>> {
        self.done = true;
        Some(Err(error))
    }
}

fn frame_stream(body: ByteStream, parse: LineParser) -> ChunkStream {
    let reader = FrameReader {
        body,
        buffer: Vec::new(),
        parse,
        eof: false,
        done: false,
    };
    stream::unfold(reader, |mut reader| async move {
        reader.next_chunk().await.map(|item| (item, reader))
    })
    .boxed()
}

#[derive(Deserialize)]
struct OllamaFrame {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

fn parse_ollama_line(line: &str) -> GenerationResult<Frame> {
    let frame: OllamaFrame =
        serde_json::from_str(line).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    if let Some(error) = frame.error {
        return Err(GenerationError::Upstream(error));
    }
    Ok(Frame {
        text: frame.message.map(|m| m.content).unwrap_or_default(),
        done: frame.done,
    })
}

#[derive(Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    delta: CompletionDelta,
}

#[derive(Deserialize, Default)]
struct CompletionDelta {
    #[serde(default)]
    content: Option<String>,
}

fn parse_sse_line(line: &str) -> GenerationResult<Frame> {
    // Comments, event names and retry hints carry no text.
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(Frame::default());
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(Frame {
            text: String::new(),
            done: true,
        });
    }
    let chunk: CompletionChunk =
        serde_json::from_str(data).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .unwrap_or_default();
    Ok(Frame { text, done: false })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(parts: &[&str]) -> ByteStream {
        let parts: Vec<Result<Vec<u8>, String>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(parts).boxed()
    }

    async fn collect(stream: ChunkStream) -> Vec<GenerationResult<String>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn ollama_frames_split_across_reads() {
        let stream = frame_stream(
            body(&[
                "{\"message\":{\"content\":\"Poly\"},\"done\":false}\n{\"mess",
                "age\":{\"content\":\"styrene\"},\"done\":false}\n",
                "{\"message\":{\"content\":\"\"},\"done\":true}\n",
            ]),
            parse_ollama_line,
        );
        let chunks = collect(stream).await;
        assert_eq!(chunks, vec![Ok("Poly".to_string()), Ok("styrene".to_string())]);
    }

    #[tokio::test]
    async fn final_frame_without_newline_is_accepted() {
        let stream = frame_stream(
            body(&["{\"message\":{\"content\":\"ok\"},\"done\":true}"]),
            parse_ollama_line,
        );
        assert_eq!(collect(stream).await, vec![Ok("ok".to_string())]);
    }

    #[tokio::test]
    async fn missing_terminal_frame_is_incomplete() {
        let stream = frame_stream(
            body(&["{\"message\":{\"content\":\"partial\"},\"done\":false}\n"]),
            parse_ollama_line,
        );
        assert_eq!(
            collect(stream).await,
            vec![Ok("partial".to_string()), Err(GenerationError::Incomplete)]
        );
    }

    #[tokio::test]
    async fn upstream_error_frame_stops_stream() {
        let stream = frame_stream(
            body(&["{\"error\":\"model not found\"}\n{\"done\":true}\n"]),
            parse_ollama_line,
        );
        assert_eq!(
            collect(stream).await,
            vec![Err(GenerationError::Upstream("model not found".to_string()))]
        );
    }

    #[tokio::test]
    async fn sse_frames_until_done() {
        let stream = frame_stream(
            body(&[
                ": keep-alive\n",
                "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"High \"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"density.\"}}]}\n\n",
                "data: [DONE]\n\n",
            ]),
            parse_sse_line,
        );
        assert_eq!(
            collect(stream).await,
            vec![Ok("High ".to_string()), Ok("density.".to_string())]
        );
    }

    #[tokio::test]
    async fn transport_error_is_reported() {
        let parts: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"{\"message\":{\"content\":\"a\"}}\n".to_vec()),
            Err("connection reset".to_string()),
        ];
        let stream = frame_stream(stream::iter(parts).boxed(), parse_ollama_line);
        assert_eq!(
            collect(stream).await,
            vec![
                Ok("a".to_string()),
                Err(GenerationError::Transport("connection reset".to_string()))
            ]
        );
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            parse_ollama_line("not json"),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn backend_parses_from_config_strings() {
        assert_eq!("OpenAI".parse::<Backend>().unwrap(), Backend::OpenAi);
        assert_eq!("ollama".parse::<Backend>().unwrap(), Backend::Ollama);
        assert!("llamacpp".parse::<Backend>().is_err());
    }

    #[test]
    fn endpoints_follow_backend() {
        let ollama = HttpGenerator::new(GeneratorConfig::default()).unwrap();
        assert_eq!(ollama.endpoint(), "http://localhost:11434/api/chat");

        let openai = HttpGenerator::new(GeneratorConfig {
            backend: Backend::OpenAi,
            base_url: "https://api.example.com/v1/".to_string(),
            api_key: Some("secret".to_string()),
            ..GeneratorConfig::default()
        })
        .unwrap();
        assert_eq!(openai.endpoint(), "https://api.example.com/v1/chat/completions");
    }
}
