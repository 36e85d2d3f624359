//! Ollama chat API client for vision models.
//!
//! Sends one user message carrying the instruction prompt and a base64 PNG to
//! `POST {host}/api/chat` with streaming disabled, and returns the text of the
//! assistant message.
//!
//! ## Example
//!
//! ```no_run
//! use invoice_extract::{OllamaClient, VisionChat};
//!
//! # fn example() -> anyhow::Result<()> {
//! let client = OllamaClient::new("http://localhost:11434", 600)?;
//! let page_png: &[u8] = &[]; // Your PNG data
//! let answer = client.chat_with_image("qwen2.5vl:7b", "Describe this", page_png)?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use base64::Engine;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// A chat service that accepts an image alongside the prompt.
///
/// `Send` so an implementation can be moved onto the extraction worker.
pub trait VisionChat: Send {
    /// Send `prompt` and `png` to `model` and return the answer text.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-success status codes or an
    /// unexpected response body.
    fn chat_with_image(&self, model: &str, prompt: &str, png: &[u8]) -> Result<String>;
}

/// Ollama `/api/chat` request.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
    images: Vec<String>,
}

/// Ollama `/api/chat` response (non-streaming).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// HTTP client for a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a client for `host` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(host: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: host.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

impl VisionChat for OllamaClient {
    fn chat_with_image(&self, model: &str, prompt: &str, png: &[u8]) -> Result<String> {
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(png);

        let request = ChatRequest {
            model,
            messages: vec![Message {
                role: "user",
                content: prompt,
                images: vec![image_b64],
            }],
            stream: false,
        };

        let response = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .with_context(|| format!("Failed to send request to Ollama at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            anyhow::bail!("Ollama API error ({status}): {error_text}");
        }

        let chat_response: ChatResponse = response
            .json()
            .context("Failed to parse Ollama response")?;

        Ok(chat_response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/", 5).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.chat_url(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "qwen2.5vl:3b",
            messages: vec![Message {
                role: "user",
                content: "prompt",
                images: vec!["aGVsbG8=".to_string()],
            }],
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "qwen2.5vl:3b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["images"][0], "aGVsbG8=");
    }

    #[test]
    fn test_response_shape() {
        let body = r#"{"model":"qwen2.5vl:3b","message":{"role":"assistant","content":"{}"},"done":true}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.message.content, "{}");
    }

    #[test]
    fn test_unreachable_server_is_error() {
        // Port 9 (discard) is closed on test machines; the call must fail, not hang.
        let client = OllamaClient::new("http://127.0.0.1:9", 2).unwrap();
        assert!(client.chat_with_image("m", "p", b"png").is_err());
    }
}
