//! Local Ollama instance as the generation backend.

use std::io::{BufRead, BufReader};
use std::sync::mpsc::Sender;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::generate::LlmGenerate;
use super::RagError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "medgemma";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Ollama HTTP client bound to one model.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// One NDJSON line of a streamed `/api/generate` response.
#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

impl OllamaClient {
    /// Health data never leaves the machine: only loopback hosts are accepted.
    pub fn new(base_url: &str, timeout_secs: u64, model: &str) -> Result<Self, RagError> {
        validate_base_url(base_url)?;
        if model.trim().is_empty() {
            return Err(RagError::NoModel);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RagError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.trim().to_string(),
            client,
            timeout_secs,
        })
    }

    /// `localhost:11434`, default model, 5-minute timeout.
    pub fn default_local() -> Result<Self, RagError> {
        Self::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_MODEL)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn list_models(&self) -> Result<Vec<String>, RagError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        let response = check_status(response)?;

        let parsed: TagsResponse = response
            .json()
            .map_err(|e| RagError::ResponseParsing(e.to_string()))?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    /// Prefix match, so `medgemma` accepts `medgemma:4b`.
    pub fn is_model_available(&self) -> Result<bool, RagError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(&self.model)))
    }

    fn post_generate(
        &self,
        system: &str,
        prompt: &str,
        stream: bool,
    ) -> Result<reqwest::blocking::Response, RagError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream,
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        check_status(response)
    }

    fn map_send_error(&self, e: reqwest::Error) -> RagError {
        if e.is_connect() {
            RagError::OllamaConnection(self.base_url.clone())
        } else if e.is_timeout() {
            RagError::Timeout(self.timeout_secs)
        } else {
            RagError::HttpClient(e.to_string())
        }
    }
}

impl LlmGenerate for OllamaClient {
    fn generate(&self, system: &str, prompt: &str) -> Result<String, RagError> {
        let response = self.post_generate(system, prompt, false)?;
        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| RagError::ResponseParsing(e.to_string()))?;
        tracing::debug!(model = %self.model, chars = parsed.response.len(), "Generation complete");
        Ok(parsed.response)
    }

    fn generate_streaming(
        &self,
        system: &str,
        prompt: &str,
        token_tx: Sender<String>,
    ) -> Result<String, RagError> {
        let response = self.post_generate(system, prompt, true)?;
        let text = read_stream(BufReader::new(response), &token_tx)?;
        tracing::debug!(model = %self.model, chars = text.len(), "Streamed generation complete");
        Ok(text)
    }
}

/// Forward each NDJSON chunk to `token_tx` until `done`. A dropped receiver
/// stops the read early and yields `Cancelled`.
fn read_stream<R: BufRead>(reader: R, token_tx: &Sender<String>) -> Result<String, RagError> {
    let mut full = String::new();
    for line in reader.lines() {
        let line = line.map_err(|e| RagError::StreamingError(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let chunk: GenerateChunk =
            serde_json::from_str(&line).map_err(|e| RagError::ResponseParsing(e.to_string()))?;
        if let Some(error) = chunk.error {
            return Err(RagError::StreamingError(error));
        }
        if !chunk.response.is_empty() {
            full.push_str(&chunk.response);
            if token_tx.send(chunk.response).is_err() {
                return Err(RagError::Cancelled);
            }
        }
        if chunk.done {
            return Ok(full);
        }
    }
    Err(RagError::StreamingError("stream ended before completion".into()))
}

fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, RagError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(RagError::OllamaError {
        status: status.as_u16(),
        body,
    })
}

/// Accepts `localhost`, `127.0.0.1` and `[::1]` over http or https.
pub fn validate_base_url(url: &str) -> Result<(), RagError> {
    let invalid = || RagError::HttpClient(format!("Ollama endpoint must be local: {url}"));
    let after_scheme = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(invalid)?;

    let host = if let Some(rest) = after_scheme.strip_prefix('[') {
        rest.split(']').next().unwrap_or("")
    } else {
        after_scheme.split([':', '/']).next().unwrap_or("")
    };

    match host {
        "localhost" | "127.0.0.1" | "::1" => Ok(()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc;

    #[test]
    fn constructor_normalizes() {
        let client = OllamaClient::new("http://localhost:11434/", 120, " medgemma:4b ").unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "medgemma:4b");
        assert_eq!(client.timeout_secs, 120);
    }

    #[test]
    fn default_local_uses_standard_port() {
        let client = OllamaClient::default_local().unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn empty_model_is_rejected() {
        assert!(matches!(
            OllamaClient::new(DEFAULT_BASE_URL, 10, "  "),
            Err(RagError::NoModel)
        ));
    }

    #[test]
    fn only_loopback_endpoints() {
        for ok in [
            "http://localhost:11434",
            "http://localhost",
            "http://127.0.0.1:11434/",
            "http://[::1]:11434",
            "https://localhost:8443",
        ] {
            assert!(validate_base_url(ok).is_ok(), "{ok}");
        }
        for bad in [
            "",
            "localhost:11434",
            "http://192.168.1.5:11434",
            "https://api.example.com",
            "http://localhost.evil.com",
        ] {
            assert!(validate_base_url(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn stream_concatenates_until_done() {
        let body = "{\"response\":\"Cramps \",\"done\":false}\n\
                    \n\
                    {\"response\":\"peaked.\",\"done\":false}\n\
                    {\"response\":\"\",\"done\":true}\n\
                    {\"response\":\"ignored\",\"done\":false}\n";
        let (tx, rx) = mpsc::channel();
        let text = read_stream(Cursor::new(body), &tx).unwrap();
        drop(tx);
        assert_eq!(text, "Cramps peaked.");
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec!["Cramps ", "peaked."]);
    }

    #[test]
    fn stream_error_line_is_surfaced() {
        let body = "{\"response\":\"a\",\"done\":false}\n{\"error\":\"model crashed\"}\n";
        let (tx, _rx) = mpsc::channel();
        let err = read_stream(Cursor::new(body), &tx).unwrap_err();
        assert!(matches!(err, RagError::StreamingError(ref m) if m == "model crashed"));
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let (tx, _rx) = mpsc::channel();
        let err = read_stream(Cursor::new("{\"response\":\"a\",\"done\":false}\n"), &tx).unwrap_err();
        assert!(matches!(err, RagError::StreamingError(_)));
    }

    #[test]
    fn dropped_receiver_cancels() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let err = read_stream(Cursor::new("{\"response\":\"a\",\"done\":false}\n"), &tx).unwrap_err();
        assert!(matches!(err, RagError::Cancelled));
    }
}
