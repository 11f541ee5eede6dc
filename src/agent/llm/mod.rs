//! Ollama client backing the model-driven decision-maker.
//!
//! The model is asked for one `Thought:`/`Action:` pair per step through the
//! `/api/generate` endpoint. Everything else (parsing, repair, execution) is
//! deterministic and does not touch the model.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from the LLM subsystem.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("Ollama is not available at {url}")]
    #[diagnostic(
        code(brick::llm::unavailable),
        help("Start Ollama with `ollama serve`, or run with --scripted to use the canned walkthrough.")
    )]
    Unavailable { url: String },

    #[error("Ollama request failed: {message}")]
    #[diagnostic(
        code(brick::llm::request_failed),
        help("Check that Ollama is running and the model is pulled.")
    )]
    RequestFailed { message: String },

    #[error("Failed to parse Ollama response: {message}")]
    #[diagnostic(
        code(brick::llm::parse_error),
        help("The model returned an unexpected response format.")
    )]
    ParseError { message: String },

    #[error("Ollama request timed out after {timeout_secs}s")]
    #[diagnostic(
        code(brick::llm::timeout),
        help("Increase llm.timeout_secs or use a smaller model.")
    )]
    Timeout { timeout_secs: u64 },

    #[error("model \"{model}\" is not pulled")]
    #[diagnostic(
        code(brick::llm::model_missing),
        help("Run: ollama pull {model}")
    )]
    ModelMissing { model: String },
}

/// Anything that turns a prompt into a completion.
pub trait Predictor {
    fn predict(&self, prompt: &str) -> Result<String, LlmError>;
}

impl<F> Predictor for F
where
    F: Fn(&str) -> Result<String, LlmError>,
{
    fn predict(&self, prompt: &str) -> Result<String, LlmError> {
        self(prompt)
    }
}

/// Configuration for the Ollama client.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Model name to use.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            timeout_secs: 120,
        }
    }
}

/// Client for the Ollama REST API.
pub struct OllamaClient {
    config: OllamaConfig,
    available: bool,
    /// Models available locally after `probe()`.
    available_models: Vec<String>,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            config,
            available: false,
            available_models: Vec::new(),
        }
    }

    /// Check availability via `/api/tags` and record the local model list.
    pub fn probe(&mut self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(5))
            .build();

        match agent.get(&url).call() {
            Ok(resp) if resp.status() == 200 => {
                self.available = true;
                self.available_models = resp
                    .into_string()
                    .ok()
                    .and_then(|body| serde_json::from_str::<serde_json::Value>(&body).ok())
                    .and_then(|json| {
                        json["models"].as_array().map(|arr| {
                            arr.iter()
                                .filter_map(|m| m["name"].as_str().map(str::to_string))
                                .collect()
                        })
                    })
                    .unwrap_or_default();
                tracing::debug!(
                    url = %self.config.base_url,
                    models = self.available_models.len(),
                    "ollama available"
                );
                true
            }
            Ok(_) | Err(_) => {
                self.available = false;
                self.available_models.clear();
                false
            }
        }
    }

    /// Whether the configured model is locally available (tag suffix ignored).
    pub fn has_model(&self) -> bool {
        let target = &self.config.model;
        self.available_models
            .iter()
            .any(|m| m == target || m.split(':').next() == Some(target))
    }

    /// Fail unless the server answered the last probe and has the model.
    pub fn ensure_ready(&self) -> Result<(), LlmError> {
        if !self.available {
            return Err(LlmError::Unavailable {
                url: self.config.base_url.clone(),
            });
        }
        if !self.has_model() {
            return Err(LlmError::ModelMissing {
                model: self.config.model.clone(),
            });
        }
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Generate a completion from a prompt.
    pub fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        if !self.available {
            return Err(LlmError::Unavailable {
                url: self.config.base_url.clone(),
            });
        }

        let url = format!("{}/api/generate", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        let mut body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });
        if let Some(sys) = system {
            body["system"] = serde_json::Value::String(sys.to_string());
        }

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(|e| self.request_error(e))?;

        let resp_str = resp.into_string().map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;

        parse_generate_response(&resp_str)
    }

    fn request_error(&self, e: ureq::Error) -> LlmError {
        let message = e.to_string();
        if message.to_ascii_lowercase().contains("timed out") {
            LlmError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            LlmError::RequestFailed { message }
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

impl Predictor for OllamaClient {
    fn predict(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate(prompt, None)
    }
}

/// Pull `response` out of a non-streaming `/api/generate` body.
fn parse_generate_response(body: &str) -> Result<String, LlmError> {
    let json: serde_json::Value = serde_json::from_str(body).map_err(|e| LlmError::ParseError {
        message: e.to_string(),
    })?;
    json["response"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::ParseError {
            message: "missing 'response' field".into(),
        })
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("available", &self.available)
            .finish()
    }
}
