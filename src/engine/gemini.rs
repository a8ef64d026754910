use crate::engine::GenerationBackend;
use anyhow::{Result, anyhow, bail};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize, Debug)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize, Debug)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize, Debug)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

/// Google Gemini `generateContent` over blocking HTTPS.
#[derive(Clone)]
pub struct GeminiBackend {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
}

impl fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl Default for GeminiBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl GeminiBackend {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            agent: build_agent(DEFAULT_TIMEOUT),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

impl GenerationBackend for GeminiBackend {
    fn generate(&self, api_key: &str, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!("Sending {} prompt bytes to {}..!", prompt.len(), self.model);

        let response = match self
            .agent
            .post(&self.url())
            .set("x-goog-api-key", api_key.trim())
            .send_json(&body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                bail!("Gemini returned HTTP {}: {}", code, detail.trim());
            }
            Err(why) => return Err(anyhow!("Gemini request failed: {}", why)),
        };

        let parsed: GenerateResponse = response.into_json()?;
        extract_text(parsed)
    }
}

fn extract_text(response: GenerateResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        bail!("Gemini returned no candidates..!");
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        bail!(
            "Gemini returned an empty candidate (finish reason: {})..!",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );
    }

    Ok(text)
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(json: &str) -> Result<String> {
        extract_text(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn request_body_shape() {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: "hello" }],
            }],
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"contents": [{"parts": [{"text": "hello"}]}]})
        );
    }

    #[test]
    fn joins_candidate_parts() {
        let text = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"64, 70"},{"text":", 80"}],"role":"model"},"finishReason":"STOP"}]}"#,
        )
        .unwrap();

        assert_eq!(text, "64, 70, 80");
    }

    #[test]
    fn empty_replies_are_errors() {
        assert!(parse(r#"{"candidates":[]}"#).is_err());
        assert!(parse(r#"{}"#).is_err());

        let blocked = parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap_err();
        assert!(blocked.to_string().contains("SAFETY"));
    }

    #[test]
    fn url_uses_model_and_endpoint() {
        let backend = GeminiBackend::new("gemini-test").with_endpoint("http://localhost:9000/v1/");
        assert_eq!(
            backend.url(),
            "http://localhost:9000/v1/models/gemini-test:generateContent"
        );
        assert_eq!(backend.model(), "gemini-test");
    }
}
