use std::time::Duration;

use msa_core::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::{Host, Url};

const HEALTH_TIMEOUT: Duration = Duration::from_millis(800);

/// JSON-over-HTTP access to a local Ollama server.
///
/// The base URL must point at `127.0.0.1`; model traffic never leaves the machine
/// through this client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let rejected = || {
            AppError::new(
                "AI_REMOTE_NOT_ALLOWED",
                "Ollama base URL must be http://127.0.0.1[:port]",
            )
            .with_details(format!("base_url={base_url}"))
        };

        let parsed = Url::parse(base_url.trim()).map_err(|_| rejected())?;
        let local = parsed.scheme() == "http"
            && parsed.host() == Some(Host::Ipv4(std::net::Ipv4Addr::LOCALHOST))
            && parsed.username().is_empty()
            && parsed.password().is_none()
            && parsed.port() != Some(0)
            && parsed.path() == "/"
            && parsed.query().is_none()
            && parsed.fragment().is_none();
        if !local {
            return Err(rejected());
        }

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(60),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `path` and decode the JSON reply. Every failure carries `code`.
    pub fn post_json<B, R>(&self, path: &str, body: &B, code: &'static str) -> Result<R, AppError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let payload = serde_json::to_value(body).map_err(|e| {
            AppError::new(code, "Failed to encode Ollama request").with_details(e.to_string())
        })?;

        match ureq::post(&url).timeout(self.timeout).send_json(payload) {
            Ok(resp) => resp.into_json::<R>().map_err(|e| {
                AppError::new(code, "Failed to decode Ollama response")
                    .with_details(format!("path={path}; err={e}"))
            }),
            Err(ureq::Error::Status(status, _)) => Err(AppError::new(code, "Ollama request failed")
                .with_details(format!("path={path}; status={status}"))
                .with_retryable(status >= 500)),
            Err(e) => Err(AppError::new(code, "Failed to reach Ollama on 127.0.0.1")
                .with_details(e.to_string())
                .with_retryable(true)),
        }
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        match ureq::get(&url).timeout(HEALTH_TIMEOUT).call() {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, _)) => Err(AppError::new(
                "AI_OLLAMA_UNHEALTHY",
                "Ollama health check failed",
            )
            .with_details(format!("status={status}"))),
            Err(e) => Err(AppError::new("AI_OLLAMA_UNREACHABLE", "Failed to reach Ollama on 127.0.0.1")
                .with_details(e.to_string())
                .with_retryable(true)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_only_loopback_http() {
        for ok in ["http://127.0.0.1:11434", "http://127.0.0.1", "http://127.0.0.1:11434/"] {
            assert!(OllamaClient::new(ok).is_ok(), "{ok}");
        }
        for bad in [
            "http://localhost:11434",
            "https://127.0.0.1:11434",
            "http://127.0.0.1.evil.com:11434",
            "http://127.0.0.1@evil.com:11434",
            "http://127.0.0.1:0",
            "http://127.0.0.1:99999",
            "http://127.0.0.1:11434/api",
            "not a url",
        ] {
            let err = OllamaClient::new(bad).expect_err(bad);
            assert_eq!(err.code, "AI_REMOTE_NOT_ALLOWED");
        }
    }

    #[test]
    fn base_url_has_no_trailing_slash() {
        let client = OllamaClient::new("http://127.0.0.1:11434/").expect("client");
        assert_eq!(client.base_url(), "http://127.0.0.1:11434");
    }
}
