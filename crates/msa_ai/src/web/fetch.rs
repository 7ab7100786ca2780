use std::fmt;
use std::time::Duration;

use msa_core::error::AppError;

/// A fully described outbound HTTP request, shown verbatim at the approval gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: &'static str,
    pub url: String,
}

impl OutboundRequest {
    pub fn get(url: url::Url) -> Self {
        Self {
            method: "GET",
            url: url.into(),
        }
    }

    pub fn command_text(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

impl fmt::Display for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait HttpFetcher: Send + Sync {
    /// Transport failures are errors; any HTTP status is a response.
    fn fetch(&self, req: &OutboundRequest) -> Result<FetchResponse, AppError>;
}

#[derive(Debug, Clone)]
pub struct UreqFetcher {
    timeout: Duration,
}

impl UreqFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl HttpFetcher for UreqFetcher {
    fn fetch(&self, req: &OutboundRequest) -> Result<FetchResponse, AppError> {
        let resp = ureq::request(req.method, &req.url)
            .timeout(self.timeout)
            .set("Accept", "application/json")
            .call();

        let r = match resp {
            Ok(r) => r,
            Err(ureq::Error::Status(_, r)) => r,
            Err(e) => {
                return Err(AppError::new("WEB_FETCH_FAILED", "Failed to reach web provider")
                    .with_details(format!("url={}; err={}", req.url, e))
                    .with_retryable(true))
            }
        };
        let status = r.status();
        let body = r.into_string().map_err(|e| {
            AppError::new("WEB_FETCH_FAILED", "Failed to read web provider response")
                .with_details(format!("url={}; err={}", req.url, e))
        })?;
        Ok(FetchResponse { status, body })
    }
}
