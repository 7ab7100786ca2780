use msa_core::config::WebConfig;
use msa_core::error::AppError;
use serde_json::Value;
use url::Url;

use super::fetch::OutboundRequest;

/// The three search providers, in the order they are always consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// SearX meta-search; queried with the full question.
    MetaSearch,
    /// DuckDuckGo instant-answer API; queried with keywords.
    KeywordApi,
    /// Wikipedia page-summary API; queried with keywords.
    Encyclopedia,
}

impl Provider {
    pub const ORDER: [Provider; 3] = [Provider::MetaSearch, Provider::KeywordApi, Provider::Encyclopedia];

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::MetaSearch => "SearX",
            Provider::KeywordApi => "DuckDuckGo",
            Provider::Encyclopedia => "Wikipedia",
        }
    }

    pub fn build_request(
        self,
        endpoints: &WebConfig,
        question: &str,
        keywords: &[String],
    ) -> Result<OutboundRequest, AppError> {
        let joined = keywords.join(" ");
        let url = match self {
            Provider::MetaSearch => Url::parse_with_params(
                &endpoints.searx_url,
                &[("q", question.trim()), ("format", "json")],
            )
            .map_err(|e| invalid_endpoint(self, &endpoints.searx_url, e))?,
            Provider::KeywordApi => Url::parse_with_params(
                &endpoints.duckduckgo_url,
                &[
                    ("q", joined.as_str()),
                    ("format", "json"),
                    ("no_redirect", "1"),
                    ("no_html", "1"),
                ],
            )
            .map_err(|e| invalid_endpoint(self, &endpoints.duckduckgo_url, e))?,
            Provider::Encyclopedia => {
                let mut url = Url::parse(&endpoints.wikipedia_url)
                    .map_err(|e| invalid_endpoint(self, &endpoints.wikipedia_url, e))?;
                url.path_segments_mut()
                    .map_err(|_| {
                        AppError::new("WEB_ENDPOINT_INVALID", "Wikipedia endpoint cannot take a path")
                            .with_details(format!("url={}", endpoints.wikipedia_url))
                    })?
                    .pop_if_empty()
                    .push(&joined);
                url
            }
        };
        Ok(OutboundRequest::get(url))
    }

    /// Pull the provider's answer text out of a decoded response, if present and non-blank.
    pub fn extract(self, body: &Value) -> Option<String> {
        let text = match self {
            Provider::MetaSearch => {
                let first = body.get("results")?.as_array()?.first()?;
                ["content", "snippet", "description"]
                    .iter()
                    .find_map(|field| non_blank(first.get(*field)))
            }
            Provider::KeywordApi => non_blank(body.get("AbstractText")).or_else(|| {
                let topic = body.get("RelatedTopics")?.as_array()?.first()?;
                non_blank(topic.get("Text"))
            }),
            Provider::Encyclopedia => non_blank(body.get("extract")),
        };
        text.map(str::to_string)
    }
}

fn non_blank(v: Option<&Value>) -> Option<&str> {
    v?.as_str().filter(|s| !s.trim().is_empty())
}

fn invalid_endpoint(provider: Provider, url: &str, e: url::ParseError) -> AppError {
    AppError::new("WEB_ENDPOINT_INVALID", "Web provider endpoint is not a valid URL")
        .with_details(format!("provider={}; url={url}; err={e}", provider.display_name()))
}
