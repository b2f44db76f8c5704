//! Page fetching and HTML text extraction
//!
//! Downloads a page with a per-request timeout and reduces it to the
//! visible text the tagger reads.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::Html;
use snowball_core::{FetchConfig, FetchError, Fetcher, Result, SnowballError};
use std::time::Duration;

/// Elements whose text is never visible
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// HTTP page fetcher
pub struct HttpFetcher {
    client: Client,
    /// Bracketed spans such as citation markers `[12]`
    bracket_pattern: Regex,
    max_text_chars: usize,
}

impl HttpFetcher {
    /// Create from config
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| {
                SnowballError::ConfigError(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            bracket_pattern: bracket_pattern()?,
            max_text_chars: config.max_text_chars,
        })
    }

    /// Visible text of an HTML document, with bracketed spans removed and
    /// truncated to the configured length
    pub fn page_text(&self, html: &str) -> String {
        let text = visible_text(html);
        let text = self.bracket_pattern.replace_all(&text, "");

        let length = text.chars().count();
        if length > self.max_text_chars {
            tracing::debug!(length, max = self.max_text_chars, "Trimming webpage content");
            return text.chars().take(self.max_text_chars).collect();
        }

        text.into_owned()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_error(e, timeout))?;
        let html =
            String::from_utf8(bytes.to_vec()).map_err(|e| FetchError::Decode(e.to_string()))?;

        let text = self.page_text(&html);
        tracing::debug!(url, chars = text.chars().count(), "Fetched webpage");
        Ok(text)
    }
}

fn bracket_pattern() -> Result<Regex> {
    Regex::new(r"\[[^\]]*\]")
        .map_err(|e| SnowballError::ConfigError(format!("invalid bracket pattern: {e}")))
}

fn classify_error(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else if let Some(status) = err.status() {
        FetchError::Http {
            status: status.as_u16(),
        }
    } else if err.is_connect() || err.is_request() || err.is_redirect() {
        FetchError::Network(err.to_string())
    } else if err.is_body() || err.is_decode() {
        FetchError::Decode(err.to_string())
    } else {
        FetchError::Other(err.to_string())
    }
}

/// Concatenated text nodes outside script and style elements
fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();

    for node in document.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .is_some_and(|element| SKIPPED_ELEMENTS.contains(&element.name()));
        if !hidden {
            text.push_str(fragment);
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(max_text_chars: usize) -> HttpFetcher {
        HttpFetcher::from_config(&FetchConfig {
            max_text_chars,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_visible_text_skips_scripts_and_styles() {
        let html = r#"<html><head><title>Bill Gates</title>
            <style>body { color: red; }</style>
            <script>var tracking = true;</script></head>
            <body><p>Bill Gates founded <b>Microsoft</b>.</p></body></html>"#;

        let text = visible_text(html);
        assert!(text.contains("Bill Gates founded Microsoft."));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_page_text_removes_bracketed_spans() {
        let text = fetcher(20_000)
            .page_text("<p>Gates attended Harvard[3] before dropping out[citation needed].</p>");
        assert_eq!(text, "Gates attended Harvard before dropping out.");
    }

    #[test]
    fn test_page_text_truncates_by_characters() {
        let text = fetcher(5).page_text("<p>Zürich is lovely</p>");
        assert_eq!(text, "Züric");
    }

    #[test]
    fn test_short_page_is_untouched() {
        let text = fetcher(100).page_text("<p>Satya Nadella</p>");
        assert_eq!(text, "Satya Nadella");
    }
}
