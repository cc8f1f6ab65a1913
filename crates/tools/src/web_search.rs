//! Web search tool: DuckDuckGo's HTML endpoint, no API key required.

use async_trait::async_trait;
use ember_core::error::ToolError;
use ember_core::tool::{Tool, ToolContext};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const SNIPPET_SELECTOR: &str = ".result__snippet";
const MAX_RESULTS: usize = 5;

pub struct WebSearchTool {
    client: reqwest::Client,
    endpoint: String,
}

impl WebSearchTool {
    pub fn new(timeout: Duration) -> Self {
        Self::with_endpoint(SEARCH_URL, timeout)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; Ember/0.1)")
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

/// Pull the text of up to `limit` result snippets out of a results page.
pub fn extract_snippets(html: &str, limit: usize) -> Vec<String> {
    let Ok(selector) = Selector::parse(SNIPPET_SELECTOR) else {
        return Vec::new();
    };
    Html::parse_document(html)
        .select(&selector)
        .map(|element| element.text().collect::<String>())
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
        .take(limit)
        .collect()
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Returns up to 5 result snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        debug!(query = %query, "Web search");
        let html = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ToolError::failed("web_search", e))?
            .text()
            .await
            .map_err(|e| ToolError::failed("web_search", e))?;

        let snippets = extract_snippets(&html, MAX_RESULTS);
        if snippets.is_empty() {
            return Ok("No results found".into());
        }
        Ok(snippets
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {s}", i + 1))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="result">
          <a class="result__a" href="https://www.rust-lang.org/">Rust</a>
          <a class="result__snippet" href="https://www.rust-lang.org/">A language empowering
            everyone to build <b>reliable</b> &amp; efficient software.</a>
        </div>
        <div class="result">
          <a class="result__snippet" href="https://doc.rust-lang.org/book/">The Rust
            Programming Language &quot;the book&quot;</a>
        </div>
    "#;

    #[test]
    fn snippets_are_extracted_and_cleaned() {
        let snippets = extract_snippets(PAGE, 5);
        assert_eq!(
            snippets,
            vec![
                "A language empowering everyone to build reliable & efficient software.",
                "The Rust Programming Language \"the book\"",
            ]
        );
    }

    #[test]
    fn nested_markup_and_entities_are_flattened() {
        let page = r#"<div class="result__snippet">Paths like &#x2F;usr&#x2F;bin &hellip; see
            <a href="y">the <b>docs</b></a> for more</div>"#;
        assert_eq!(
            extract_snippets(page, 5),
            vec!["Paths like /usr/bin \u{2026} see the docs for more"]
        );
    }

    #[test]
    fn limit_is_respected() {
        assert_eq!(extract_snippets(PAGE, 1).len(), 1);
    }

    #[test]
    fn page_without_results() {
        assert!(extract_snippets("<html><body>nothing</body></html>", 5).is_empty());
    }

    #[test]
    fn tool_definition() {
        let tool = WebSearchTool::new(Duration::from_secs(5));
        let def = tool.to_definition();
        assert_eq!(def.name, "web_search");
        assert_eq!(def.parameters["required"][0], "query");
    }
}
