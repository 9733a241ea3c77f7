use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{mismatched_source, DocumentLoader, LoadResult, Source};
use crate::config::AppConfig;
use crate::LoaderError;

/// Loader for web page content.
///
/// Each successful load also overwrites a local sink file with the extracted
/// content - an intentional artifact, not an append log. Callers that care
/// about sink integrity must not run concurrent loads.
pub struct WebpageLoader {
    client: reqwest::Client,
    sink_path: PathBuf,
}

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

impl WebpageLoader {
    pub fn new(config: &AppConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            sink_path: config.sink_path.clone(),
        }
    }

    async fn fetch_content(&self, url: &str) -> crate::Result<String> {
        tracing::info!("Fetching webpage: {}", url);

        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .context("Failed to fetch webpage")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }

        let html = response.text().await.context("Failed to read page body")?;

        let content = tokio::task::spawn_blocking(move || html_to_text(&html))
            .await
            .context("HTML extraction task failed")?;

        Ok(content)
    }
}

/// Elements whose text makes up the readable content of a page
const CONTENT_SELECTOR: &str = "title, h1, h2, h3, h4, h5, h6, p, li, td, th, pre, blockquote";

/// Extract the visible text of a page.
///
/// Falls back to the raw body when the document has no matching text nodes.
fn html_to_text(html: &str) -> String {
    let soup = scrape_core::Soup::parse(html);

    let text = soup
        .find_all(CONTENT_SELECTOR)
        .ok()
        .map(|tags| {
            tags.into_iter()
                .map(|tag| tag.text())
                .filter(|text| !text.trim().is_empty())
                .map(|text| text.trim().to_string())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        html.to_string()
    } else {
        text
    }
}

/// Overwrite the sink file with the content followed by two newlines
fn write_sink(path: &Path, content: &str) -> std::io::Result<()> {
    fs_err::write(path, format!("{}\n\n", content))
}

#[async_trait]
impl DocumentLoader for WebpageLoader {
    async fn load(&self, source: &Source) -> Result<LoadResult, LoaderError> {
        let url = match source {
            Source::Web { url } => url,
            other => return Err(mismatched_source(self.name(), other)),
        };

        // Side-effect-free rejection, before any network access or sink write
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(LoaderError::DocumentLoader("Invalid URL format".to_string()));
        }

        let content = self
            .fetch_content(url)
            .await
            .map_err(|e| LoaderError::DocumentLoader(format!("Error loading webpage: {}", e)))?;

        let content = content.trim().to_string();

        write_sink(&self.sink_path, &content)
            .map_err(|e| LoaderError::DocumentLoader(format!("Error loading webpage: {}", e)))?;

        Ok(LoadResult::Web { content })
    }

    fn supports(&self, source: &Source) -> bool {
        matches!(source, Source::Web { .. })
    }

    fn name(&self) -> &'static str {
        "WebpageLoader"
    }
}
