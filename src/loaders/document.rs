use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{mismatched_source, DocumentLoader, LoadResult, PdfPage, Source, TextDocument};
use crate::LoaderError;

/// Loader for local text and PDF documents.
///
/// Dispatch is purely on the filename suffix - no content sniffing.
pub struct TextDocumentLoader;

impl TextDocumentLoader {
    pub fn new() -> Self {
        Self
    }

    fn is_pdf(path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some("pdf")
    }

    /// Paginated extraction for PDF files
    async fn load_pdf(&self, path: &Path) -> crate::Result<LoadResult> {
        tracing::debug!("Extracting PDF pages from: {}", path.display());

        let owned = path.to_path_buf();
        let page_texts = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_by_pages(&owned)
                .map_err(|e| anyhow::anyhow!("{}", e))
        })
        .await
        .context("PDF extraction task failed")??;

        let pages: Vec<PdfPage> = page_texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| PdfPage {
                number: index + 1,
                content: text.trim().to_string(),
            })
            .collect();

        let page_count = pages.len();
        Ok(LoadResult::Pdf { pages, page_count })
    }

    /// Whole-document extraction for everything else
    async fn load_text(&self, path: &Path) -> crate::Result<LoadResult> {
        tracing::debug!("Reading text document: {}", path.display());

        let content = tokio::fs::read_to_string(path).await?;

        Ok(LoadResult::Text {
            content: TextDocument {
                source: path.display().to_string(),
                content,
            },
        })
    }

    async fn load_path(&self, path: &PathBuf) -> crate::Result<LoadResult> {
        if Self::is_pdf(path) {
            self.load_pdf(path).await
        } else {
            self.load_text(path).await
        }
    }
}

impl Default for TextDocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentLoader for TextDocumentLoader {
    async fn load(&self, source: &Source) -> Result<LoadResult, LoaderError> {
        let path = match source {
            Source::Document { path } => path,
            other => return Err(mismatched_source(self.name(), other)),
        };

        self.load_path(path)
            .await
            .map_err(|e| LoaderError::DocumentLoader(format!("Error loading document: {}", e)))
    }

    fn supports(&self, source: &Source) -> bool {
        matches!(source, Source::Document { .. })
    }

    fn name(&self) -> &'static str {
        "TextDocumentLoader"
    }
}
