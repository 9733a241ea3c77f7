use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod audio;
pub mod document;
pub mod webpage;
pub mod youtube;

pub use audio::AudioLoader;
pub use document::TextDocumentLoader;
pub use webpage::WebpageLoader;
pub use youtube::YoutubeTranscriptLoader;

use crate::captions::YoutubeCaptionClient;
use crate::config::Config;
use crate::translate::TranslationAdapter;
use crate::LoaderError;

/// A content source to ingest, constructed per call and discarded after use
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Local audio file to transcribe
    Audio { path: PathBuf },

    /// Local text or PDF document; the loader dispatches on the filename suffix
    Document { path: PathBuf },

    /// Web page URL
    Web { url: String },

    /// Video URL carrying caption tracks
    Video { url: String },
}

impl Source {
    pub fn kind(&self) -> &'static str {
        match self {
            Source::Audio { .. } => "audio",
            Source::Document { .. } => "document",
            Source::Web { .. } => "web",
            Source::Video { .. } => "video",
        }
    }

    /// The path or URL this source points at, for logging
    pub fn location(&self) -> String {
        match self {
            Source::Audio { path } | Source::Document { path } => path.display().to_string(),
            Source::Web { url } | Source::Video { url } => url.clone(),
        }
    }
}

/// A plain-text document with its origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDocument {
    /// The path the document was loaded from
    pub source: String,

    /// Full extracted text content
    pub content: String,
}

/// One extracted PDF page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfPage {
    /// 1-based page number
    pub number: usize,

    /// Extracted page text
    pub content: String,
}

/// Normalized result of a successful load.
///
/// The shape follows the source kind; there is no common field across
/// variants, and callers must match rather than assume one.
#[derive(Debug, Clone, Serialize)]
pub enum LoadResult {
    Audio {
        text: String,
        metadata: HashMap<String, serde_json::Value>,
    },
    Text {
        content: TextDocument,
    },
    Pdf {
        pages: Vec<PdfPage>,
        page_count: usize,
    },
    Web {
        content: String,
    },
    Video {
        transcript: String,
    },
}

impl LoadResult {
    /// Flatten the result into plain text for context aggregation
    pub fn context_text(&self) -> String {
        match self {
            LoadResult::Audio { text, .. } => text.clone(),
            LoadResult::Text { content } => content.content.clone(),
            LoadResult::Pdf { pages, .. } => pages
                .iter()
                .map(|page| page.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            LoadResult::Web { content } => content.clone(),
            LoadResult::Video { transcript } => transcript.clone(),
        }
    }
}

/// Trait for loading content from different source kinds
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load and normalize one source
    async fn load(&self, source: &Source) -> Result<LoadResult, LoaderError>;

    /// Check if this loader handles the given source
    fn supports(&self, source: &Source) -> bool;

    /// Get the name of this loader
    fn name(&self) -> &'static str;
}

/// Error for a source handed to the wrong loader variant
pub(crate) fn mismatched_source(loader: &str, source: &Source) -> LoaderError {
    LoaderError::DocumentLoader(format!(
        "{} cannot handle {} source: {}",
        loader,
        source.kind(),
        source.location()
    ))
}

/// Constructs the loader variant matching a source.
///
/// Construction itself can fail: the audio loader requires a credential and
/// refuses to build without one.
pub struct LoaderFactory {
    config: Config,
    translator: TranslationAdapter,
}

impl LoaderFactory {
    pub fn new(config: Config, translator: TranslationAdapter) -> Self {
        Self { config, translator }
    }

    /// Create the loader for a source
    pub fn create(&self, source: &Source) -> Result<Box<dyn DocumentLoader>, LoaderError> {
        match source {
            Source::Audio { .. } => Ok(Box::new(AudioLoader::new(None, &self.config.assembly)?)),
            Source::Document { .. } => Ok(Box::new(TextDocumentLoader::new())),
            Source::Web { .. } => Ok(Box::new(WebpageLoader::new(&self.config.app))),
            Source::Video { .. } => {
                let captions = YoutubeCaptionClient::new(Duration::from_secs(
                    self.config.app.request_timeout_secs,
                ));
                Ok(Box::new(YoutubeTranscriptLoader::new(
                    Arc::new(captions),
                    self.translator.clone(),
                )))
            }
        }
    }

    /// Create the matching loader and run it on the source
    pub async fn load(&self, source: &Source) -> Result<LoadResult, LoaderError> {
        let loader = self.create(source)?;
        tracing::info!("Loading {} source: {}", source.kind(), source.location());
        loader.load(source).await
    }
}
