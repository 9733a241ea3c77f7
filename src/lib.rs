//! Contextor - A Rust CLI tool for querying Gemini over multi-source content
//!
//! This library provides functionality to ingest content from audio files, text/PDF
//! documents, web pages, and YouTube caption tracks into a normalized textual form
//! suitable for querying against the Google Gemini generative model.

pub mod captions;
pub mod cli;
pub mod config;
pub mod gemini;
pub mod loaders;
pub mod query;
pub mod translate;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use gemini::{GeminiClient, TextGenerator};
pub use loaders::{DocumentLoader, LoadResult, LoaderFactory, Source};
pub use translate::TranslationAdapter;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types raised at the loader boundary
///
/// `Display` is the message verbatim - callers match on the text of these
/// errors, so no variant adds a prefix of its own.
#[derive(thiserror::Error, Debug)]
pub enum LoaderError {
    /// Input, IO, or service failure while loading a source
    #[error("{0}")]
    DocumentLoader(String),

    /// No usable caption track found for a video
    #[error("{0}")]
    Transcription(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_loader_error_displays_message_verbatim() {
        let err = LoaderError::DocumentLoader("Invalid URL format".to_string());
        assert_eq!(err.to_string(), "Invalid URL format");
    }

    #[test]
    fn transcription_error_displays_message_verbatim() {
        let err = LoaderError::Transcription("No transcript available".to_string());
        assert_eq!(err.to_string(), "No transcript available");
    }
}
