use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::loaders::Source;

#[derive(Parser)]
#[command(
    name = "contextor",
    about = "Contextor - Query Gemini over content from audio, documents, web pages, and YouTube",
    version,
    long_about = "A CLI tool that ingests content from audio files, text/PDF documents, web pages, and YouTube caption tracks into a single context, then answers interactive queries over it using Google Gemini."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the given sources and answer queries over them interactively
    Query {
        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Load the given sources once and print the normalized content
    Load {
        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Configure API keys and settings
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported source kinds
    Sources,
}

/// The four source kinds a command can ingest, any combination
#[derive(Args)]
pub struct SourceArgs {
    /// Local audio file to transcribe
    #[arg(long, value_name = "FILE")]
    pub audio: Option<PathBuf>,

    /// Local text or PDF document
    #[arg(long, value_name = "FILE")]
    pub document: Option<PathBuf>,

    /// Web page URL
    #[arg(long, value_name = "URL")]
    pub web: Option<String>,

    /// YouTube video URL
    #[arg(long, value_name = "URL")]
    pub video: Option<String>,
}

impl SourceArgs {
    /// Turn the provided arguments into `Source` values, in ingestion order
    pub fn into_sources(self) -> Vec<Source> {
        let mut sources = Vec::new();

        if let Some(path) = self.audio {
            sources.push(Source::Audio { path });
        }
        if let Some(path) = self.document {
            sources.push(Source::Document { path });
        }
        if let Some(url) = self.web {
            sources.push(Source::Web { url });
        }
        if let Some(url) = self.video {
            sources.push(Source::Video { url });
        }

        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_command_with_sources() {
        let cli = Cli::try_parse_from([
            "contextor",
            "query",
            "--video",
            "https://youtu.be/T-D1OfcDW1M",
            "--web",
            "https://example.com",
        ])
        .unwrap();

        match cli.command {
            Commands::Query { sources } => {
                let sources = sources.into_sources();
                assert_eq!(sources.len(), 2);
                assert_eq!(sources[0].kind(), "web");
                assert_eq!(sources[1].kind(), "video");
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn into_sources_orders_audio_document_web_video() {
        let args = SourceArgs {
            audio: Some(PathBuf::from("talk.mp3")),
            document: Some(PathBuf::from("notes.pdf")),
            web: Some("https://example.com".to_string()),
            video: Some("https://youtu.be/T-D1OfcDW1M".to_string()),
        };

        let kinds: Vec<&str> = args.into_sources().iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, ["audio", "document", "web", "video"]);
    }

    #[test]
    fn sources_command_takes_no_arguments() {
        let cli = Cli::try_parse_from(["contextor", "sources"]).unwrap();
        assert!(matches!(cli.command, Commands::Sources));
    }
}
