use anyhow::Result;
use clap::Parser;
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contextor::cli::{Cli, Commands, SourceArgs};
use contextor::config::Config;
use contextor::gemini::{GeminiClient, TextGenerator};
use contextor::loaders::{LoadResult, LoaderFactory, Source};
use contextor::query;
use contextor::translate::TranslationAdapter;
use contextor::utils;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contextor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Pick up .env secrets before reading configuration
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Query { sources } => {
            let (gemini, results) = load_sources(sources).await?;
            let context = query::build_context(&results);

            match gemini.count_tokens(&context).await {
                Ok(tokens) => println!("Context ready ({} tokens). Type 'exit' to quit.", tokens),
                Err(e) => tracing::warn!("Could not count context tokens: {}", e),
            }

            let stdin = io::stdin();
            query::run_query_loop(&*gemini, &context, stdin.lock(), &mut io::stdout()).await?;
        }
        Commands::Load { sources } => {
            let (_, results) = load_sources(sources).await?;
            for result in &results {
                print_result(result);
            }
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                config.interactive_setup()?;
            }
        }
        Commands::Sources => {
            println!("Supported sources:");
            println!("  • Audio files, transcribed via AssemblyAI (--audio)");
            println!("  • Text and PDF documents (--document)");
            println!("  • Web pages (--web)");
            println!("  • YouTube video captions, any origin, translated when needed (--video)");
        }
    }

    Ok(())
}

/// Build the shared Gemini client and load every requested source
async fn load_sources(args: SourceArgs) -> Result<(Arc<GeminiClient>, Vec<LoadResult>)> {
    let sources = args.into_sources();
    anyhow::ensure!(
        !sources.is_empty(),
        "No sources given; pass at least one of --audio, --document, --web, --video"
    );

    let config = Config::load().await?;
    // The Gemini credential is fatal before any loader runs
    config.validate()?;

    let gemini = Arc::new(GeminiClient::new(&config.gemini)?);
    let translator = TranslationAdapter::new(gemini.clone());
    let factory = LoaderFactory::new(config, translator);

    let mut results = Vec::with_capacity(sources.len());
    for source in &sources {
        let result = factory.load(source).await?;
        announce(source, &result);
        results.push(result);
    }

    Ok((gemini, results))
}

fn announce(source: &Source, result: &LoadResult) {
    match result {
        LoadResult::Audio { text, .. } => {
            tracing::info!("Audio transcribed: {} chars", text.len());
        }
        LoadResult::Text { content } => {
            tracing::info!("Document loaded: {} chars", content.content.len());
        }
        LoadResult::Pdf { page_count, .. } => {
            tracing::info!("PDF loaded: {} pages", page_count);
        }
        LoadResult::Web { content } => {
            tracing::info!("Webpage loaded: {} chars from {}", content.len(), source.location());
        }
        LoadResult::Video { transcript } => {
            tracing::info!("Transcript loaded: {} chars", transcript.len());
        }
    }
}

fn print_result(result: &LoadResult) {
    match result {
        LoadResult::Audio { text, metadata } => {
            println!("Audio transcript:");
            println!("{}", text);
            if let Some(duration) = metadata.get("audio_duration").and_then(|v| v.as_f64()) {
                println!("Audio duration: {}", utils::format_duration(duration));
            }
        }
        LoadResult::Text { content } => {
            println!("Document content ({}):", content.source);
            println!("{}", content.content);
        }
        LoadResult::Pdf { pages, page_count } => {
            println!("PDF pages: {}", page_count);
            for page in pages {
                println!("--- page {} ---", page.number);
                println!("{}", page.content);
            }
        }
        LoadResult::Web { content } => {
            println!("Webpage content length: {}", content.len());
            println!("{}", utils::preview(content, 500));
        }
        LoadResult::Video { transcript } => {
            println!("Transcript:");
            println!("{}", transcript);
        }
    }
}
