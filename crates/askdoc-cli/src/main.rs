//! Askdoc CLI
//!
//! Runs the ingestion and question-answering pipeline against a local PDF
//! without the HTTP layer: one-shot `ask` or an interactive `chat` loop.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use askdoc_chat::{create_completion_client, ChatSession, LanguageNormalizer};
use askdoc_core::{AppConfig, CompletionClient};
use askdoc_parser::load_documents;
use askdoc_retrieval::{
    create_embedding_client, ChunkConfig, Chunker, EmbeddingClient, VectorIndex,
};

#[derive(Parser)]
#[command(name = "askdoc", about = "Ask questions about PDF documents", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question about a PDF
    Ask {
        /// Path to the PDF document
        file: String,

        /// The question to answer
        question: String,
    },

    /// Interactive question loop over a PDF
    Chat {
        /// Path to the PDF document
        file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askdoc_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Ask { file, question } => {
            let session = build_session(&config, &file).await?;
            let answer = session.ask(&question).await?;
            println!("{answer}");
        }
        Commands::Chat { file } => {
            let session = build_session(&config, &file).await?;
            run_chat_loop(&session).await?;
        }
    }

    Ok(())
}

/// Ingest the document and return a ready session
async fn build_session(config: &AppConfig, file: &str) -> anyhow::Result<ChatSession> {
    let embedder: Arc<dyn EmbeddingClient> = Arc::from(create_embedding_client(&config.llm)?);
    let completion: Arc<dyn CompletionClient> = Arc::from(create_completion_client(&config.llm)?);
    let normalizer =
        LanguageNormalizer::from_config(&config.translate, config.llm.timeout_secs)?.map(Arc::new);

    let session = ChatSession::new(embedder.clone(), completion, normalizer, config.chat.clone());

    let bytes = std::fs::read(file).with_context(|| format!("failed to read {file}"))?;
    let loaded = load_documents(&[bytes])?;

    let chunker = Chunker::new(ChunkConfig {
        chunk_size: config.chat.chunk_size,
        overlap: config.chat.chunk_overlap,
    })?;
    let chunks = chunker.chunk_text(&loaded.text);

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;
    let index = VectorIndex::build(chunks, vectors)?;

    tracing::info!(file = %file, chunks = index.len(), "document ingested");
    session.install_index(index, false).await;

    Ok(session)
}

/// Line-oriented question loop; empty line or "exit" quits
async fn run_chat_loop(session: &ChatSession) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() || question == "exit" {
            break;
        }

        match session.ask(question).await {
            Ok(answer) => println!("{answer}\n"),
            Err(e) => eprintln!("error: {e}\n"),
        }
    }

    Ok(())
}
