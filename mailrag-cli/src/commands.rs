//! Subcommand handlers.

use std::path::Path;

use anyhow::{Context, Result};
use mailrag_rag::{
    EmailJsonParser, Indexer, IngestReport, Ingestor, PlainTextParser, SourceParser, VectorStore,
};
use tracing::{info, warn};

use crate::cli::{Cli, Command};
use crate::console::run_console;
use crate::session::Session;
use crate::settings::Settings;

pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_args(&cli.global)?;

    match cli.command_or_chat() {
        Command::Chat => {
            let mut session = Session::open(&settings).await?;
            run_console(&mut session).await
        }
        Command::Ask { query } => {
            let query = query.join(" ");
            let mut session = Session::open(&settings).await?;
            let reply = session.ask(&query).await?;
            println!("{}", reply.answer);
            if let Some(e) = reply.unsaved {
                eprintln!("Warning: this answer was not saved to the history: {e}");
            }
            Ok(())
        }
        Command::IngestEmails { source, processed } => {
            ingest(&settings, EmailJsonParser, &source, &processed, &settings.emails_collection)
                .await
        }
        Command::IngestDocs { source, processed } => {
            ingest(&settings, PlainTextParser, &source, &processed, &settings.docs_collection).await
        }
        Command::Stats => stats(&settings).await,
    }
}

async fn ingest<P: SourceParser>(
    settings: &Settings,
    parser: P,
    source: &Path,
    processed: &Path,
    collection: &str,
) -> Result<()> {
    let indexer = Indexer::builder()
        .embedding_provider(settings.embedding_provider()?)
        .vector_store(settings.vector_store())
        .chunker(settings.rag.chunker.build(settings.rag.chunk_size, settings.rag.chunk_overlap))
        .build()?;

    let report = Ingestor::new(indexer, parser)
        .ingest_directory(source, processed, collection)
        .await
        .with_context(|| format!("ingestion of {} failed", source.display()))?;

    // Skipped files do not fail the command.
    print_report(&report, collection);
    if report.has_failures() {
        warn!(
            collection,
            skipped = report.skipped.len(),
            unmoved = report.unmoved.len(),
            "some files were left in the source directory"
        );
    }
    Ok(())
}

fn print_report(report: &IngestReport, collection: &str) {
    println!(
        "Ingested {} file(s) into '{collection}': {} document(s), {} chunk(s)",
        report.ingested.len(),
        report.documents,
        report.chunks
    );
    for skipped in &report.skipped {
        eprintln!("  skipped {}: {}", skipped.path.display(), skipped.error);
    }
    for unmoved in &report.unmoved {
        eprintln!("  stored but not moved {}: {}", unmoved.path.display(), unmoved.error);
    }
}

async fn stats(settings: &Settings) -> Result<()> {
    let store = settings.vector_store();
    info!(store = %settings.store_dir.display(), "reading collection stats");

    for name in [&settings.docs_collection, &settings.emails_collection] {
        match store.count(name).await {
            Ok(count) => println!("{name}: {count} record(s)"),
            Err(e) => println!("{name}: unavailable ({e})"),
        }
    }
    Ok(())
}
