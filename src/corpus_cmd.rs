//! `podrag corpus` subcommand: list what a build would ingest.

use anyhow::Result;

use crate::config::Config;
use crate::corpus::scan_corpus;

pub fn run_corpus(config: &Config) -> Result<()> {
    let documents = scan_corpus(&config.corpus)?;

    println!("corpus {}", config.corpus.root.display());
    println!("  documents: {}", documents.len());

    for doc in &documents {
        let modified = chrono::DateTime::from_timestamp(doc.modified_at, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "  {} ({} bytes, modified {})",
            doc.source_id,
            doc.body.len(),
            modified
        );
    }

    if documents.is_empty() {
        println!("  (nothing to index; check corpus.include_globs)");
    }

    Ok(())
}
