//! Transcript corpus reader.
//!
//! Walks the configured corpus root and loads every file matching the
//! include globs into a [`Document`], skipping excluded paths. Files under
//! `test_data/` are always skipped; those hold evaluation fixtures, not
//! corpus material. A matching file that cannot be read as UTF-8 text is
//! left out of the corpus with a warning rather than indexed empty.
//! Read-only: scanning never modifies the corpus.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::models::Document;

pub fn scan_corpus(config: &CorpusConfig) -> Result<Vec<Document>> {
    let root = &config.root;
    if !root.exists() {
        bail!("Corpus root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/test_data/**".to_string(),
        "**/.git/**".to_string(),
        "**/.gitkeep".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut documents = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        if !include_set.is_match(&rel_str) {
            continue;
        }

        match load_document(path, &rel_str) {
            Ok(doc) => documents.push(doc),
            // Unreadable or non-UTF-8 files never become empty documents;
            // they are left out of the corpus and reported.
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable corpus file"),
        }
    }

    // Sort for deterministic corpus insertion order
    documents.sort_by(|a, b| a.source_id.cmp(&b.source_id));

    Ok(documents)
}

fn load_document(path: &Path, relative_path: &str) -> Result<Document> {
    let body = std::fs::read_to_string(path)?;

    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let modified_at = modified
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    Ok(Document {
        source_id: relative_path.to_string(),
        body,
        modified_at,
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn corpus_config(root: PathBuf) -> CorpusConfig {
        CorpusConfig {
            root,
            include_globs: vec!["**/*.txt".to_string()],
            exclude_globs: vec![],
            follow_symlinks: false,
        }
    }

    #[test]
    fn test_scan_sorted_by_source_id() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), "beta").unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();

        let docs = scan_corpus(&corpus_config(tmp.path().to_path_buf())).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.txt"]);
        assert_eq!(docs[0].body, "alpha");
    }

    #[test]
    fn test_test_data_subtree_excluded() {
        let tmp = tempfile::TempDir::new().unwrap();
        let nested = tmp.path().join("test_data");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("fixture.txt"), "not corpus material").unwrap();
        fs::write(tmp.path().join("episode.txt"), "real transcript").unwrap();

        let docs = scan_corpus(&corpus_config(tmp.path().to_path_buf())).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_id, "episode.txt");
    }

    #[test]
    fn test_only_excluded_files_behaves_as_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let nested = tmp.path().join("test_data");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("only.txt"), "fixture").unwrap();

        let docs = scan_corpus(&corpus_config(tmp.path().to_path_buf())).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_include_globs_filter() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("episode.txt"), "transcript").unwrap();
        fs::write(tmp.path().join("cover.png"), "binary").unwrap();

        let docs = scan_corpus(&corpus_config(tmp.path().to_path_buf())).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_id, "episode.txt");
    }

    #[test]
    fn test_non_utf8_file_skipped_not_indexed_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("episode.txt"), "real transcript").unwrap();
        fs::write(tmp.path().join("garbled.txt"), [0xffu8, 0xfe, 0x41, 0x80]).unwrap();

        let docs = scan_corpus(&corpus_config(tmp.path().to_path_buf())).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_id, "episode.txt");
        assert!(!docs[0].body.is_empty());
    }

    #[test]
    fn test_documents_carry_modified_time() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("episode.txt"), "transcript").unwrap();

        let docs = scan_corpus(&corpus_config(tmp.path().to_path_buf())).unwrap();
        assert!(docs[0].modified_at > 0);
    }

    #[test]
    fn test_missing_root_is_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = corpus_config(tmp.path().join("does-not-exist"));
        assert!(scan_corpus(&config).is_err());
    }
}
