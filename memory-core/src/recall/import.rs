//! Importing external documents into a memory category, with
//! filename-keyword category auto-detection, a provenance header, and
//! bulk directory import.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::recall::CancellationSignal;
use crate::storage::StorageBackend;
use crate::types::{Category, MemorySpace};

/// Category a document falls back to when its filename matches no
/// registered category name.
pub const FALLBACK_IMPORT_CATEGORY: &str = "activity";

/// Result of importing a document: the category it was routed to and the
/// content to persist (original content prefixed with a provenance
/// header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedDocument {
    /// Category name the document was routed to.
    pub category: String,
    /// Document content with the provenance header prepended.
    pub content: String,
}

/// Outcome of importing a single file as part of [`import_directory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFileReport {
    /// Name of the file that was attempted.
    pub filename: String,
    /// Category the file was routed to, if it was read successfully.
    pub category: Option<String>,
    /// Whether the file was read and persisted successfully.
    pub success: bool,
    /// Error message, when `success` is `false`.
    pub error: Option<String>,
}

/// Detect which registered category a filename most likely belongs to by
/// checking whether the (lowercased) filename stem contains the category
/// name as a substring, preferring the longest matching name. Falls back
/// to [`FALLBACK_IMPORT_CATEGORY`] (or, if that category is not itself
/// registered, the first registered category) when nothing matches.
///
/// # Panics
///
/// Panics if `categories` is empty; a memory space always has at least
/// one registered category.
#[must_use]
pub fn detect_category<'a>(filename: &str, categories: &'a [Category]) -> &'a Category {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_lowercase();

    categories
        .iter()
        .filter(|c| stem.contains(&c.name))
        .max_by_key(|c| c.name.len())
        .or_else(|| categories.iter().find(|c| c.name == FALLBACK_IMPORT_CATEGORY))
        .unwrap_or_else(|| categories.first().expect("detect_category: categories must not be empty"))
}

/// Build the provenance header prepended to an imported document's
/// content.
#[must_use]
pub fn provenance_header(filename: &str, imported_at: DateTime<Utc>) -> String {
    format!("# Imported from {filename}\n\n*Imported on {}*\n\n", imported_at.to_rfc3339())
}

/// Import `content` read from `filename`, prepending a provenance header
/// and routing it to `category_override` when given, or the
/// filename-detected category (see [`detect_category`]) otherwise.
#[must_use]
pub fn import_document(
    filename: &str,
    content: &str,
    categories: &[Category],
    category_override: Option<&str>,
    imported_at: DateTime<Utc>,
) -> ImportedDocument {
    let category = match category_override {
        Some(name) => name.to_string(),
        None => detect_category(filename, categories).name.clone(),
    };
    let header = provenance_header(filename, imported_at);
    ImportedDocument { category, content: format!("{header}{content}") }
}

/// Import every file in `dir` whose name contains `pattern` (a plain,
/// case-insensitive substring filter; `None` matches every file) into
/// `space`, up to `max_files` files, appending each to its detected
/// category's artifact. Returns one [`ImportFileReport`] per file
/// attempted, so a partial failure in a large directory does not lose
/// the outcome of the files that succeeded.
///
/// # Errors
///
/// Returns [`Error::CancelledBySignal`] if `cancel` is set mid-import, and
/// [`Error::StorageIoError`] if `dir` itself cannot be read.
pub async fn import_directory(
    storage: &dyn StorageBackend,
    space: &MemorySpace,
    categories: &[Category],
    dir: &Path,
    pattern: Option<&str>,
    max_files: usize,
    cancel: &CancellationSignal,
) -> Result<Vec<ImportFileReport>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::StorageIoError(format!("failed to read directory {}: {e}", dir.display())))?;

    let pattern = pattern.map(str::to_lowercase);
    let mut reports = Vec::new();

    while reports.len() < max_files {
        cancel.check()?;
        let entry = entries
            .next_entry()
            .await
            .map_err(|e| Error::StorageIoError(format!("failed to read directory entry: {e}")))?;
        let Some(entry) = entry else { break };

        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        if let Some(pattern) = &pattern {
            if !filename.to_lowercase().contains(pattern) {
                continue;
            }
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let imported = import_document(&filename, &content, categories, None, Utc::now());
                match storage.append(space, &imported.category, &imported.content).await {
                    Ok(()) => reports.push(ImportFileReport {
                        filename,
                        category: Some(imported.category),
                        success: true,
                        error: None,
                    }),
                    Err(e) => reports.push(ImportFileReport {
                        filename,
                        category: Some(imported.category),
                        success: false,
                        error: Some(e.to_string()),
                    }),
                }
            }
            Err(e) => reports.push(ImportFileReport { filename, category: None, success: false, error: Some(e.to_string()) }),
        }
    }

    Ok(reports)
}
