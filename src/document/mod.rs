#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{Result, SopError};

/// One source PDF with its extracted pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub pages: Vec<PageContent>,
}

/// Extracted text of a single page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// 1-based page number
    pub page_number: u32,
    pub text: String,
}

impl Document {
    /// File name of the source PDF, used as the chunk source reference.
    #[inline]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }

    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Recursively discover PDF files under `dir`, in sorted order so repeat
/// ingestion runs visit documents identically.
#[inline]
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SopError::Document(format!(
            "data directory not found: {}",
            dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    paths.sort();
    debug!("Discovered {} PDF files under {}", paths.len(), dir.display());
    Ok(paths)
}

/// Load a PDF and extract its text per page.
///
/// The extractor returns one string for the whole document; form feed
/// characters mark the page boundaries. Documents without any form feed
/// are treated as a single page.
#[inline]
pub fn load_document(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)
        .map_err(|e| SopError::Document(format!("failed to read {}: {e}", path.display())))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| SopError::Document(format!("failed to extract {}: {e}", path.display())))?;

    let pages = split_pages(&text);
    debug!(
        "Extracted {} non-empty pages from {}",
        pages.len(),
        path.display()
    );

    Ok(Document {
        path: path.to_path_buf(),
        pages,
    })
}

fn split_pages(text: &str) -> Vec<PageContent> {
    if !text.contains('\x0C') {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![PageContent {
            page_number: 1,
            text: trimmed.to_string(),
        }];
    }

    text.split('\x0C')
        .enumerate()
        .filter(|(_, page_text)| !page_text.trim().is_empty())
        .map(|(i, page_text)| PageContent {
            page_number: u32::try_from(i).unwrap_or(u32::MAX).saturating_add(1),
            text: page_text.trim().to_string(),
        })
        .collect()
}
