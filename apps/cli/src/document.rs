//! The résumé source: Markdown text plus the base stylesheet.
//!
//! Loaded once at startup and never mutated. The title is extracted at load
//! time so a document without an h1 stops the run before any rendering.

use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub markdown: String,
    /// Base stylesheet. Empty when the CSS file was missing.
    pub css: String,
    pub title: String,
}

impl Document {
    /// Builds a document from in-memory text.
    pub fn new(markdown: impl Into<String>, css: impl Into<String>) -> Result<Self, AppError> {
        let markdown = markdown.into();
        let title = extract_title(&markdown)?;
        Ok(Self {
            markdown,
            css: css.into(),
            title,
        })
    }

    /// Reads the Markdown and CSS files.
    ///
    /// A missing Markdown file is fatal. A missing CSS file only produces a
    /// warning and an unstyled document; other CSS read errors are fatal.
    pub async fn load(markdown_path: &Path, css_path: &Path) -> Result<Self, AppError> {
        let markdown = tokio::fs::read_to_string(markdown_path)
            .await
            .map_err(|e| AppError::io(markdown_path, e))?;

        let css = match tokio::fs::read_to_string(css_path).await {
            Ok(css) => css,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "{} not found. Output will be unstyled.",
                    css_path.display()
                );
                String::new()
            }
            Err(e) => return Err(AppError::io(css_path, e)),
        };

        let doc = Self::new(markdown, css)?;
        debug!(title = %doc.title, css_bytes = doc.css.len(), "Loaded document");
        Ok(doc)
    }
}

/// Extracts the title from the first level-1 Markdown heading.
///
/// Only lines starting with `# ` count; `##` and deeper are skipped. Leading
/// and trailing `#` and spaces are stripped, so `# Jane Doe #` yields `Jane Doe`.
pub fn extract_title(markdown: &str) -> Result<String, AppError> {
    markdown
        .lines()
        .find(|line| line.starts_with("# ") && !line.starts_with("##"))
        .map(|line| {
            line.trim_matches(|c: char| c == '#' || c == ' ')
                .trim()
                .to_string()
        })
        .ok_or(AppError::MissingTitle)
}
