use std::path::PathBuf;

use thiserror::Error;

/// Application-level error type.
///
/// Everything that aborts a run ends up here. Non-fatal conditions (spelling,
/// missing stylesheet, first-iteration overflow) are logged as warnings instead
/// and never become an `AppError`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No suitable Markdown h1 heading found for title")]
    MissingTitle,

    #[error("Browser not found: {0}")]
    BrowserNotFound(String),

    #[error("Renderer exited with {status}: {stderr}")]
    RendererFailed {
        status: String,
        stderr: String,
        stdout: String,
    },

    #[error("Renderer did not finish within {0}s")]
    RendererTimeout(u64),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Page fit did not converge within {limit} iterations (last line-height {line_height:.2})")]
    IterationCapExceeded { limit: u32, line_height: f64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// Logs the error with whatever diagnostic payload it carries.
    ///
    /// Renderer failures carry the browser's own output, which is usually the
    /// only useful clue, so both streams are emitted.
    pub fn log(&self) {
        match self {
            AppError::RendererFailed { stderr, stdout, .. } => {
                tracing::error!("{self}");
                if !stdout.trim().is_empty() {
                    tracing::error!("Renderer stdout: {}", stdout.trim());
                }
                if !stderr.trim().is_empty() {
                    tracing::error!("Renderer stderr: {}", stderr.trim());
                }
            }
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            other => tracing::error!("{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_cap_message_rounds_line_height() {
        let err = AppError::IterationCapExceeded {
            limit: 200,
            line_height: 11.150000000000002,
        };
        let msg = err.to_string();
        assert!(msg.contains("200"));
        assert!(msg.contains("11.15"), "got {msg}");
    }

    #[test]
    fn test_io_error_names_path() {
        let err = AppError::io(
            "resume.md",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("resume.md"));
    }

    #[test]
    fn test_renderer_failed_message_includes_stderr() {
        let err = AppError::RendererFailed {
            status: "exit status: 1".to_string(),
            stderr: "crashpad failure".to_string(),
            stdout: String::new(),
        };
        assert!(err.to_string().contains("crashpad failure"));
    }
}
