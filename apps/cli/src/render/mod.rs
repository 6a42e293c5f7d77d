// Rendering collaborators: Markdown → HTML, HTML → PDF via a headless browser.
// The fit loop only sees `PdfRenderer`, so it can be driven by a fake in tests.

pub mod browser;
pub mod chrome;
pub mod html;
pub mod pdf;

use std::path::Path;

use async_trait::async_trait;

use crate::errors::AppError;

pub use browser::BrowserCommand;
pub use chrome::ChromeRenderer;
pub use html::HtmlRenderer;

/// Turns an HTML page into a PDF file and reports its page count.
///
/// Implementations overwrite `output` on every call. A renderer crash is an
/// error, never a page count.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str, output: &Path) -> Result<u32, AppError>;
}
