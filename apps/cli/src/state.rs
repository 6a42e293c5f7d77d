use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::errors::AppError;
use crate::layout::PageFitOptimizer;
use crate::render::{BrowserCommand, ChromeRenderer, HtmlRenderer, PdfRenderer};

/// Collaborators for one run, assembled once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub html: HtmlRenderer,
    /// Browser-backed PDF renderer. `None` in HTML-only mode, where no
    /// browser is looked up at all.
    pub pdf: Option<Arc<dyn PdfRenderer>>,
}

impl AppState {
    /// Resolves the browser (unless PDF output is skipped) and builds the state.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let pdf: Option<Arc<dyn PdfRenderer>> = if config.skip_pdf {
            None
        } else {
            let browser = BrowserCommand::resolve(config.chrome_path.as_deref()).await?;
            info!(
                browser = %browser.display(),
                timeout_secs = config.render_timeout.as_secs(),
                "PDF renderer ready"
            );
            let renderer: Arc<dyn PdfRenderer> =
                Arc::new(ChromeRenderer::new(browser, config.render_timeout));
            Some(renderer)
        };

        Ok(Self {
            config,
            html: HtmlRenderer,
            pdf,
        })
    }

    #[cfg(test)]
    pub fn with_renderer(config: Config, pdf: Arc<dyn PdfRenderer>) -> Self {
        Self {
            config,
            html: HtmlRenderer,
            pdf: Some(pdf),
        }
    }

    pub fn optimizer(&self) -> Option<PageFitOptimizer> {
        self.pdf
            .clone()
            .map(|pdf| PageFitOptimizer::new(self.config.fit, self.html, pdf))
    }
}
