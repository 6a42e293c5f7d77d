//! Page-fit search: grows the line-height until the résumé spills onto a
//! second page, then settles on the last value that still fit.
//!
//! # Loop
//! 1. Render HTML at `current` (rounded to 2 decimals) and print it to PDF.
//! 2. First iteration over one page → nothing to fall back to; keep it, warn,
//!    report `NeverFit`.
//! 3. Later iteration over one page → re-print the last good HTML so the PDF
//!    on disk matches it, report `Converged`.
//! 4. Otherwise remember `current` as good and step up.
//!
//! Page count is assumed non-decreasing in line-height. When that does not
//! hold (renderer noise) the loop is stopped by `max_iterations` instead of
//! spinning forever. A stylesheet with nothing to substitute is rendered once.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::errors::AppError;
use crate::layout::line_height::{
    format_line_height, has_line_height, next_line_height, round_line_height,
};
use crate::render::{HtmlRenderer, PdfRenderer};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_START_LINE_HEIGHT: f64 = 1.2;
pub const DEFAULT_STEP: f64 = 0.05;
pub const DEFAULT_MAX_ITERATIONS: u32 = 200;

/// Search parameters for one fit run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Smallest line-height tried; also what is emitted when even it overflows.
    pub start_line_height: f64,
    pub step: f64,
    /// Renders allowed before the search is declared non-convergent.
    /// The revert render does not count.
    pub max_iterations: u32,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            start_line_height: DEFAULT_START_LINE_HEIGHT,
            step: DEFAULT_STEP,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.start_line_height.is_finite() && self.start_line_height > 0.0) {
            return Err(AppError::Validation(format!(
                "start line-height must be positive, got {}",
                self.start_line_height
            )));
        }
        // A step that rounds away to nothing would never move the search.
        if !(self.step.is_finite() && round_line_height(self.step) > 0.0) {
            return Err(AppError::Validation(format!(
                "line-height step must be at least 0.01, got {}",
                self.step
            )));
        }
        if self.max_iterations == 0 {
            return Err(AppError::Validation(
                "max iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// One measured rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub line_height: f64,
    pub page_count: u32,
}

/// How the search ended. Renderer failures are the `Err` side of
/// [`PageFitOptimizer::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FitOutcome {
    /// `line_height` is the largest tested value that produced one page.
    Converged { line_height: f64, iterations: u32 },
    /// The starting line-height already overflowed; output is kept anyway.
    NeverFit { line_height: f64, page_count: u32 },
}

impl FitOutcome {
    pub fn line_height(&self) -> f64 {
        match self {
            FitOutcome::Converged { line_height, .. } | FitOutcome::NeverFit { line_height, .. } => {
                *line_height
            }
        }
    }
}

/// Result of a completed search. The PDF at the output path corresponds to `html`.
#[derive(Debug, Clone, Serialize)]
pub struct FitRun {
    pub outcome: FitOutcome,
    #[serde(skip)]
    pub html: String,
    /// Every measured rendering in order, excluding the revert render.
    pub candidates: Vec<Candidate>,
    /// Page count of the revert render, when one happened.
    pub revalidated_pages: Option<u32>,
}

// ────────────────────────────────────────────────────────────────────────────
// Optimizer
// ────────────────────────────────────────────────────────────────────────────

pub struct PageFitOptimizer {
    config: FitConfig,
    html: HtmlRenderer,
    pdf: Arc<dyn PdfRenderer>,
}

impl PageFitOptimizer {
    pub fn new(config: FitConfig, html: HtmlRenderer, pdf: Arc<dyn PdfRenderer>) -> Self {
        Self { config, html, pdf }
    }

    /// Runs the search, leaving the final PDF at `output`.
    ///
    /// Any renderer error aborts immediately; nothing is retried.
    pub async fn run(&self, doc: &Document, output: &Path) -> Result<FitRun, AppError> {
        self.config.validate()?;

        let mut current = round_line_height(self.config.start_line_height);
        if !has_line_height(&doc.css) {
            warn!("Stylesheet has no unitless line-height declaration; rendering once without a search");
            return self.render_once(doc, current, output).await;
        }

        // Last line-height confirmed to fit, with its HTML.
        let mut best: Option<(f64, String)> = None;
        let mut candidates = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            current = round_line_height(current);
            let html = self.html.render_at(doc, current);
            let page_count = self.pdf.render(&html, output).await?;
            candidates.push(Candidate {
                line_height: current,
                page_count,
            });
            info!(
                iteration,
                line_height = %format_line_height(current),
                pages = page_count,
                "Rendered candidate"
            );

            if page_count <= 1 {
                best = Some((current, html));
                current = next_line_height(current, self.config.step);
                continue;
            }

            return match best.take() {
                None => {
                    warn!(
                        line_height = %format_line_height(current),
                        pages = page_count,
                        "Content does not fit on one page even at the starting line-height; keeping it anyway"
                    );
                    Ok(FitRun {
                        outcome: FitOutcome::NeverFit {
                            line_height: current,
                            page_count,
                        },
                        html,
                        candidates,
                        revalidated_pages: None,
                    })
                }
                Some((line_height, best_html)) => {
                    debug!(
                        overflow_at = %format_line_height(current),
                        revert_to = %format_line_height(line_height),
                        "Overflow; reverting to last single-page line-height"
                    );
                    let revalidated = self.pdf.render(&best_html, output).await?;
                    if revalidated > 1 {
                        warn!(
                            line_height = %format_line_height(line_height),
                            pages = revalidated,
                            "Reverted rendering no longer fits on one page"
                        );
                    }
                    info!(
                        line_height = %format_line_height(line_height),
                        iterations = iteration,
                        "Page fit converged"
                    );
                    Ok(FitRun {
                        outcome: FitOutcome::Converged {
                            line_height,
                            iterations: iteration,
                        },
                        html: best_html,
                        candidates,
                        revalidated_pages: Some(revalidated),
                    })
                }
            };
        }

        let last = best.map(|(lh, _)| lh).unwrap_or(current);
        Err(AppError::IterationCapExceeded {
            limit: self.config.max_iterations,
            line_height: last,
        })
    }

    /// Single render with no search; used when the stylesheet gives the
    /// search nothing to change.
    async fn render_once(
        &self,
        doc: &Document,
        line_height: f64,
        output: &Path,
    ) -> Result<FitRun, AppError> {
        let html = self.html.render_at(doc, line_height);
        let page_count = self.pdf.render(&html, output).await?;
        let outcome = if page_count <= 1 {
            FitOutcome::Converged {
                line_height,
                iterations: 1,
            }
        } else {
            warn!(pages = page_count, "Content does not fit on one page");
            FitOutcome::NeverFit {
                line_height,
                page_count,
            }
        };
        Ok(FitRun {
            outcome,
            html,
            candidates: vec![Candidate {
                line_height,
                page_count,
            }],
            revalidated_pages: None,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::layout::line_height::find_line_height;

    /// Returns page counts from a script, in call order.
    struct ScriptedRenderer {
        pages: Mutex<VecDeque<u32>>,
        seen: Mutex<Vec<f64>>,
        fail_on_call: Option<usize>,
    }

    impl ScriptedRenderer {
        fn new(pages: &[u32]) -> Self {
            Self {
                pages: Mutex::new(pages.iter().copied().collect()),
                seen: Mutex::new(vec![]),
                fail_on_call: None,
            }
        }

        fn failing_on(pages: &[u32], call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::new(pages)
            }
        }

        fn seen(&self) -> Vec<f64> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PdfRenderer for ScriptedRenderer {
        async fn render(&self, html: &str, _output: &Path) -> Result<u32, AppError> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(find_line_height(html).unwrap_or(f64::NAN));
            if self.fail_on_call == Some(seen.len()) {
                return Err(AppError::RendererFailed {
                    status: "exit status: 1".to_string(),
                    stderr: "scripted crash".to_string(),
                    stdout: String::new(),
                });
            }
            Ok(self.pages.lock().unwrap().pop_front().unwrap_or(1))
        }
    }

    /// One page up to and including `max_fitting`, two pages above it.
    struct ThresholdRenderer {
        max_fitting: f64,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl PdfRenderer for ThresholdRenderer {
        async fn render(&self, html: &str, _output: &Path) -> Result<u32, AppError> {
            *self.calls.lock().unwrap() += 1;
            let lh = find_line_height(html).unwrap_or(0.0);
            Ok(if lh > self.max_fitting + 1e-9 { 2 } else { 1 })
        }
    }

    fn make_doc() -> Document {
        Document::new(
            "# Jane Doe\n\n## Experience\n\n- Built a distributed cache",
            "body { font-size: 11pt; line-height: 1.0; }",
        )
        .unwrap()
    }

    fn make_optimizer(renderer: Arc<dyn PdfRenderer>) -> PageFitOptimizer {
        PageFitOptimizer::new(FitConfig::default(), HtmlRenderer, renderer)
    }

    fn out() -> &'static Path {
        Path::new("build/resume.pdf")
    }

    // ── convergence ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_overflow_reverts_to_previous_line_height() {
        let renderer = Arc::new(ScriptedRenderer::new(&[1, 1, 1, 2, 1]));
        let run = make_optimizer(renderer.clone())
            .run(&make_doc(), out())
            .await
            .unwrap();

        assert_eq!(
            run.outcome,
            FitOutcome::Converged {
                line_height: 1.3,
                iterations: 4
            }
        );
        assert!(run.html.contains("line-height: 1.30;"));
        assert_eq!(run.revalidated_pages, Some(1));
        // Last render is the revert, so the PDF on disk is the 1.30 one.
        assert_eq!(renderer.seen(), vec![1.2, 1.25, 1.3, 1.35, 1.3]);
        let tested: Vec<f64> = run.candidates.iter().map(|c| c.line_height).collect();
        assert_eq!(tested, vec![1.2, 1.25, 1.3, 1.35]);
    }

    #[tokio::test]
    async fn test_monotonic_renderer_converges_on_largest_fitting_value() {
        let renderer = Arc::new(ThresholdRenderer {
            max_fitting: 1.5,
            calls: Mutex::new(0),
        });
        let run = make_optimizer(renderer.clone())
            .run(&make_doc(), out())
            .await
            .unwrap();

        assert_eq!(run.outcome.line_height(), 1.5);
        assert!(matches!(run.outcome, FitOutcome::Converged { .. }));
        let largest_single_page = run
            .candidates
            .iter()
            .filter(|c| c.page_count == 1)
            .map(|c| c.line_height)
            .fold(f64::MIN, f64::max);
        assert_eq!(largest_single_page, 1.5);
        // 1.20..=1.55 is eight candidates, plus one revert render.
        assert_eq!(*renderer.calls.lock().unwrap(), 9);
    }

    #[tokio::test]
    async fn test_rounding_reaches_exact_line_height_after_ten_steps() {
        let renderer = Arc::new(ThresholdRenderer {
            max_fitting: 1.7,
            calls: Mutex::new(0),
        });
        let run = make_optimizer(renderer).run(&make_doc(), out()).await.unwrap();

        assert_eq!(run.outcome.line_height(), 1.7);
        assert!(run.html.contains("line-height: 1.70;"));
        assert!(run.candidates.iter().all(|c| round_line_height(c.line_height) == c.line_height));
    }

    // ── first-iteration overflow ────────────────────────────────────────────

    #[tokio::test]
    async fn test_first_iteration_overflow_runs_once_and_keeps_output() {
        let renderer = Arc::new(ScriptedRenderer::new(&[2]));
        let run = make_optimizer(renderer.clone())
            .run(&make_doc(), out())
            .await
            .unwrap();

        assert_eq!(
            run.outcome,
            FitOutcome::NeverFit {
                line_height: 1.2,
                page_count: 2
            }
        );
        assert_eq!(renderer.seen(), vec![1.2]);
        assert!(run.html.contains("line-height: 1.20;"));
        assert_eq!(run.revalidated_pages, None);
    }

    // ── failure paths ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_renderer_failure_aborts_without_retry() {
        let renderer = Arc::new(ScriptedRenderer::failing_on(&[1, 1, 1, 1], 3));
        let err = make_optimizer(renderer.clone())
            .run(&make_doc(), out())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RendererFailed { .. }));
        assert_eq!(renderer.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_renderer_failure_during_revert_is_fatal() {
        let renderer = Arc::new(ScriptedRenderer::failing_on(&[1, 2], 3));
        let err = make_optimizer(renderer)
            .run(&make_doc(), out())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RendererFailed { .. }));
    }

    #[tokio::test]
    async fn test_never_overflowing_renderer_hits_iteration_cap() {
        let renderer = Arc::new(ScriptedRenderer::new(&[]));
        let config = FitConfig {
            max_iterations: 5,
            ..FitConfig::default()
        };
        let err = PageFitOptimizer::new(config, HtmlRenderer, renderer.clone())
            .run(&make_doc(), out())
            .await
            .unwrap_err();

        match err {
            AppError::IterationCapExceeded { limit, line_height } => {
                assert_eq!(limit, 5);
                assert_eq!(line_height, 1.4);
            }
            other => panic!("expected IterationCapExceeded, got {other:?}"),
        }
        assert_eq!(renderer.seen().len(), 5);
    }

    #[tokio::test]
    async fn test_revert_that_no_longer_fits_is_reported() {
        let renderer = Arc::new(ScriptedRenderer::new(&[1, 2, 2]));
        let run = make_optimizer(renderer).run(&make_doc(), out()).await.unwrap();

        assert_eq!(run.outcome.line_height(), 1.2);
        assert_eq!(run.revalidated_pages, Some(2));
    }

    #[tokio::test]
    async fn test_stylesheet_without_line_height_renders_once() {
        let renderer = Arc::new(ScriptedRenderer::new(&[]));
        let doc = Document::new("# Jane Doe\n\nBody", "").unwrap();
        let run = make_optimizer(renderer.clone()).run(&doc, out()).await.unwrap();

        assert_eq!(renderer.seen().len(), 1);
        assert_eq!(
            run.outcome,
            FitOutcome::Converged {
                line_height: 1.2,
                iterations: 1
            }
        );
    }

    // ── configuration ───────────────────────────────────────────────────────

    #[test]
    fn test_default_config() {
        let config = FitConfig::default();
        assert_eq!(config.start_line_height, 1.2);
        assert_eq!(config.step, 0.05);
        assert_eq!(config.max_iterations, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_step_that_rounds_to_zero() {
        let config = FitConfig {
            step: 0.001,
            ..FitConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_config_rejects_non_positive_start() {
        let config = FitConfig {
            start_line_height: 0.0,
            ..FitConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_renders_nothing() {
        let renderer = Arc::new(ScriptedRenderer::new(&[]));
        let config = FitConfig {
            max_iterations: 0,
            ..FitConfig::default()
        };
        let result = PageFitOptimizer::new(config, HtmlRenderer, renderer.clone())
            .run(&make_doc(), out())
            .await;
        assert!(result.is_err());
        assert!(renderer.seen().is_empty());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(FitOutcome::Converged {
            line_height: 1.3,
            iterations: 4,
        })
        .unwrap();
        assert_eq!(json["status"], "converged");
        assert_eq!(json["line_height"], 1.3);
    }
}
