//! One end-to-end run: load, proofread, fit, write.

use std::path::Path;

use tracing::{info, warn};

use crate::config::Config;
use crate::document::Document;
use crate::errors::AppError;
use crate::layout::line_height::{find_line_height, format_line_height};
use crate::layout::FitOutcome;
use crate::proofing::{warn_on_misspellings, SpellChecker};
use crate::render::pdf::{content_fill_blocking, CONTENT_FILL_THRESHOLD};
use crate::report::RunReport;
use crate::state::AppState;

/// Loads the inputs, then assembles the renderers and runs.
///
/// Input problems (missing Markdown, no title) are reported before the
/// browser is looked up.
pub async fn execute(config: Config) -> Result<RunReport, AppError> {
    let doc = load_document(&config).await?;
    let state = AppState::build(config).await?;
    run(&state, doc).await
}

pub async fn load_document(config: &Config) -> Result<Document, AppError> {
    let doc = Document::load(&config.input_md, &config.input_css).await?;
    info!(title = %doc.title, "Loaded {}", config.input_md.display());
    Ok(doc)
}

/// Runs the tool on a loaded document and returns the report (written to
/// disk only when `--report` was given).
pub async fn run(state: &AppState, doc: Document) -> Result<RunReport, AppError> {
    let config = &state.config;

    let spelling = SpellChecker::load(&config.word_list, &config.input_dictionary)
        .await
        .map(|checker| warn_on_misspellings(&checker, &doc.markdown));

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| AppError::io(&config.output_dir, e))?;

    let builder = RunReport::builder(doc.title.clone(), config.fit)
        .paths(&config.input_md, &config.output_html)
        .spelling(spelling);

    let report = match state.optimizer() {
        None => {
            let html = state.html.render_at(&doc, config.fit.start_line_height);
            write_html(&config.output_html, &html).await?;
            builder.build()
        }
        Some(optimizer) => {
            if let Some(base) = find_line_height(&doc.css) {
                info!(
                    base = %format_line_height(base),
                    start = %format_line_height(config.fit.start_line_height),
                    "Starting page-fit search"
                );
            }

            let run = optimizer.run(&doc, &config.output_pdf).await?;
            write_html(&config.output_html, &run.html).await?;

            match &run.outcome {
                FitOutcome::Converged { line_height, .. } => info!(
                    "Resume fits on one page at line-height {}",
                    format_line_height(*line_height)
                ),
                FitOutcome::NeverFit { page_count, .. } => warn!(
                    "The generated PDF has {page_count} pages, which exceeds the allowed limit of one page."
                ),
            }
            let fill = check_content_fill(&config.output_pdf).await;
            builder.fit(&run, &config.output_pdf).content_fill(fill).build()
        }
    };

    if let Some(path) = &config.report {
        report.write(path).await?;
    }
    Ok(report)
}

/// Warns when the text on page 1 stops short of the bottom. Advisory: a PDF
/// that cannot be measured only produces a warning.
async fn check_content_fill(pdf: &Path) -> Option<f64> {
    match content_fill_blocking(pdf.to_path_buf()).await {
        Ok(Some(fill)) => {
            if fill < CONTENT_FILL_THRESHOLD {
                warn!(
                    fill_percent = (fill * 100.0).round() as u32,
                    "The content in the generated PDF does not take up at least 90% of the page height."
                );
            }
            Some(fill)
        }
        Ok(None) => {
            warn!("No text found on the first page of {}", pdf.display());
            None
        }
        Err(e) => {
            warn!("Could not measure content height: {e}");
            None
        }
    }
}

async fn write_html(path: &Path, html: &str) -> Result<(), AppError> {
    tokio::fs::write(path, html)
        .await
        .map_err(|e| AppError::io(path, e))?;
    info!("Wrote {}", path.display());
    Ok(())
}
