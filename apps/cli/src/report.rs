//! JSON run report, written when `--report` is given.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::layout::page_fit::Candidate;
use crate::layout::{FitConfig, FitOutcome, FitRun};
use crate::proofing::SpellingReport;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub title: String,
    pub input_md: PathBuf,
    pub output_html: PathBuf,
    pub output_pdf: Option<PathBuf>,
    pub fit_config: FitConfig,
    /// `None` in HTML-only mode.
    pub outcome: Option<FitOutcome>,
    pub final_line_height: f64,
    pub candidates: Vec<Candidate>,
    pub revalidated_pages: Option<u32>,
    /// How far down page 1 the text reaches (0.0..=1.0); `None` when unmeasured.
    pub content_fill: Option<f64>,
    pub spelling: Option<SpellingReport>,
}

impl RunReport {
    pub fn builder(title: impl Into<String>, fit_config: FitConfig) -> RunReportBuilder {
        RunReportBuilder {
            report: RunReport {
                generated_at: Utc::now(),
                title: title.into(),
                input_md: PathBuf::new(),
                output_html: PathBuf::new(),
                output_pdf: None,
                fit_config,
                outcome: None,
                final_line_height: fit_config.start_line_height,
                candidates: vec![],
                revalidated_pages: None,
                content_fill: None,
                spelling: None,
            },
        }
    }

    pub async fn write(&self, path: &Path) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serialize report: {e}")))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| AppError::io(path, e))?;
        info!("Wrote {}", path.display());
        Ok(())
    }
}

pub struct RunReportBuilder {
    report: RunReport,
}

impl RunReportBuilder {
    pub fn paths(mut self, input_md: &Path, output_html: &Path) -> Self {
        self.report.input_md = input_md.to_path_buf();
        self.report.output_html = output_html.to_path_buf();
        self
    }

    pub fn fit(mut self, run: &FitRun, output_pdf: &Path) -> Self {
        self.report.output_pdf = Some(output_pdf.to_path_buf());
        self.report.outcome = Some(run.outcome.clone());
        self.report.final_line_height = run.outcome.line_height();
        self.report.candidates = run.candidates.clone();
        self.report.revalidated_pages = run.revalidated_pages;
        self
    }

    pub fn content_fill(mut self, fill: Option<f64>) -> Self {
        self.report.content_fill = fill;
        self
    }

    pub fn spelling(mut self, spelling: Option<SpellingReport>) -> Self {
        self.report.spelling = spelling;
        self
    }

    pub fn build(self) -> RunReport {
        self.report
    }
}
