use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use crate::errors::AppError;
use crate::layout::page_fit::{
    FitConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_START_LINE_HEIGHT, DEFAULT_STEP,
};

/// Command-line interface. Every option can also come from the environment
/// (or a `.env` file), which is read before parsing.
#[derive(Debug, Parser)]
#[command(name = "resume-fit", version, about = "Render a Markdown résumé to HTML and a one-page PDF")]
pub struct Cli {
    /// Markdown input file
    #[arg(long, default_value = "resume.md", env = "RESUME_FIT_INPUT_MD")]
    pub input_md: PathBuf,

    /// CSS input file for styling
    #[arg(long, default_value = "style.css", env = "RESUME_FIT_INPUT_CSS")]
    pub input_css: PathBuf,

    /// File of extra words (one per line) the spell-check should accept
    #[arg(long, default_value = "dictionary.txt", env = "RESUME_FIT_INPUT_DICTIONARY")]
    pub input_dictionary: PathBuf,

    /// Base word list for the spell-check, one word per line. Many minimal
    /// systems and containers do not ship /usr/share/dict/words (Debian and
    /// Ubuntu: `wamerican`; Fedora: `words`); when the file is missing the
    /// spell-check is skipped with a warning.
    #[arg(long, default_value = "/usr/share/dict/words", env = "RESUME_FIT_WORD_LIST")]
    pub word_list: PathBuf,

    /// HTML output file name
    #[arg(long, default_value = "index.html", env = "RESUME_FIT_OUTPUT_HTML")]
    pub output_html: PathBuf,

    /// PDF output file name
    #[arg(long, default_value = "resume.pdf", env = "RESUME_FIT_OUTPUT_PDF")]
    pub output_pdf: PathBuf,

    /// Write outputs to docs/ instead of build/
    #[arg(long, default_value_t = false)]
    pub release: bool,

    /// Chrome or Chromium command for PDF generation (split on whitespace)
    #[arg(long, env = "RESUME_FIT_CHROME_PATH")]
    pub chrome_path: Option<String>,

    /// Line-height the search starts from
    #[arg(long, default_value_t = DEFAULT_START_LINE_HEIGHT, env = "RESUME_FIT_START_LINE_HEIGHT")]
    pub start_line_height: f64,

    /// Line-height increment per iteration
    #[arg(long, default_value_t = DEFAULT_STEP, env = "RESUME_FIT_STEP")]
    pub step: f64,

    /// Give up after this many renders
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS, env = "RESUME_FIT_MAX_ITERATIONS")]
    pub max_iterations: u32,

    /// Per-render browser timeout
    #[arg(long, default_value_t = 60, env = "RESUME_FIT_RENDER_TIMEOUT_SECS")]
    pub render_timeout_secs: u64,

    /// Only write HTML at the starting line-height; no browser, no search
    #[arg(long, default_value_t = false)]
    pub skip_pdf: bool,

    /// Also write a JSON run report to this path
    #[arg(long, env = "RESUME_FIT_REPORT")]
    pub report: Option<PathBuf>,

    /// Log level for this crate when RUST_LOG is unset
    #[arg(long, default_value = "info", env = "RESUME_FIT_LOG")]
    pub rust_log: String,
}

/// Resolved run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub input_md: PathBuf,
    pub input_css: PathBuf,
    pub input_dictionary: PathBuf,
    pub word_list: PathBuf,
    pub output_dir: PathBuf,
    pub output_html: PathBuf,
    pub output_pdf: PathBuf,
    pub chrome_path: Option<String>,
    pub fit: FitConfig,
    pub render_timeout: Duration,
    pub skip_pdf: bool,
    pub report: Option<PathBuf>,
    pub rust_log: String,
}

impl Config {
    /// Loads `.env` if present, then parses the process arguments.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        let config = Self::from_cli(Cli::parse());
        config.validate()?;
        Ok(config)
    }

    pub fn from_cli(cli: Cli) -> Self {
        let output_dir = PathBuf::from(if cli.release { "docs" } else { "build" });
        Config {
            input_md: cli.input_md,
            input_css: cli.input_css,
            input_dictionary: cli.input_dictionary,
            word_list: cli.word_list,
            output_html: output_dir.join(cli.output_html),
            output_pdf: output_dir.join(cli.output_pdf),
            output_dir,
            chrome_path: cli.chrome_path,
            fit: FitConfig {
                start_line_height: cli.start_line_height,
                step: cli.step,
                max_iterations: cli.max_iterations,
            },
            render_timeout: Duration::from_secs(cli.render_timeout_secs),
            skip_pdf: cli.skip_pdf,
            report: cli.report,
            rust_log: cli.rust_log,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.fit.validate()?;
        if self.render_timeout.is_zero() {
            return Err(AppError::Validation(
                "render timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}
