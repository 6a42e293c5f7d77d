//! Headless Chrome "print to PDF".
//!
//! One browser process per call. Each call gets a fresh temporary directory
//! for the browser profile and crash dumps, removed when the call returns, so
//! no profile state leaks between iterations of the fit loop.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::render::browser::BrowserCommand;
use crate::render::pdf::count_pages_blocking;
use crate::render::PdfRenderer;

#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    browser: BrowserCommand,
    timeout: Duration,
}

impl ChromeRenderer {
    pub fn new(browser: BrowserCommand, timeout: Duration) -> Self {
        Self { browser, timeout }
    }
}

#[async_trait]
impl PdfRenderer for ChromeRenderer {
    async fn render(&self, html: &str, output: &Path) -> Result<u32, AppError> {
        let profile = tempfile::tempdir()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to create browser profile dir: {e}")))?;

        // A file left over from an earlier render must never be counted.
        match tokio::fs::remove_file(output).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(AppError::io(output, e)),
        }

        let child = Command::new(&self.browser.program)
            .args(&self.browser.args)
            .args(print_to_pdf_args(profile.path(), output, html))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::RendererFailed {
                status: "spawn failure".to_string(),
                stderr: format!("failed to start {}: {e}", self.browser.display()),
                stdout: String::new(),
            })?;

        let out = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| AppError::RendererTimeout(self.timeout.as_secs()))?
            .map_err(|e| AppError::RendererFailed {
                status: "wait failure".to_string(),
                stderr: e.to_string(),
                stdout: String::new(),
            })?;

        if !out.status.success() {
            return Err(AppError::RendererFailed {
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            });
        }
        if tokio::fs::metadata(output).await.is_err() {
            return Err(AppError::RendererFailed {
                status: format!("{} without writing {}", out.status, output.display()),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            });
        }
        debug!(
            stderr_bytes = out.stderr.len(),
            "Browser finished"
        );
        info!("Wrote {}", output.display());

        // `profile` must outlive the browser; dropping it here removes it.
        let pages = count_pages_blocking(output.to_path_buf()).await;
        drop(profile);
        pages
    }
}

/// Builds the browser flags for one print-to-PDF run.
///
/// The page is passed inline as a base64 `data:` URL so nothing but the
/// output PDF touches the filesystem outside `profile_dir`.
pub(crate) fn print_to_pdf_args(profile_dir: &Path, output: &Path, html: &str) -> Vec<OsString> {
    let mut crash_dumps = OsString::from("--crash-dumps-dir=");
    crash_dumps.push(profile_dir);
    let mut user_data = OsString::from("--user-data-dir=");
    user_data.push(profile_dir);
    let mut print_to = OsString::from("--print-to-pdf=");
    print_to.push(output);

    let mut args: Vec<OsString> = [
        "--no-sandbox",
        "--headless",
        "--print-to-pdf-no-header",
        "--no-pdf-header-footer",
        "--enable-logging=stderr",
        "--log-level=2",
        "--in-process-gpu",
        "--disable-gpu",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.extend([crash_dumps, user_data, print_to]);
    args.push(OsString::from(data_url(html)));
    args
}

pub(crate) fn data_url(html: &str) -> String {
    format!("data:text/html;base64,{}", STANDARD.encode(html.as_bytes()))
}
