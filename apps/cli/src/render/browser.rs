//! Locating a Chrome/Chromium executable.
//!
//! Resolution order: explicit command, well-known install paths, Flatpak.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::AppError;

/// Well-known Linux install locations, probed in order.
pub const COMMON_BROWSER_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome-beta",
    "/usr/bin/google-chrome-unstable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/local/bin/google-chrome",
    "/usr/local/bin/google-chrome-stable",
    "/usr/local/bin/google-chrome-beta",
    "/usr/local/bin/google-chrome-unstable",
    "/usr/local/bin/chromium",
    "/usr/local/bin/chromium-browser",
    "/opt/google/chrome/chrome",
    "/opt/google/chrome-beta/chrome",
    "/opt/google/chrome-unstable/chrome",
    "/snap/bin/chromium",
    "/snap/bin/google-chrome",
    "/snap/bin/google-chrome-stable",
    "/snap/bin/google-chrome-beta",
    "/snap/bin/google-chrome-unstable",
];

/// Flatpak application ids, in preference order.
const FLATPAK_APPS: &[&str] = &["com.google.Chrome", "org.chromium.Chromium"];

/// A browser invocation: program plus any leading arguments
/// (e.g. `flatpak run com.google.Chrome`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl BrowserCommand {
    /// Splits a user-supplied command line on whitespace.
    pub fn parse(command: &str) -> Result<Self, AppError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| AppError::Validation("browser command is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Uses `explicit` when given, otherwise probes the system.
    pub async fn resolve(explicit: Option<&str>) -> Result<Self, AppError> {
        if let Some(command) = explicit {
            let cmd = Self::parse(command)?;
            info!(program = %cmd.program, "Using configured browser");
            return Ok(cmd);
        }

        if let Some(path) = probe_paths(COMMON_BROWSER_PATHS) {
            info!(program = %path, "Found browser");
            return Ok(Self {
                program: path.to_string(),
                args: vec![],
            });
        }

        if let Some(output) = flatpak_list().await {
            if let Some(cmd) = from_flatpak_list(&output) {
                info!(command = %cmd.display(), "Found Flatpak browser");
                return Ok(cmd);
            }
        }

        Err(AppError::BrowserNotFound(
            "Chrome or Chromium browser not found. Please ensure it is installed.".to_string(),
        ))
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Returns the first candidate that is an executable regular file.
pub(crate) fn probe_paths<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|p| is_executable(Path::new(p)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Runs `flatpak list`. `None` when flatpak itself is unavailable.
async fn flatpak_list() -> Option<String> {
    match Command::new("flatpak")
        .arg("list")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
    {
        Ok(out) => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
        Err(e) => {
            debug!("flatpak not available: {e}");
            None
        }
    }
}

pub(crate) fn from_flatpak_list(output: &str) -> Option<BrowserCommand> {
    FLATPAK_APPS
        .iter()
        .find(|app| output.contains(*app))
        .map(|app| BrowserCommand {
            program: "flatpak".to_string(),
            args: vec!["run".to_string(), app.to_string()],
        })
}
