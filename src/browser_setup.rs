//! Chrome/Chromium executable detection.
//!
//! Resolution order:
//! 1. An explicitly configured path
//! 2. `CHROME_PATH`, then `CHROME` environment variables
//! 3. Well-known command names in `PATH`
//! 4. Well-known install locations for the current platform

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Result, SearchError};

/// Well-known Chrome/Chromium executable paths per platform.
#[cfg(target_os = "macos")]
const KNOWN_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(all(unix, not(target_os = "macos")))]
const KNOWN_PATHS: &[&str] = &[
    "/opt/google/chrome/chrome",
    "/opt/chromium.org/chromium/chrome",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

#[cfg(windows)]
const KNOWN_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
];

/// Well-known command names to search in PATH.
const KNOWN_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

const ENV_VARS: &[&str] = &["CHROME_PATH", "CHROME"];

/// Detects a Chrome/Chromium installation, reading the process environment.
pub fn detect_chrome(explicit: Option<&Path>) -> Option<PathBuf> {
    detect_chrome_with(explicit, |key| std::env::var(key).ok())
}

/// Like [`detect_chrome`] with an injectable environment lookup.
pub fn detect_chrome_with<F>(explicit: Option<&Path>, lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        if path.exists() {
            debug!("Chrome found at configured path: {}", path.display());
            return Some(path.to_path_buf());
        }
        debug!("Configured Chrome path does not exist: {}", path.display());
    }

    for var in ENV_VARS {
        if let Some(value) = lookup(var) {
            let p = PathBuf::from(&value);
            if p.exists() {
                debug!("Chrome found via {} env var: {}", var, value);
                return Some(p);
            }
        }
    }

    for cmd in KNOWN_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            debug!("Chrome found in PATH: {}", path.display());
            return Some(path);
        }
    }

    KNOWN_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(|p| {
            debug!("Chrome found at known path: {}", p.display());
            p.to_path_buf()
        })
}

/// Resolves the executable or fails with a browser error naming the lookups tried.
pub fn resolve_chrome(explicit: Option<&Path>) -> Result<PathBuf> {
    detect_chrome(explicit).ok_or_else(|| {
        SearchError::Browser(
            "No Chrome/Chromium installation found; set CHROME_PATH or browser.executable_path"
                .to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_known_paths_not_empty() {
        assert!(!KNOWN_PATHS.is_empty());
        assert!(!KNOWN_COMMANDS.is_empty());
    }

    #[test]
    fn test_explicit_path_wins() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let found = detect_chrome_with(Some(file.path()), |_| Some("/nonexistent".to_string()));
        assert_eq!(found.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_env_var_used_when_explicit_missing() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        let found = detect_chrome_with(Some(Path::new("/nonexistent/chrome")), |key| {
            (key == "CHROME").then(|| path.clone())
        });
        assert_eq!(found.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_chrome_path_checked_before_chrome() {
        let first = tempfile::NamedTempFile::new().unwrap();
        let second = tempfile::NamedTempFile::new().unwrap();
        let (a, b) = (
            first.path().to_string_lossy().to_string(),
            second.path().to_string_lossy().to_string(),
        );
        let found = detect_chrome_with(None, |key| match key {
            "CHROME_PATH" => Some(a.clone()),
            "CHROME" => Some(b.clone()),
            _ => None,
        });
        assert_eq!(found.as_deref(), Some(first.path()));
    }

    #[test]
    fn test_detect_without_hints_does_not_panic() {
        // Result depends on the host; only the absence of a panic matters.
        let _ = detect_chrome_with(None, no_env);
    }
}
