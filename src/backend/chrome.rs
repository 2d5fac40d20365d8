//! Full-layout backend: print through headless Chromium.
//!
//! One browser process is launched on first use and shared by every
//! conversion; each document gets its own tab. If the browser dies, the next
//! render relaunches it.
//!
//! The composed HTML is written to a temp file and loaded via `file://`
//! (large documents are unreliable as data URLs). Before printing, the tab
//! waits for navigation and for `document.fonts.ready`.

use super::PdfBackend;
use crate::config::MarginConfig;
use crate::error::BackendError;
use crate::pipeline::compose::ComposedDocument;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A4 in inches.
const PAPER_INCHES: (f64, f64) = (8.27, 11.69);

/// Per-tab timeout for navigation and script evaluation.
const TAB_TIMEOUT: Duration = Duration::from_secs(30);

/// Keep the shared browser alive between batches.
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

pub struct ChromeBackend {
    browser: Mutex<Option<Arc<Browser>>>,
}

impl std::fmt::Debug for ChromeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let launched = self.browser.lock().map(|b| b.is_some()).unwrap_or(false);
        f.debug_struct("ChromeBackend")
            .field("launched", &launched)
            .finish()
    }
}

impl Default for ChromeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromeBackend {
    /// Create the backend. Chromium is not started until the first render.
    pub fn new() -> Self {
        Self {
            browser: Mutex::new(None),
        }
    }

    fn browser(&self) -> Result<Arc<Browser>, BackendError> {
        let mut guard = self
            .browser
            .lock()
            .map_err(|_| BackendError::new("browser lock poisoned"))?;
        if let Some(browser) = guard.as_ref() {
            return Ok(Arc::clone(browser));
        }

        info!("Launching headless Chromium");
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .idle_browser_timeout(IDLE_TIMEOUT)
            .build()
            .map_err(|e| BackendError::new(format!("Failed to build launch options: {e}")))?;
        let browser = Browser::new(options)
            .map_err(|e| BackendError::new(format!("Failed to launch browser: {e}")))?;
        let browser = Arc::new(browser);
        *guard = Some(Arc::clone(&browser));
        Ok(browser)
    }

    /// Drop the shared browser so the next render launches a fresh one.
    fn reset(&self) {
        if let Ok(mut guard) = self.browser.lock() {
            if guard.take().is_some() {
                warn!("Discarding headless Chromium after a failure; it will be relaunched");
            }
        }
    }

    fn open_tab(&self) -> Result<Arc<Tab>, BackendError> {
        match self.browser()?.new_tab() {
            Ok(tab) => Ok(tab),
            Err(first) => {
                // The browser may have exited between renders; retry once.
                debug!("new_tab failed ({first}), relaunching browser");
                self.reset();
                self.browser()?
                    .new_tab()
                    .map_err(|e| BackendError::new(format!("Failed to create new tab: {e}")))
            }
        }
    }
}

fn print_options(margin: MarginConfig) -> PrintToPdfOptions {
    let [top, right, bottom, left] = margin.to_inches();
    PrintToPdfOptions {
        landscape: Some(false),
        display_header_footer: Some(false),
        print_background: Some(true),
        scale: Some(1.0),
        paper_width: Some(PAPER_INCHES.0),
        paper_height: Some(PAPER_INCHES.1),
        margin_top: Some(top),
        margin_right: Some(right),
        margin_bottom: Some(bottom),
        margin_left: Some(left),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}

/// Percent-encoded `file://` URL for a temp file.
fn file_url(path: &Path) -> Result<String, BackendError> {
    reqwest::Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| BackendError::new(format!("Not an absolute path: {}", path.display())))
}

fn print_in_tab(tab: &Tab, url: &str, margin: MarginConfig) -> Result<Vec<u8>, BackendError> {
    tab.set_default_timeout(TAB_TIMEOUT);
    tab.navigate_to(url)
        .map_err(|e| BackendError::new(format!("Failed to navigate: {e}")))?;
    tab.wait_until_navigated()
        .map_err(|e| BackendError::new(format!("Failed to wait for navigation: {e}")))?;
    tab.evaluate("document.fonts.ready.then(() => document.readyState)", true)
        .map_err(|e| BackendError::new(format!("Failed waiting for fonts: {e}")))?;
    tab.print_to_pdf(Some(print_options(margin)))
        .map_err(|e| BackendError::new(format!("Failed to generate PDF: {e}")))
}

impl PdfBackend for ChromeBackend {
    fn name(&self) -> &'static str {
        "chrome"
    }

    fn render_pdf(
        &self,
        doc: &ComposedDocument,
        margin: MarginConfig,
    ) -> Result<Vec<u8>, BackendError> {
        let mut html_file = tempfile::Builder::new()
            .prefix("md2pdf-")
            .suffix(".html")
            .tempfile()
            .map_err(|e| BackendError::new(format!("Failed to create temp HTML file: {e}")))?;
        html_file
            .write_all(doc.as_str().as_bytes())
            .and_then(|()| html_file.flush())
            .map_err(|e| BackendError::new(format!("Failed to write temp HTML file: {e}")))?;
        let url = file_url(html_file.path())?;

        let tab = self.open_tab()?;
        let result = print_in_tab(&tab, &url, margin);
        if let Err(e) = tab.close(true) {
            debug!("Failed to close tab: {e}");
        }

        match result {
            Ok(bytes) => {
                debug!("Chromium printed {} bytes (margin {margin})", bytes.len());
                Ok(bytes)
            }
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
        // `html_file` is removed on drop.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_options_carry_margins_in_inches() {
        let opts = print_options(MarginConfig::new(254, 0, 127, 0));
        assert_eq!(opts.paper_width, Some(8.27));
        assert_eq!(opts.paper_height, Some(11.69));
        assert!((opts.margin_top.unwrap() - 10.0).abs() < 1e-9);
        assert!((opts.margin_bottom.unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(opts.margin_left, Some(0.0));
        assert_eq!(opts.print_background, Some(true));
        assert_eq!(opts.prefer_css_page_size, Some(false));
        assert_eq!(opts.display_header_footer, Some(false));
    }

    #[cfg(unix)]
    #[test]
    fn file_url_encodes_awkward_temp_dirs() {
        let url = file_url(Path::new("/tmp/my docs/#1 100%/md2pdf-x.html")).unwrap();
        assert_eq!(url, "file:///tmp/my%20docs/%231%20100%25/md2pdf-x.html");
        assert!(file_url(Path::new("relative.html")).is_err());
    }

    #[test]
    fn browser_is_launched_lazily() {
        let backend = ChromeBackend::new();
        assert!(format!("{backend:?}").contains("launched: false"));
    }
}
