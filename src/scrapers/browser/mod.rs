//! Headless Chromium page fetcher for script-rendered pages.
//!
//! Uses chromiumoxide (CDP). A page is considered loaded once the document
//! reports ready and the number of loaded resources stops growing.

use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "browser")]
use anyhow::Context;
use async_trait::async_trait;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

use super::fetcher::{FetchError, FetchedPage, PageFetcher};

/// Browser launch options.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    /// Explicit Chrome binary. Common install locations are searched when unset.
    pub chrome_path: Option<PathBuf>,
    /// Bound on navigation and on each wait phase.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            timeout: Duration::from_secs(60),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
        }
    }
}

/// JavaScript to wait for page ready state.
#[cfg(feature = "browser")]
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete') {
            resolve(document.readyState);
        } else {
            window.addEventListener('load', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// JavaScript returning how many resources the page has loaded so far.
#[cfg(feature = "browser")]
const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

/// Interval between resource-count samples.
#[cfg(feature = "browser")]
const SETTLE_POLL: Duration = Duration::from_millis(500);

/// Consecutive unchanged samples that count as quiet.
#[cfg(feature = "browser")]
const SETTLE_STABLE_SAMPLES: u32 = 2;

/// Browser-based [`PageFetcher`].
#[cfg(feature = "browser")]
pub struct BrowserFetcher {
    options: BrowserOptions,
    browser: Mutex<Option<Browser>>,
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    /// Create a fetcher. The browser is launched on first use.
    pub fn new(options: BrowserOptions) -> Result<Self, FetchError> {
        Ok(Self {
            options,
            browser: Mutex::new(None),
        })
    }

    fn find_chrome(&self) -> anyhow::Result<PathBuf> {
        if let Some(ref path) = self.options.chrome_path {
            return Ok(path.clone());
        }

        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        info!("Found Chrome in PATH: {}", path);
                        return Ok(PathBuf::from(path));
                    }
                }
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found. Install it or set its path explicitly."
        ))
    }

    async fn launch(&self) -> anyhow::Result<Browser> {
        info!("Launching browser (headless={})", self.options.headless);

        let mut builder = BrowserConfig::builder().chrome_executable(self.find_chrome()?);
        // with_head means NOT headless
        if !self.options.headless {
            builder = builder.with_head();
        }
        let config = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    async fn open_page(&self) -> anyhow::Result<Page> {
        let mut guard = self.browser.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let browser = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("browser not initialized after launch"))?;
        Ok(browser.new_page("about:blank").await?)
    }

    async fn load(&self, page: &Page, url: &str) -> anyhow::Result<FetchedPage> {
        page.execute(SetUserAgentOverrideParams::new(
            self.options.user_agent.clone(),
        ))
        .await?;

        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid URL: {}", e))?;
        tokio::time::timeout(self.options.timeout, page.execute(nav_params))
            .await
            .map_err(|_| anyhow::anyhow!("Navigation timed out for {}", url))?
            .map_err(|e| anyhow::anyhow!("Navigation failed for {}: {}", url, e))?;

        self.wait_for_ready(page).await;
        self.wait_for_quiet_network(page).await;

        let final_url = page
            .url()
            .await?
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());
        let body = page.content().await?;

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status: 200,
            body,
        })
    }

    async fn wait_for_ready(&self, page: &Page) {
        match tokio::time::timeout(
            self.options.timeout,
            page.evaluate(WAIT_FOR_READY_SCRIPT.to_string()),
        )
        .await
        {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state"),
        }
    }

    /// Poll the resource count until it holds steady.
    async fn wait_for_quiet_network(&self, page: &Page) {
        let deadline = tokio::time::Instant::now() + self.options.timeout;
        let mut last: Option<u64> = None;
        let mut stable = 0;

        while tokio::time::Instant::now() < deadline {
            let count = match page.evaluate(RESOURCE_COUNT_SCRIPT.to_string()).await {
                Ok(result) => result.into_value::<u64>().ok(),
                Err(e) => {
                    debug!("Resource count unavailable: {}", e);
                    return;
                }
            };

            if count.is_some() && count == last {
                stable += 1;
                if stable >= SETTLE_STABLE_SAMPLES {
                    debug!("Network quiet after {:?} resources", count);
                    return;
                }
            } else {
                stable = 0;
                last = count;
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
        warn!("Network did not settle before timeout");
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let transport = |e: anyhow::Error| FetchError::Transport {
            url: url.to_string(),
            message: format!("{e:#}"),
        };

        let page = self.open_page().await.map_err(transport)?;
        // Always close the tab, even when loading failed.
        let result = self.load(&page, url).await;
        let _ = page.close().await;
        result.map_err(transport)
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

/// Stand-in used when the `browser` feature is disabled.
#[cfg(not(feature = "browser"))]
pub struct BrowserFetcher {
    _options: BrowserOptions,
}

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub fn new(_options: BrowserOptions) -> Result<Self, FetchError> {
        Err(FetchError::Unavailable(
            "browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchedPage, FetchError> {
        Err(FetchError::Unavailable(
            "browser support not compiled".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
