//! WebDriver-backed page
//!
//! Drives Chrome or Firefox through a running chromedriver/geckodriver using
//! fantoccini. Console output is captured by an injected script because the
//! W3C protocol has no log endpoint.

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    BrowserError, BrowserResult, ConsoleMessage, NetworkEntry, Page, PageFactory, Selector,
};
use crate::config::{AppConfig, BrowserKind, BrowserSettings};

const CONSOLE_CAPTURE_SCRIPT: &str = r#"
(function() {
    if (window.__e2e_console) return;
    window.__e2e_console = [];
    ['log', 'info', 'warn', 'error', 'debug'].forEach(function(level) {
        var original = console[level];
        console[level] = function() {
            try {
                var parts = Array.prototype.map.call(arguments, function(arg) {
                    if (typeof arg === 'object') {
                        try { return JSON.stringify(arg); } catch (e) { return String(arg); }
                    }
                    return String(arg);
                });
                window.__e2e_console.push({
                    level: level,
                    message: parts.join(' '),
                    timestamp: new Date().toISOString()
                });
                if (window.__e2e_console.length > 1000) window.__e2e_console.shift();
            } catch (e) {}
            return original.apply(console, arguments);
        };
    });
    window.addEventListener('error', function(event) {
        window.__e2e_console.push({
            level: 'error',
            message: 'Uncaught ' + (event.error || event.message),
            timestamp: new Date().toISOString()
        });
    });
})();
"#;

const DRAIN_CONSOLE_SCRIPT: &str =
    "var logs = window.__e2e_console || []; window.__e2e_console = []; return logs;";

const NETWORK_SCRIPT: &str = r#"
return performance.getEntriesByType('resource').map(function(e) {
    return {
        name: e.name,
        initiatorType: e.initiatorType,
        durationMs: e.duration,
        transferSize: e.transferSize || 0,
        startTimeMs: e.startTime
    };
});
"#;

impl Selector {
    fn locator(&self) -> Locator<'_> {
        match self {
            Selector::Css(css) => Locator::Css(css),
            Selector::XPath(xpath) => Locator::XPath(xpath),
        }
    }
}

/// Opens [`WebDriverPage`]s using the configured browser settings
pub struct WebDriverFactory {
    webdriver_url: String,
    settings: BrowserSettings,
    page_load_timeout: Duration,
}

impl WebDriverFactory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            settings: config.browser.clone(),
            page_load_timeout: config.timeouts.page_load(),
        }
    }
}

#[async_trait]
impl PageFactory for WebDriverFactory {
    async fn open(&self) -> BrowserResult<Arc<dyn Page>> {
        let page =
            WebDriverPage::connect(&self.webdriver_url, &self.settings, self.page_load_timeout)
                .await?;
        Ok(Arc::new(page))
    }
}

/// A browser session behind a WebDriver endpoint
pub struct WebDriverPage {
    client: Client,
    slow_mo: Duration,
    console: Mutex<Vec<ConsoleMessage>>,
    closed: AtomicBool,
}

impl WebDriverPage {
    pub async fn connect(
        webdriver_url: &str,
        settings: &BrowserSettings,
        page_load_timeout: Duration,
    ) -> BrowserResult<Self> {
        info!(
            "Connecting to {} WebDriver at {} (headless: {})",
            settings.browser, webdriver_url, settings.headless
        );

        let client = ClientBuilder::native()
            .capabilities(capabilities(settings))
            .connect(webdriver_url)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let timeouts = TimeoutConfiguration::new(None, Some(page_load_timeout), None);
        if let Err(e) = client.update_timeouts(timeouts).await {
            debug!("Could not set page load timeout: {}", e);
        }

        if let Err(e) = client
            .set_window_size(settings.viewport.width, settings.viewport.height)
            .await
        {
            debug!("Could not set window size: {}", e);
        }

        Ok(Self {
            client,
            slow_mo: Duration::from_millis(settings.slow_mo),
            console: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    async fn pace(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }

    fn ensure_open(&self) -> BrowserResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BrowserError::SessionClosed)
        } else {
            Ok(())
        }
    }

    async fn visible_elements(&self, selector: &Selector) -> BrowserResult<Vec<Element>> {
        self.ensure_open()?;
        let mut visible = Vec::new();
        for element in self.client.find_all(selector.locator()).await? {
            // Stale elements count as hidden
            if element.is_displayed().await.unwrap_or(false) {
                visible.push(element);
            }
        }
        Ok(visible)
    }

    async fn first_visible(&self, selector: &Selector) -> BrowserResult<Element> {
        self.visible_elements(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::not_found(selector))
    }

    async fn drain_console(&self) {
        match self.client.execute(DRAIN_CONSOLE_SCRIPT, vec![]).await {
            Ok(value) => {
                if let Ok(messages) = serde_json::from_value::<Vec<ConsoleMessage>>(value) {
                    if let Ok(mut buffer) = self.console.lock() {
                        buffer.extend(messages);
                    }
                }
            }
            Err(e) => debug!("Console drain failed: {}", e),
        }
    }
}

fn capabilities(settings: &BrowserSettings) -> serde_json::Map<String, serde_json::Value> {
    let mut caps = serde_json::Map::new();
    let mut args = settings.args.clone();

    match settings.browser {
        BrowserKind::Chrome => {
            args.push("--no-sandbox".to_string());
            if settings.headless {
                args.push("--headless=new".to_string());
                args.push("--disable-gpu".to_string());
                args.push("--disable-dev-shm-usage".to_string());
            }
            args.push(format!(
                "--window-size={},{}",
                settings.viewport.width, settings.viewport.height
            ));
            caps.insert("browserName".to_string(), json!("chrome"));
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        }
        BrowserKind::Firefox => {
            if settings.headless {
                args.push("--headless".to_string());
            }
            args.push(format!("--width={}", settings.viewport.width));
            args.push(format!("--height={}", settings.viewport.height));
            caps.insert("browserName".to_string(), json!("firefox"));
            caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
        }
    }

    caps
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        self.ensure_open()?;
        self.drain_console().await;
        debug!("Navigating to {}", url);
        self.client.goto(url).await?;
        if let Err(e) = self.client.execute(CONSOLE_CAPTURE_SCRIPT, vec![]).await {
            debug!("Console capture not installed: {}", e);
        }
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        self.ensure_open()?;
        Ok(self.client.current_url().await?.to_string())
    }

    async fn title(&self) -> BrowserResult<String> {
        self.ensure_open()?;
        Ok(self.client.title().await?)
    }

    async fn count_visible(&self, selector: &Selector) -> BrowserResult<usize> {
        Ok(self.visible_elements(selector).await?.len())
    }

    async fn click(&self, selector: &Selector) -> BrowserResult<()> {
        self.pace().await;
        let element = self.first_visible(selector).await?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, selector: &Selector, value: &str) -> BrowserResult<()> {
        self.pace().await;
        let element = self.first_visible(selector).await?;
        element.clear().await?;
        element.send_keys(value).await?;
        Ok(())
    }

    async fn upload(&self, selector: &Selector, path: &Path) -> BrowserResult<()> {
        self.pace().await;
        self.ensure_open()?;
        let element = self
            .client
            .find_all(selector.locator())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::not_found(selector))?;
        // File inputs take the absolute path as typed keys
        element.send_keys(&path.to_string_lossy()).await?;
        Ok(())
    }

    async fn texts(&self, selector: &Selector) -> BrowserResult<Vec<String>> {
        let mut texts = Vec::new();
        for element in self.visible_elements(selector).await? {
            texts.push(element.text().await?);
        }
        Ok(texts)
    }

    async fn row_cells(&self, rows: &Selector) -> BrowserResult<Vec<Vec<String>>> {
        let mut table = Vec::new();
        for row in self.visible_elements(rows).await? {
            let mut cells = Vec::new();
            for cell in row.find_all(Locator::Css("td")).await? {
                cells.push(cell.text().await?);
            }
            table.push(cells);
        }
        Ok(table)
    }

    async fn body_text(&self) -> BrowserResult<String> {
        self.ensure_open()?;
        let value = self
            .client
            .execute("return document.body ? document.body.innerText : '';", vec![])
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn content(&self) -> BrowserResult<String> {
        self.ensure_open()?;
        Ok(self.client.source().await?)
    }

    async fn screenshot(&self) -> BrowserResult<Vec<u8>> {
        self.ensure_open()?;
        Ok(self.client.screenshot().await?)
    }

    async fn console_messages(&self) -> BrowserResult<Vec<ConsoleMessage>> {
        self.ensure_open()?;
        self.drain_console().await;
        self.console
            .lock()
            .map(|buffer| buffer.clone())
            .map_err(|_| BrowserError::Driver("console buffer poisoned".to_string()))
    }

    async fn network_entries(&self) -> BrowserResult<Vec<NetworkEntry>> {
        self.ensure_open()?;
        let value = self.client.execute(NETWORK_SCRIPT, vec![]).await?;
        serde_json::from_value(value)
            .map_err(|e| BrowserError::Driver(format!("malformed resource timing data: {e}")))
    }

    async fn is_closed(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return true;
        }
        match self.client.windows().await {
            Ok(windows) => windows.is_empty(),
            Err(e) => {
                warn!("Browser window probe failed: {}", e);
                true
            }
        }
    }

    async fn close(&self) -> BrowserResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.client.clone().close().await?;
        Ok(())
    }
}
