//! Chrome sessions over the DevTools protocol
//!
//! Every protocol call is bounded by the configured page timeout so a stuck
//! page surfaces as [`BrowserError::Timeout`] instead of hanging the harvest.

use super::{extract_anchors, BrowserError, BrowsingSession, ContextHandle, SessionFactory};
use crate::config::Config;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// Launch options for Chrome
#[derive(Debug, Clone)]
pub struct ChromeSettings {
    pub headless: bool,
    pub proxy: Option<String>,
    pub user_agent: String,
    pub page_timeout: Duration,
    /// Parent domain auth cookies are set on, e.g. `.example.com`
    pub cookie_domain: Option<String>,
}

impl ChromeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.harvest.headless,
            proxy: config
                .network
                .proxy
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            user_agent: config.api.user_agent.clone(),
            page_timeout: Duration::from_secs(config.harvest.page_timeout_secs),
            cookie_domain: cookie_domain(&config.api.web_url),
        }
    }
}

/// The parent domain of the site address, so cookies reach its API hosts too
fn cookie_domain(web_url: &str) -> Option<String> {
    let url = Url::parse(web_url).ok()?;
    let host = url.host_str()?;
    let parent = host.strip_prefix("www.").unwrap_or(host);
    Some(format!(".{}", parent))
}

/// Launches one Chrome process per session
#[derive(Debug, Clone)]
pub struct ChromeSessionFactory {
    settings: ChromeSettings,
}

impl ChromeSessionFactory {
    pub fn new(settings: ChromeSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.settings.page_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", self.settings.user_agent));

        if !self.settings.headless {
            builder = builder.with_head();
        }

        if let Some(proxy) = &self.settings.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder.build().map_err(BrowserError::Launch)
    }
}

#[async_trait::async_trait]
impl SessionFactory for ChromeSessionFactory {
    async fn open(&self) -> Result<Box<dyn BrowsingSession>, BrowserError> {
        let timeout = self.settings.page_timeout;
        let config = self.browser_config()?;

        let (mut browser, mut handler) =
            bounded(timeout, "browser launch", Browser::launch(config)).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match bounded(timeout, "page creation", browser.new_page("about:blank")).await
        {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    tracing::warn!("Failed to close browser after setup error: {}", close_err);
                }
                handler.abort();
                return Err(e);
            }
        };

        tracing::debug!("Chrome session opened (headless: {})", self.settings.headless);

        Ok(Box::new(ChromeSession {
            browser,
            handler,
            page,
            contexts: HashMap::new(),
            next_context: 0,
            timeout,
            cookie_domain: self.settings.cookie_domain.clone(),
        }))
    }
}

/// One running Chrome instance with its primary page and open secondary tabs
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    contexts: HashMap<u64, Page>,
    next_context: u64,
    timeout: Duration,
    cookie_domain: Option<String>,
}

async fn bounded<T, F>(timeout: Duration, operation: &'static str, fut: F) -> Result<T, BrowserError>
where
    F: Future<Output = Result<T, CdpError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(BrowserError::from),
        Err(_) => Err(BrowserError::Timeout {
            operation,
            secs: timeout.as_secs(),
        }),
    }
}

/// Splits a `name=value; name2=value2` cookie string
fn parse_cookie_pairs(cookies: &str) -> Vec<(String, String)> {
    cookies
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Builds one cookie per pair, scoped to `domain` when known and to
/// `address` otherwise
fn cookie_params(
    pairs: Vec<(String, String)>,
    domain: Option<&str>,
    address: &str,
) -> Result<Vec<CookieParam>, BrowserError> {
    pairs
        .into_iter()
        .map(|(name, value)| {
            let builder = CookieParam::builder().name(name).value(value).path("/");
            let builder = match domain {
                Some(domain) => builder.domain(domain),
                None => builder.url(address),
            };
            builder.build().map_err(BrowserError::Script)
        })
        .collect()
}

/// Closes a tracked context and forgets it once the close went through
///
/// A context whose close fails stays tracked so `quit` can retry it.
async fn close_tracked<P, F, Fut>(
    contexts: &mut HashMap<u64, P>,
    handle: ContextHandle,
    close: F,
) -> Result<(), BrowserError>
where
    P: Clone,
    F: FnOnce(P) -> Fut,
    Fut: Future<Output = Result<(), BrowserError>>,
{
    let context = contexts
        .get(&handle.0)
        .cloned()
        .ok_or(BrowserError::UnknownContext(handle))?;

    close(context).await?;
    contexts.remove(&handle.0);
    Ok(())
}

impl ChromeSession {
    async fn current_url(&self, page: &Page) -> Result<Option<String>, BrowserError> {
        bounded(self.timeout, "address read", page.url()).await
    }
}

#[async_trait::async_trait]
impl BrowsingSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        bounded(self.timeout, "navigation", self.page.goto(url)).await?;
        Ok(())
    }

    async fn inject_auth(&mut self, cookies: &str) -> Result<(), BrowserError> {
        let pairs = parse_cookie_pairs(cookies);
        if pairs.is_empty() {
            return Ok(());
        }

        let address = self
            .current_url(&self.page)
            .await?
            .ok_or_else(|| BrowserError::Script("primary page has no address".to_string()))?;

        let params = cookie_params(pairs, self.cookie_domain.as_deref(), &address)?;

        bounded(self.timeout, "cookie injection", self.page.set_cookies(params)).await?;
        bounded(self.timeout, "reload", self.page.reload()).await?;
        Ok(())
    }

    async fn query_anchors(&mut self, selector: &str) -> Result<Vec<String>, BrowserError> {
        let html = bounded(self.timeout, "content read", self.page.content()).await?;
        let address = self
            .current_url(&self.page)
            .await?
            .ok_or_else(|| BrowserError::Script("primary page has no address".to_string()))?;
        let base = Url::parse(&address).map_err(|e| BrowserError::Script(e.to_string()))?;

        extract_anchors(&html, &base, selector)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        bounded(
            self.timeout,
            "scroll",
            self.page
                .evaluate("window.scrollTo(0, document.body.scrollHeight)"),
        )
        .await?;
        Ok(())
    }

    async fn read_size_signal(&mut self) -> Result<u64, BrowserError> {
        let result = bounded(
            self.timeout,
            "size read",
            self.page.evaluate("document.body.scrollHeight"),
        )
        .await?;

        result
            .into_value::<u64>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn open_in_background(&mut self, url: &str) -> Result<ContextHandle, BrowserError> {
        let page = bounded(self.timeout, "tab open", self.browser.new_page(url)).await?;

        self.next_context += 1;
        self.contexts.insert(self.next_context, page);
        Ok(ContextHandle(self.next_context))
    }

    async fn read_current_address(
        &mut self,
        handle: ContextHandle,
    ) -> Result<String, BrowserError> {
        let page = self
            .contexts
            .get(&handle.0)
            .ok_or(BrowserError::UnknownContext(handle))?;

        self.current_url(page)
            .await?
            .ok_or_else(|| BrowserError::Script("context has no address".to_string()))
    }

    async fn close(&mut self, handle: ContextHandle) -> Result<(), BrowserError> {
        let timeout = self.timeout;
        close_tracked(&mut self.contexts, handle, |page: Page| {
            bounded(timeout, "tab close", page.close())
        })
        .await
    }

    async fn quit(self: Box<Self>) -> Result<(), BrowserError> {
        let ChromeSession {
            mut browser,
            handler,
            contexts,
            timeout,
            ..
        } = *self;

        for (_, page) in contexts {
            if let Err(e) = bounded(timeout, "tab close", page.close()).await {
                tracing::debug!("Failed to close leftover tab: {}", e);
            }
        }

        let closed = bounded(timeout, "browser close", browser.close()).await;
        if closed.is_ok() {
            if let Err(e) = browser.wait().await {
                tracing::debug!("Browser process did not exit cleanly: {}", e);
            }
        }
        handler.abort();

        closed.map(|_| ())
    }
}
