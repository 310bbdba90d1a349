//! Browser session bootstrap for the search flow
//!
//! Owns the Chrome process, its CDP handler task and the temporary profile
//! directory. `shutdown()` must run on every exit path.

use anyhow::{Context, Result, bail};
use chromiumoxide::Browser;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::CAPTCHA_MARKERS;
use crate::browser_profile::create_unique_profile;
use crate::browser_setup::{apply_stealth_measures, launch_browser};
use crate::config::LocateConfig;
use crate::crawl_engine::cleanup::{CleanupResult, cleanup_browser_and_data};
use crate::error::{LocateError, LocateResult};
use crate::page::{ChromiumPage, SearchPage};

/// Whether a page URL is the provider's bot check
#[must_use]
pub fn is_captcha_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    CAPTCHA_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A running browser with one page parked on the search root
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
    page: ChromiumPage,
}

impl BrowserSession {
    /// Launch the browser, carry over HTTP cookies and load `search_url`
    ///
    /// On any failure the browser and profile are torn down before the
    /// error is returned.
    pub async fn open(
        config: &LocateConfig,
        search_url: &str,
        client: &reqwest::Client,
    ) -> LocateResult<Self> {
        let profile = create_unique_profile(config.chrome_data_dir().map(PathBuf::as_path))
            .map_err(|e| LocateError::Session(format!("{e:#}")))?;
        let profile_dir = profile.into_path();

        let (browser, handler) = match launch_browser(
            config.headless(),
            profile_dir.clone(),
            Duration::from_secs(config.navigation_timeout_secs()),
        )
        .await
        {
            Ok(launched) => launched,
            Err(e) => {
                if let Err(rm) = std::fs::remove_dir_all(&profile_dir) {
                    warn!("Failed to remove profile {}: {rm}", profile_dir.display());
                }
                return Err(LocateError::Session(format!("{e:#}")));
            }
        };
        info!("Browser launched");

        match bootstrap_page(&browser, config, search_url, client).await {
            Ok(page) => Ok(Self {
                browser,
                handler,
                profile_dir,
                page,
            }),
            Err(e) => {
                if let CleanupResult::PartialFailure(errors) =
                    cleanup_browser_and_data(browser, handler, Some(profile_dir)).await
                {
                    warn!("Cleanup after failed bootstrap was incomplete: {errors:?}");
                }
                Err(LocateError::Session(format!("{e:#}")))
            }
        }
    }

    #[must_use]
    pub fn page(&self) -> &ChromiumPage {
        &self.page
    }

    /// Close the browser and remove its profile
    pub async fn shutdown(self) -> CleanupResult {
        let result =
            cleanup_browser_and_data(self.browser, self.handler, Some(self.profile_dir)).await;
        match &result {
            CleanupResult::Success => debug!("Browser session closed"),
            CleanupResult::PartialFailure(errors) => {
                warn!("Browser session cleanup incomplete: {errors:?}");
            }
        }
        result
    }
}

async fn bootstrap_page(
    browser: &Browser,
    config: &LocateConfig,
    search_url: &str,
    client: &reqwest::Client,
) -> Result<ChromiumPage> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("Failed to open browser page")?;

    apply_stealth_measures(&page).await?;

    if let Err(e) = transfer_cookies(&page, client, search_url).await {
        warn!("Continuing without provider cookies: {e:#}");
    }

    let page = ChromiumPage::new(
        page,
        config.navigation_timeout_secs(),
        config.idle_timeout_secs(),
    );

    page.navigate(search_url)
        .await
        .with_context(|| format!("Failed to load {search_url}"))?;
    if let Err(e) = page.wait_for_network_idle().await {
        if e.is_session_closed() {
            return Err(e).context("Browser closed while loading the search page");
        }
        warn!("Search page did not settle: {e}");
    }

    let landed = page.current_url().await;
    if is_captcha_url(&landed) {
        bail!("Provider answered with a captcha page ({landed})");
    }

    Ok(page)
}

/// Fetch `url` over plain HTTP and copy the cookies it sets into the page
async fn transfer_cookies(
    page: &chromiumoxide::Page,
    client: &reqwest::Client,
    url: &str,
) -> Result<()> {
    let response = client
        .get(url)
        .send()
        .await
        .context("Cookie bootstrap request failed")?;

    let fallback_domain = response
        .url()
        .host_str()
        .map(str::to_string)
        .unwrap_or_default();

    let mut transferred = 0usize;
    for cookie in response.cookies() {
        let domain = cookie
            .domain()
            .map_or_else(|| fallback_domain.clone(), str::to_string);
        if cookie.name().is_empty() || domain.is_empty() {
            continue;
        }

        let cookie_param = CookieParam::builder()
            .name(cookie.name())
            .value(cookie.value())
            .domain(domain)
            .build();

        match cookie_param {
            Ok(param) => {
                if let Err(e) = page.set_cookie(param).await {
                    warn!("Failed to set cookie {}: {}", cookie.name(), e);
                } else {
                    transferred += 1;
                }
            }
            Err(e) => {
                warn!("Failed to build cookie {}: {}", cookie.name(), e);
            }
        }
    }

    debug!("Transferred {transferred} cookies into the browser");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captcha_pages_are_recognised() {
        assert!(is_captcha_url("https://yandex.com/showcaptcha?cc=1&retpath=x"));
        assert!(is_captcha_url("https://yandex.com/CAPTCHA/check"));
        assert!(!is_captcha_url("https://yandex.com/images/search?rpt=imageview"));
        assert!(!is_captcha_url(""));
    }
}
