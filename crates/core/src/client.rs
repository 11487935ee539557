//! Portal client: login flow, session lifecycle, cookie export.
//!
//! One concrete client, parameterized by the immutable [`SiteDescriptor`].
//! The portals differ only in data, never in algorithm, so the login
//! sequencing here is written once and stays testable independent of how
//! many sites exist.

use std::collections::HashMap;
use std::time::Duration;

use cdp::{Browser, Page};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::session::{AuthenticatedSession, Credentials};
use crate::site::SiteDescriptor;

/// How long a pre-login modal dialog is given to appear.
const DIALOG_WAIT: Duration = Duration::from_secs(2);
/// How long the welcome element is polled for after submission.
const WELCOME_WAIT: Duration = Duration::from_secs(8);
/// Bounded wait for the logged-out marker after clicking logout.
const LOGOUT_WAIT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Browser-backed client for one sports-center portal.
///
/// The underlying browser is a scoped resource: acquired by [`connect`],
/// released by [`close`], which the call site must reach on every exit
/// path.
///
/// [`connect`]: SportsCenterClient::connect
/// [`close`]: SportsCenterClient::close
pub struct SportsCenterClient {
    site: &'static SiteDescriptor,
    browser: Option<Browser>,
    page: Page,
    session: Option<AuthenticatedSession>,
}

impl SportsCenterClient {
    /// Launches the automated browser and opens the portal's login page.
    pub async fn connect(site: &'static SiteDescriptor) -> Result<Self, ClientError> {
        info!(target = "courtsnipe.client", site = site.name, "開啟瀏覽器");
        let mut browser = Browser::launch().await?;

        // connect() has not handed out a handle yet, so teardown on a
        // failed attach is still this function's job.
        let page = match browser.page().await {
            Ok(page) => page,
            Err(e) => {
                browser.close();
                return Err(e.into());
            }
        };

        info!(target = "courtsnipe.client", site = site.name, "開啟登入頁");
        if let Err(e) = page.navigate(site.login_url).await {
            browser.close();
            return Err(e.into());
        }

        Ok(Self {
            site,
            browser: Some(browser),
            page,
            session: None,
        })
    }

    /// Builds a client over an already-attached page. The caller keeps
    /// ownership of the browser lifecycle; mainly for driving the login
    /// flow against a scripted page.
    pub fn from_page(site: &'static SiteDescriptor, page: Page) -> Self {
        Self {
            site,
            browser: None,
            page,
            session: None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.as_ref().is_some_and(AuthenticatedSession::is_logged_in)
    }

    /// Runs the portal's login flow and snapshots the session cookies.
    ///
    /// Calling this while already authenticated warns and returns the
    /// existing session unchanged; it never re-authenticates.
    pub async fn login(
        &mut self,
        credentials: &Credentials,
    ) -> Result<AuthenticatedSession, ClientError> {
        if let Some(session) = self.session.as_ref().filter(|s| s.is_logged_in()) {
            warn!(
                target = "courtsnipe.client",
                site = self.site.name,
                user = credentials.redacted(),
                "已經登入，略過重複登入"
            );
            return Ok(session.clone());
        }

        self.dismiss_pre_login_dialogs().await;

        self.page.click(self.site.locators.disclaimer_checkbox).await?;

        info!(
            target = "courtsnipe.client",
            site = self.site.name,
            user = credentials.redacted(),
            "登入中..."
        );
        self.page
            .set_value(self.site.locators.username_input, &credentials.username)
            .await?;
        self.page
            .set_value(self.site.locators.password_input, &credentials.password)
            .await?;
        self.page.evaluate(self.site.submit_script).await?;

        let Some(welcome) = self
            .wait_for_text(self.site.locators.welcome_name, WELCOME_WAIT)
            .await?
        else {
            let message = self
                .page
                .element_text(self.site.locators.login_failed)
                .await
                .ok()
                .flatten()
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| "登入後找不到會員名稱".to_string());
            return Err(ClientError::Authentication { message });
        };

        let cookies = self.export_cookie_jar().await?;
        let session = AuthenticatedSession::from_cookies(cookies);
        self.session = Some(session.clone());
        info!(target = "courtsnipe.client", "{welcome} 登入成功!");
        Ok(session)
    }

    /// Clicks the portal's logout control and waits for the anonymous
    /// state marker.
    ///
    /// By the time this runs the race has concluded, so failure is
    /// logged, never raised; the session is invalidated either way. A
    /// failed logout may leak a stale authenticated session server-side.
    pub async fn logout(&mut self, session: &mut AuthenticatedSession) {
        if !self.is_logged_in() {
            warn!(target = "courtsnipe.client", "已是登出狀態");
            session.invalidate();
            return;
        }

        let confirmed = match self.page.evaluate(self.site.logout_script).await {
            Ok(_) => self.logged_out_marker_appeared().await,
            Err(e) => {
                warn!(target = "courtsnipe.client", error = %e, "無法點擊登出按鈕");
                false
            }
        };

        if confirmed {
            info!(target = "courtsnipe.client", "登出成功");
        } else {
            warn!(target = "courtsnipe.client", "登出失敗");
        }

        session.invalidate();
        if let Some(stored) = self.session.as_mut() {
            stored.invalidate();
        }
    }

    /// Cookie jar of a previously established session.
    ///
    /// Hard precondition: a successful login must have happened and the
    /// session must still be valid, otherwise [`ClientError::NotLoggedIn`].
    pub fn cookies<'a>(
        &self,
        session: &'a AuthenticatedSession,
    ) -> Result<&'a HashMap<String, String>, ClientError> {
        session.cookies()
    }

    /// Releases the automated browser. Call on every exit path.
    pub fn close(mut self) {
        if let Some(browser) = self.browser.as_mut() {
            browser.close();
        }
    }

    /// The portals throw up zero, one, or two announcement dialogs before
    /// the login form is usable. A dialog that never appears is not an
    /// error; the portal simply had nothing to announce today.
    async fn dismiss_pre_login_dialogs(&self) {
        for n in 1..=self.site.pre_login_dialogs {
            match self.page.accept_next_dialog(DIALOG_WAIT).await {
                Ok(message) => {
                    debug!(target = "courtsnipe.client", "第{n}個彈出視窗訊息: {message}");
                }
                Err(e) => {
                    debug!(target = "courtsnipe.client", error = %e, "第{n}個彈出視窗未出現");
                    break;
                }
            }
        }
    }

    async fn wait_for_text(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ClientError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(text) = self.page.element_text(selector).await? {
                if !text.is_empty() {
                    return Ok(Some(text));
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn logged_out_marker_appeared(&self) -> bool {
        let marker = &self.site.logged_out;
        let deadline = tokio::time::Instant::now() + LOGOUT_WAIT;
        loop {
            match self.page.element_text(marker.selector).await {
                Ok(Some(text)) if text == marker.text => return true,
                Ok(_) => {}
                Err(e) => {
                    debug!(target = "courtsnipe.client", error = %e, "讀取登出狀態失敗");
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn export_cookie_jar(&self) -> Result<HashMap<String, String>, ClientError> {
        let cookies = self.page.cookies().await?;
        Ok(cookies
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect())
    }
}
