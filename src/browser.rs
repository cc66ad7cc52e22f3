use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use secrecy::ExposeSecret;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};

const SEARCH_IFRAME: &str = "searchIframe";
const ENTRY_IFRAME: &str = "entryIframe";
const LIST_ITEM_SELECTOR: &str = ".VLTHu";
const SHARE_BUTTON_SELECTOR: &str = "._sGE0y";
const SHARE_URL_INPUT_SELECTOR: &str = "._qRkjH";
const POLL_INTERVAL_MS: u64 = 200;

/// One visible saved-place entry in the scrolled list. `offset` is the
/// vertical position inside the list frame; the collector uses it to avoid
/// re-processing entries it already handled.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ListEntry {
    pub index: usize,
    pub offset: f64,
}

/// The Collector's entire interaction surface with the map service UI.
/// Everything selector- and frame-shaped stays behind this seam.
#[async_trait]
pub trait SavedListBrowser {
    /// Navigate to the saved-places page, sign in when prompted, open the
    /// configured folder and locate the list frame. A missing list frame
    /// is fatal for the whole run.
    async fn open_saved_list(&mut self) -> AppResult<()>;

    async fn visible_entries(&mut self) -> AppResult<Vec<ListEntry>>;

    /// Click the entry, wait for its detail frame, open the share dialog
    /// and read the shareable URL field. `None` means some expected UI
    /// piece was missing for this entry; the entry is skipped.
    async fn read_share_url(&mut self, entry: &ListEntry) -> AppResult<Option<String>>;

    /// Scroll the list to the bottom. Returns whether the scroll height
    /// grew, i.e. whether more entries were loaded.
    async fn scroll_down(&mut self) -> AppResult<bool>;
}

pub struct ChromeSavedList {
    config: AppConfig,
    browser: Browser,
    page: chromiumoxide::Page,
    event_loop: JoinHandle<()>,
}

impl ChromeSavedList {
    pub async fn launch(config: AppConfig) -> AppResult<Self> {
        let mut builder = BrowserConfig::builder();
        if !config.browser_headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(AppError::Config)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let event_loop = tokio::task::spawn(async move {
            while handler.next().await.is_some() {}
        });

        let page = browser.new_page("about:blank").await?;
        Ok(Self {
            config,
            browser,
            page,
            event_loop,
        })
    }

    pub async fn close(mut self) -> AppResult<()> {
        self.browser.close().await?;
        self.event_loop.abort();
        Ok(())
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, expression: String) -> AppResult<T> {
        let value = self.page.evaluate(expression).await?.into_value()?;
        Ok(value)
    }

    /// Runs a JS expression for its side effect. The trailing `true` keeps
    /// the remote result decodable when the expression itself evaluates to
    /// `undefined`.
    async fn exec(&self, expression: String) -> AppResult<()> {
        self.eval::<bool>(format!("({expression}, true)")).await?;
        Ok(())
    }

    /// Polls a JS predicate until it holds or the selector timeout runs out.
    async fn wait_for_js(&self, predicate: &str) -> AppResult<bool> {
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.config.selector_timeout_ms);
        loop {
            if self.eval::<bool>(predicate.to_string()).await.unwrap_or(false) {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    async fn login_if_prompted(&self) -> AppResult<()> {
        let login_visible = self
            .eval::<bool>(
                "Array.from(document.querySelectorAll('a, button'))\
                    .some(el => el.textContent.trim() === '로그인')"
                    .to_string(),
            )
            .await
            .unwrap_or(false);
        if !login_visible {
            debug!("already signed in");
            return Ok(());
        }

        let (Some(id), Some(password)) = (&self.config.naver_id, &self.config.naver_password)
        else {
            return Err(AppError::Config(
                "sign-in required but NAVER_ID/NAVER_PASSWORD are not set".into(),
            ));
        };

        info!("sign-in prompt detected; logging in");
        self.exec(
            "Array.from(document.querySelectorAll('a, button'))\
                .find(el => el.textContent.trim() === '로그인').click()"
                .to_string(),
        )
        .await?;

        if !self.wait_for_js("document.querySelector('#id') !== null").await? {
            return Err(AppError::Config("login form did not appear".into()));
        }

        self.page
            .find_element("#id")
            .await?
            .click()
            .await?
            .type_str(id.expose_secret())
            .await?;
        self.page
            .find_element("#pw")
            .await?
            .click()
            .await?
            .type_str(password.expose_secret())
            .await?;
        self.page.find_element(".btn_login").await?.click().await?;
        self.page.wait_for_navigation().await?;
        info!("signed in");
        Ok(())
    }

    async fn click_text(&self, text: &str) -> AppResult<bool> {
        let predicate = format!(
            "Array.from(document.querySelectorAll('a, button, span'))\
                .some(el => el.textContent.trim() === '{text}')"
        );
        if !self.wait_for_js(&predicate).await? {
            return Ok(false);
        }
        self.exec(format!(
            "Array.from(document.querySelectorAll('a, button, span'))\
                .find(el => el.textContent.trim() === '{text}').click()"
        ))
        .await?;
        Ok(true)
    }

    fn frame_document(frame: &str) -> String {
        format!("document.querySelector('iframe[name=\"{frame}\"]')?.contentDocument")
    }
}

#[async_trait]
impl SavedListBrowser for ChromeSavedList {
    async fn open_saved_list(&mut self) -> AppResult<()> {
        self.page.goto(self.config.saved_list_url.as_str()).await?;
        self.page.wait_for_navigation().await?;
        info!(url = %self.config.saved_list_url, "saved-places page opened");

        self.login_if_prompted().await?;

        if !self.click_text("저장").await? {
            return Err(AppError::Config("saved-places button not found".into()));
        }
        let folder = self.config.folder_name.clone();
        if !self.click_text(&folder).await? {
            return Err(AppError::Config(format!(
                "saved folder not found: {}",
                self.config.folder_name
            )));
        }

        // The list lives in its own iframe; without it the run cannot
        // proceed at all.
        let frame_present = format!("{} != null", Self::frame_document(SEARCH_IFRAME));
        if !self.wait_for_js(&frame_present).await? {
            return Err(AppError::Config(format!(
                "list frame not found: {SEARCH_IFRAME}"
            )));
        }
        Ok(())
    }

    async fn visible_entries(&mut self) -> AppResult<Vec<ListEntry>> {
        let raw: String = self
            .eval(format!(
                "JSON.stringify(Array.from({}.querySelectorAll('{LIST_ITEM_SELECTOR}'))\
                    .map((el, index) => ({{ index, offset: el.offsetTop }})))",
                Self::frame_document(SEARCH_IFRAME)
            ))
            .await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn read_share_url(&mut self, entry: &ListEntry) -> AppResult<Option<String>> {
        let clicked = self
            .exec(format!(
                "{}.querySelectorAll('{LIST_ITEM_SELECTOR}')[{}].click()",
                Self::frame_document(SEARCH_IFRAME),
                entry.index
            ))
            .await;
        if let Err(err) = clicked {
            warn!(index = entry.index, %err, "entry click failed; skipping entry");
            return Ok(None);
        }
        sleep(Duration::from_millis(self.config.detail_wait_ms)).await;

        let entry_doc = Self::frame_document(ENTRY_IFRAME);
        if !self.wait_for_js(&format!("{entry_doc} != null")).await? {
            warn!(index = entry.index, "detail frame missing; skipping entry");
            return Ok(None);
        }

        let share_button = format!(
            "{entry_doc}.querySelector('{SHARE_BUTTON_SELECTOR}') !== null"
        );
        if !self.wait_for_js(&share_button).await? {
            warn!(index = entry.index, "share button missing; skipping entry");
            return Ok(None);
        }
        self.exec(format!(
            "{entry_doc}.querySelector('{SHARE_BUTTON_SELECTOR}').click()"
        ))
        .await?;

        let field_present = format!(
            "{entry_doc}.querySelector('{SHARE_URL_INPUT_SELECTOR}') !== null"
        );
        if !self.wait_for_js(&field_present).await? {
            warn!(index = entry.index, "share url field missing; skipping entry");
            return Ok(None);
        }

        // The clipboard is off limits in automation, so read the input
        // field's value directly.
        let url: Option<String> = self
            .eval(format!(
                "{entry_doc}.querySelector('{SHARE_URL_INPUT_SELECTOR}')?.value ?? null"
            ))
            .await?;
        Ok(url.filter(|value| !value.is_empty()))
    }

    async fn scroll_down(&mut self) -> AppResult<bool> {
        let doc = Self::frame_document(SEARCH_IFRAME);
        let before: f64 = self
            .eval(format!("{doc}.documentElement.scrollHeight"))
            .await?;
        self.exec(format!(
            "{doc}.defaultView.scrollTo(0, {doc}.documentElement.scrollHeight)"
        ))
        .await?;
        sleep(Duration::from_millis(self.config.scroll_wait_ms)).await;
        let after: f64 = self
            .eval(format!("{doc}.documentElement.scrollHeight"))
            .await?;
        Ok(after > before)
    }
}
