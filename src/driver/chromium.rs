//! chromiumoxide による PageDriver 実装

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;

use super::{js_string, Locator, PageDriver};

/// CDPリクエストのタイムアウト（秒）
const CDP_REQUEST_TIMEOUT_SECS: u64 = 60;
/// ネットワークアイドル判定のインターバル（ミリ秒）
const NETWORK_IDLE_CHECK_INTERVAL_MS: u64 = 500;
/// アイドル判定に必要な連続成功回数
const REQUIRED_IDLE_CHECKS: u32 = 3;
/// 可視判定ポーリングのインターバル（ミリ秒）
const VISIBILITY_POLL_INTERVAL_MS: u64 = 250;

/// 実ブラウザドライバ
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumDriver {
    /// ブラウザを起動してページを1枚開く
    pub async fn launch(config: &ExtractorConfig) -> Result<Self, ExtractorError> {
        info!("Launching browser...");

        // ユニークなユーザーデータディレクトリを生成
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("catalog-scraper-{}", unique_id));

        // Chrome パスを取得
        let chrome_path = std::env::var("CHROME_PATH")
            .or_else(|_| std::env::var("CHROMIUM_PATH"))
            .unwrap_or_else(|_| "chromium".to_string());

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(&user_data_dir)
            .window_size(1280, 800);

        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .request_timeout(Duration::from_secs(CDP_REQUEST_TIMEOUT_SECS))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let browser_config = builder
            .build()
            .map_err(|e| ExtractorError::BrowserInit(e.to_string()))?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ExtractorError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                // 起動済みプロセスを残さない
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                return Err(ExtractorError::BrowserInit(e.to_string()));
            }
        };

        info!("Browser launched");
        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    async fn eval_bool(&self, script: &str) -> Result<bool, ExtractorError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ExtractorError::JavaScript(e.to_string()))?;
        Ok(result.into_value::<bool>().unwrap_or(false))
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&self, url: &str) -> Result<(), ExtractorError> {
        info!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| ExtractorError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| ExtractorError::Navigation(e.to_string()))?;
        Ok(())
    }

    /// ネットワークリクエストがアイドル状態になるまで待機
    ///
    /// Performance API のリソースエントリを監視し、連続3回アイドルなら完了。
    /// タイムアウトしても警告のみで続行する。
    async fn wait_idle(&self, timeout: Duration) -> Result<(), ExtractorError> {
        debug!("Waiting for network to become idle...");
        let start = std::time::Instant::now();
        let mut idle_count = 0;

        while start.elapsed() < timeout {
            let result = self
                .page
                .evaluate(
                    r#"
                    (() => {
                        const entries = performance.getEntriesByType('resource');
                        const now = performance.now();

                        // 直近500ms以内に開始され、まだ完了していないリクエストがあるか
                        const recentRequests = entries.filter(e => {
                            return (now - e.startTime) < 500 && e.duration === 0;
                        });

                        return recentRequests.length === 0;
                    })()
                "#,
                )
                .await;

            match result {
                Ok(val) => {
                    if val.into_value::<bool>().unwrap_or(false) {
                        idle_count += 1;
                        if idle_count >= REQUIRED_IDLE_CHECKS {
                            debug!(
                                "Network idle after {:?} ({} consecutive checks)",
                                start.elapsed(),
                                idle_count
                            );
                            return Ok(());
                        }
                    } else {
                        idle_count = 0;
                    }
                }
                Err(e) => {
                    debug!("Network idle check error: {}", e);
                    idle_count = 0;
                }
            }

            sleep(Duration::from_millis(NETWORK_IDLE_CHECK_INTERVAL_MS)).await;
        }

        warn!(
            "Network idle timeout after {:?}, proceeding anyway",
            start.elapsed()
        );
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ExtractorError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ExtractorError::JavaScript(e.to_string()))?;
        Ok(result.into_value::<Value>().unwrap_or(Value::Null))
    }

    async fn is_visible(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<bool, ExtractorError> {
        let script = format!(
            r#"
            (() => {{
                const el = {};
                if (!el) return false;
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                return style.display !== 'none' &&
                       style.visibility !== 'hidden' &&
                       style.opacity !== '0' &&
                       (rect.width > 0 || rect.height > 0);
            }})()
        "#,
            locator.finder_js()
        );

        let start = std::time::Instant::now();
        loop {
            match self.eval_bool(&script).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => debug!("Visibility probe for {} failed: {}", locator, e),
            }

            if start.elapsed() >= timeout {
                return Ok(false);
            }
            sleep(Duration::from_millis(VISIBILITY_POLL_INTERVAL_MS)).await;
        }
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, ExtractorError> {
        let script = format!("({}) !== null", locator.finder_js());
        self.eval_bool(&script).await
    }

    async fn click(&self, locator: &Locator) -> Result<(), ExtractorError> {
        let script = format!(
            r#"
            (() => {{
                const el = {};
                if (!el) return false;
                el.click();
                return true;
            }})()
        "#,
            locator.finder_js()
        );

        if self.eval_bool(&script).await? {
            debug!("Clicked {}", locator);
            Ok(())
        } else {
            Err(ExtractorError::ElementNotFound(locator.to_string()))
        }
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), ExtractorError> {
        // React等のフォームはDOMイベントを発火しないと値を認識しない
        let script = format!(
            r#"
            (() => {{
                const el = {};
                if (!el) return false;
                el.focus();
                el.value = {};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()
        "#,
            locator.finder_js(),
            js_string(text)
        );

        if self.eval_bool(&script).await? {
            Ok(())
        } else {
            Err(ExtractorError::ElementNotFound(locator.to_string()))
        }
    }

    async fn scroll_to_bottom(&self) -> Result<(), ExtractorError> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map_err(|e| ExtractorError::JavaScript(e.to_string()))?;
        Ok(())
    }

    async fn scroll_height(&self) -> Result<i64, ExtractorError> {
        let result = self
            .page
            .evaluate("document.body.scrollHeight")
            .await
            .map_err(|e| ExtractorError::JavaScript(e.to_string()))?;
        Ok(result.into_value::<i64>().unwrap_or(0))
    }

    async fn storage_state(&self) -> Result<Value, ExtractorError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| ExtractorError::JavaScript(e.to_string()))?;

        let jar: Vec<StoredCookie> = cookies
            .into_iter()
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                http_only: c.http_only,
            })
            .collect();

        debug!("Captured {} cookies", jar.len());
        Ok(serde_json::to_value(BrowserState { cookies: jar })?)
    }

    async fn restore_storage_state(&self, state: &Value) -> Result<(), ExtractorError> {
        let state: BrowserState = serde_json::from_value(state.clone())?;

        let params: Vec<CookieParam> = state
            .cookies
            .into_iter()
            .map(|c| {
                let mut param = CookieParam::new(c.name, c.value);
                param.domain = Some(c.domain);
                param.path = Some(c.path);
                param.secure = Some(c.secure);
                param.http_only = Some(c.http_only);
                param
            })
            .collect();

        let count = params.len();
        self.page
            .set_cookies(params)
            .await
            .map_err(|e| ExtractorError::JavaScript(e.to_string()))?;

        info!("Restored {} cookies", count);
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ExtractorError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| ExtractorError::JavaScript(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ExtractorError> {
        info!("Closing browser...");
        let close_result = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        close_result.map_err(|e| ExtractorError::Cleanup(e.to_string()))?;
        info!("Browser closed");
        Ok(())
    }
}

/// セッションblobの中身（このドライバ専用の形式）
#[derive(Debug, Serialize, Deserialize)]
struct BrowserState {
    cookies: Vec<StoredCookie>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCookie {
    name: String,
    value: String,
    domain: String,
    path: String,
    secure: bool,
    http_only: bool,
}
