//! インベントリスクレイパー本体
//!
//! セッション復元 → 必要ならログイン → データビューへ遷移 →
//! スクロール抽出 → JSON出力、の一連を束ねる。

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::driver::{ChromiumDriver, PageDriver};
use crate::error::ExtractorError;
use crate::export;
use crate::session::{origin_of, Session, SessionStore};
use crate::traits::Scraper;

use super::navigator::{TraversalStep, TRAVERSAL_STEPS};
use super::types::{ExtractionReport, ExtractionState, StopReason};
use super::{auth, extract, navigator};

/// データビューのパス（対象URL基準）
const CHALLENGE_PATH: &str = "challenge";

pub struct InventoryScraper {
    config: ExtractorConfig,
    driver: Option<Box<dyn PageDriver>>,
    session_store: SessionStore,
    steps: &'static [TraversalStep],
}

impl InventoryScraper {
    pub fn new(config: ExtractorConfig) -> Self {
        let session_store = SessionStore::new(config.session_file.clone());
        Self {
            config,
            driver: None,
            session_store,
            steps: &TRAVERSAL_STEPS,
        }
    }

    fn page(&self) -> Result<&dyn PageDriver, ExtractorError> {
        self.driver
            .as_deref()
            .ok_or_else(|| ExtractorError::BrowserInit("ブラウザが初期化されていません".into()))
    }

    fn challenge_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.target_url.trim_end_matches('/'),
            CHALLENGE_PATH
        )
    }

    /// 保存済みセッションがあれば復元する。復元できたかを返す
    async fn restore_session(&self, page: &dyn PageDriver) -> bool {
        let origin = origin_of(&self.config.target_url);
        let session = match self.session_store.load(&origin) {
            Some(session) => session,
            None => {
                info!("No stored session for {}, starting fresh", origin);
                return false;
            }
        };

        info!("Restoring session saved at {}", session.saved_at);
        match page.restore_storage_state(&session.state).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Session restore failed, continuing unauthenticated: {}", e);
                false
            }
        }
    }

    /// 現在のセッション状態を保存する（失敗しても警告のみ）
    async fn persist_session(&self, page: &dyn PageDriver) {
        match page.storage_state().await {
            Ok(state) => {
                let session = Session::new(origin_of(&self.config.target_url), state);
                if let Err(e) = self.session_store.persist(&session) {
                    warn!("Failed to persist session: {}", e);
                }
            }
            Err(e) => warn!("Could not capture session state: {}", e),
        }
    }

    async fn debug_snapshot(page: &dyn PageDriver, label: &str) {
        match page.screenshot().await {
            Ok(png) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
                debug!("{} screenshot: data:image/png;base64,{}", label, encoded);
            }
            Err(e) => debug!("Screenshot failed: {}", e),
        }
    }
}

#[async_trait]
impl Scraper for InventoryScraper {
    async fn initialize(&mut self) -> Result<(), ExtractorError> {
        info!("Initializing inventory scraper...");

        let driver = ChromiumDriver::launch(&self.config).await?;
        self.driver = Some(Box::new(driver));

        let page = self.page()?;
        self.restore_session(page).await;

        info!("Scraper initialized");
        Ok(())
    }

    async fn authenticate(&mut self) -> Result<(), ExtractorError> {
        let page = self.page()?;

        page.goto(&self.config.target_url).await?;
        page.wait_idle(self.config.settle.idle).await?;

        if !auth::login_required(page).await {
            info!("Session already authenticated, skipping login");
            return Ok(());
        }

        let credentials = self
            .config
            .resolve_credentials()
            .ok_or(ExtractorError::MissingCredentials)?;

        if self.config.debug {
            Self::debug_snapshot(page, "Login form").await;
        }

        auth::sign_in(page, &credentials, &self.config.settle).await?;

        // 次回実行で再ログインを省けるよう、認証済み状態を保存しておく
        self.persist_session(page).await;
        Ok(())
    }

    async fn extract(&mut self) -> Result<ExtractionReport, ExtractorError> {
        let page = self.page()?;

        let url = self.challenge_url();
        page.goto(&url).await?;
        page.wait_idle(self.config.settle.idle).await?;
        sleep(self.config.settle.post_nav).await;

        navigator::traverse(page, self.steps, self.config.settle.idle).await?;

        let mut state = ExtractionState::new(self.config.max_records);
        let stop = match extract::run(page, &mut state, &self.config.settle).await {
            Ok(stop) => stop,
            Err(ExtractorError::ExtractionTimeout(msg)) => {
                // グリッド不達は部分結果で続行する
                warn!(
                    "Extraction aborted: {}; keeping {} records collected so far",
                    msg,
                    state.records.len()
                );
                StopReason::GridTimeout
            }
            Err(e) => return Err(e),
        };

        let records = state.into_records();
        info!("Extraction finished: {} records ({})", records.len(), stop);
        if records.is_empty() {
            warn!("Extraction yielded no records; the target UI may have changed");
        }

        export::write_records(&records, &self.config.output_file)?;

        Ok(ExtractionReport {
            records,
            stop,
            output_path: self.config.output_file.clone(),
        })
    }

    async fn close(&mut self) -> Result<(), ExtractorError> {
        if let Some(mut driver) = self.driver.take() {
            driver.close().await?;
        }
        Ok(())
    }
}
