use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::config::{ExtractorConfig, DEFAULT_MAX_RECORDS};
use crate::error::ExtractorError;
use crate::inventory::{ExtractionReport, InventoryScraper};
use crate::traits::Scraper;

/// 抽出リクエスト
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub target_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_records: usize,
    pub headless: bool,
    pub output_file: PathBuf,
}

impl ExtractRequest {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            username: None,
            password: None,
            max_records: DEFAULT_MAX_RECORDS,
            headless: true,
            output_file: PathBuf::from("product_data.json"),
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = path.into();
        self
    }
}

impl From<ExtractRequest> for ExtractorConfig {
    fn from(req: ExtractRequest) -> Self {
        ExtractorConfig {
            username: req.username,
            password: req.password,
            max_records: req.max_records,
            headless: req.headless,
            output_file: req.output_file,
            ..ExtractorConfig::new(req.target_url)
        }
    }
}

/// tower::Serviceを実装した抽出サービス
#[derive(Debug, Clone, Default)]
pub struct ExtractorService {
    // 将来的な拡張用（レートリミット、同時実行制御など）
}

impl ExtractorService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<ExtractRequest> for ExtractorService {
    type Response = ExtractionReport;
    type Error = ExtractorError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ExtractRequest) -> Self::Future {
        info!("抽出リクエスト受信: target_url={}", req.target_url);

        Box::pin(async move {
            let config: ExtractorConfig = req.into();
            let mut scraper = InventoryScraper::new(config);

            let report = scraper.execute().await?;

            info!(
                "抽出完了: {}件, 停止理由={}, path={:?}",
                report.records.len(),
                report.stop,
                report.output_path
            );

            Ok(report)
        })
    }
}
