use async_trait::async_trait;
use tracing::warn;

use crate::error::ExtractorError;
use crate::inventory::ExtractionReport;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// ブラウザ初期化（セッション復元を含む）
    async fn initialize(&mut self) -> Result<(), ExtractorError>;

    /// 必要ならログイン実行
    async fn authenticate(&mut self) -> Result<(), ExtractorError>;

    /// レコード抽出とファイル出力
    async fn extract(&mut self) -> Result<ExtractionReport, ExtractorError>;

    /// リソース解放
    async fn close(&mut self) -> Result<(), ExtractorError>;

    /// 一括実行（initialize → authenticate → extract → close）
    ///
    /// initialize が成功した後は、成否にかかわらず必ず close する。
    /// close の失敗は警告ログのみで、元の結果を上書きしない。
    async fn execute(&mut self) -> Result<ExtractionReport, ExtractorError> {
        self.initialize().await?;

        let outcome = match self.authenticate().await {
            Ok(()) => self.extract().await,
            Err(e) => Err(e),
        };

        if let Err(e) = self.close().await {
            warn!("Resource cleanup failed: {}", e);
        }

        outcome
    }
}
