//! カタログ抽出ライブラリ
//!
//! - 保存セッションの復元とログインフォールバック
//! - 無限スクロールの製品テーブルからレコードを収集してJSON出力
//!
//! # サービス経由の使用例
//!
//! ```rust,ignore
//! use catalog_scraper::{ExtractRequest, ExtractorService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ExtractorService::new();
//!
//!     let request = ExtractRequest::new("https://hiring.idenhq.com/")
//!         .with_credentials("username", "password")
//!         .with_headless(false);
//!
//!     let report = service.call(request).await.unwrap();
//!     println!("Extracted: {} records", report.records.len());
//! }
//! ```
//!
//! # スクレイパー直接利用の例
//!
//! ```rust,ignore
//! use catalog_scraper::{ExtractorConfig, InventoryScraper, Scraper};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ExtractorConfig::new("https://hiring.idenhq.com/")
//!         .with_credentials("username", "password")
//!         .with_max_records(100);
//!
//!     let mut scraper = InventoryScraper::new(config);
//!     let report = scraper.execute().await.unwrap();
//!     println!("{} records -> {:?}", report.records.len(), report.output_path);
//! }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod inventory;
pub mod service;
pub mod session;
pub mod traits;

// 主要な型をリエクスポート
pub use config::{Credentials, ExtractorConfig, SettleTuning, DEFAULT_MAX_RECORDS};
pub use error::ExtractorError;
pub use inventory::{ExtractionReport, InventoryScraper, ProductRecord, StopReason};
pub use service::{ExtractRequest, ExtractorService};
pub use session::{Session, SessionStore};
pub use traits::Scraper;
