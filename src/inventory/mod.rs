//! 製品インベントリスクレイパーモジュール
//!
//! 認証付きWebアプリの無限スクロールテーブルから製品レコードを収集する

mod auth;
mod extract;
mod navigator;
mod normalize;
mod scraper;
mod types;

pub use normalize::clean;
pub use scraper::InventoryScraper;
pub use types::{ExtractionReport, ExtractionState, ProductRecord, RawCard, StopReason};
