//! ブラウザドライバ抽象化
//!
//! 抽出ロジックはこのトレイト経由でページを操作する。
//! 実装は chromiumoxide 版（chromium モジュール）とテスト用フェイク。

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ExtractorError;

pub mod chromium;

pub use chromium::ChromiumDriver;

/// UI要素の指定方法
///
/// Css はCSSセレクタ（カンマ区切りリスト可）。Text は指定タグのうち
/// テキストに needle を含む最初の要素。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    Css(&'static str),
    Text {
        tag: &'static str,
        needle: &'static str,
    },
}

impl Locator {
    /// 要素を探すJavaScript式を生成（見つからなければ null に評価される）
    pub fn finder_js(&self) -> String {
        match self {
            Locator::Css(selector) => {
                format!("document.querySelector({})", js_string(selector))
            }
            Locator::Text { tag, needle } => format!(
                "Array.from(document.querySelectorAll({})).find(el => (el.textContent || '').includes({})) || null",
                js_string(tag),
                js_string(needle)
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css={}", selector),
            Locator::Text { tag, needle } => write!(f, "text={}:{}", tag, needle),
        }
    }
}

/// Rust文字列をJavaScript文字列リテラルへエスケープする
pub(crate) fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// ページ操作の抽象化
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// URLへ遷移
    async fn goto(&self, url: &str) -> Result<(), ExtractorError>;

    /// ネットワークがアイドルになるまで待機（タイムアウトしても続行）
    async fn wait_idle(&self, timeout: Duration) -> Result<(), ExtractorError>;

    /// JavaScriptを実行して結果をJSONで返す
    async fn evaluate(&self, script: &str) -> Result<Value, ExtractorError>;

    /// 要素が表示されるまで待機。タイムアウトでfalse
    async fn is_visible(&self, locator: &Locator, timeout: Duration)
        -> Result<bool, ExtractorError>;

    /// 要素がDOM上に存在するか（表示状態は問わない）
    async fn exists(&self, locator: &Locator) -> Result<bool, ExtractorError>;

    /// 要素をクリック
    async fn click(&self, locator: &Locator) -> Result<(), ExtractorError>;

    /// 入力欄に値を設定
    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), ExtractorError>;

    /// ページ最下部までスクロール
    async fn scroll_to_bottom(&self) -> Result<(), ExtractorError>;

    /// 現在のドキュメント高さ
    async fn scroll_height(&self) -> Result<i64, ExtractorError>;

    /// セッション状態を取り出す（形式はドライバ定義）
    async fn storage_state(&self) -> Result<Value, ExtractorError>;

    /// 保存済みセッション状態を復元する
    async fn restore_storage_state(&self, state: &Value) -> Result<(), ExtractorError>;

    /// フルページスクリーンショット（PNG）
    async fn screenshot(&self) -> Result<Vec<u8>, ExtractorError>;

    /// ブラウザを解放
    async fn close(&mut self) -> Result<(), ExtractorError>;
}
