//! セッション永続化
//!
//! 認証済みブラウザ状態をファイルに保存し、次回実行時に再利用する。
//! state の中身はドライバ定義の不透明なblobで、ここでは解釈しない。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ExtractorError;

/// 保存済みセッション
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// 保存時の対象オリジン
    pub origin: String,
    /// 保存時刻
    pub saved_at: DateTime<Utc>,
    /// ドライバ定義のセッション状態
    pub state: Value,
}

impl Session {
    pub fn new(origin: impl Into<String>, state: Value) -> Self {
        Self {
            origin: origin.into(),
            saved_at: Utc::now(),
            state,
        }
    }
}

/// セッションファイルの読み書き
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 指定オリジンのセッションを読み込む
    ///
    /// ファイルが無い・読めない・壊れている・オリジンが一致しない場合は
    /// すべて None（新規セッション扱い）。エラーにはしない。
    pub fn load(&self, origin: &str) -> Option<Session> {
        if !self.path.exists() {
            debug!("No session file at {:?}", self.path);
            return None;
        }

        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Session file unreadable, treating as absent: {}", e);
                return None;
            }
        };

        let session: Session = match serde_json::from_str(&text) {
            Ok(session) => session,
            Err(e) => {
                warn!("Session file malformed, treating as absent: {}", e);
                return None;
            }
        };

        if session.origin != origin {
            warn!(
                "Stored session is for {}, expected {}; ignoring",
                session.origin, origin
            );
            return None;
        }

        Some(session)
    }

    /// セッションを保存する
    pub fn persist(&self, session: &Session) -> Result<(), ExtractorError> {
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)?;
        info!("Session state saved to {:?}", self.path);
        Ok(())
    }
}

/// URLからオリジン（スキーム+ホスト）部分を取り出す
///
/// セッションの適用範囲キーとして使う。パスと末尾スラッシュは落とす。
pub fn origin_of(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let after_scheme = match trimmed.find("://") {
        Some(idx) => idx + 3,
        None => return trimmed.to_string(),
    };
    match trimmed[after_scheme..].find('/') {
        Some(slash) => trimmed[..after_scheme + slash].to_string(),
        None => trimmed.to_string(),
    }
}
