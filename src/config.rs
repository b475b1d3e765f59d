use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ExtractorError;

/// 取得レコード数の上限（デフォルト）
pub const DEFAULT_MAX_RECORDS: usize = 2505;

/// 認証情報
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// 各フェーズの待機時間設定
#[derive(Debug, Clone)]
pub struct SettleTuning {
    /// ネットワークアイドル待機のタイムアウト
    pub idle: Duration,
    /// データビュー到達後の安定待機
    pub post_nav: Duration,
    /// ログインフォーム送信後の安定待機
    pub post_login: Duration,
    /// スクロール後のコンテンツロード待機
    pub scroll: Duration,
    /// 抽出ループ各イテレーション間の待機
    pub iteration: Duration,
}

impl Default for SettleTuning {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(30),
            post_nav: Duration::from_secs(2),
            post_login: Duration::from_secs(5),
            scroll: Duration::from_secs(2),
            iteration: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub target_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub credentials_file: PathBuf,
    pub session_file: PathBuf,
    pub output_file: PathBuf,
    pub max_records: usize,
    pub headless: bool,
    pub debug: bool,
    pub settle: SettleTuning,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            username: None,
            password: None,
            credentials_file: PathBuf::from("config.json"),
            session_file: PathBuf::from("session.json"),
            output_file: PathBuf::from("product_data.json"),
            max_records: DEFAULT_MAX_RECORDS,
            headless: true,
            debug: false,
            settle: SettleTuning::default(),
        }
    }
}

impl ExtractorConfig {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Default::default()
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

    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = path.into();
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = path.into();
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

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// 認証情報を解決する
    ///
    /// 明示指定が揃っていればそれを使用。不足分は認証情報ファイルで補完し、
    /// ファイル側の値を優先する。完全なペアが揃わなければ None。
    pub fn resolve_credentials(&self) -> Option<Credentials> {
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            });
        }

        let file = match CredentialFile::load(&self.credentials_file) {
            Ok(file) => file,
            Err(e) => {
                // 壊れた認証情報ファイルは致命的エラーにしない
                warn!("Credential file unusable, ignoring: {}", e);
                CredentialFile::default()
            }
        };

        let username = file.username.or_else(|| self.username.clone())?;
        let password = file.password.or_else(|| self.password.clone())?;
        Some(Credentials { username, password })
    }
}

/// 認証情報ファイル (config.json) の形式
#[derive(Debug, Default, Deserialize)]
pub struct CredentialFile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialFile {
    /// ファイルから読み込む。ファイルが存在しない場合は空扱い
    pub fn load(path: &Path) -> Result<Self, ExtractorError> {
        if !path.exists() {
            debug!("Credential file {:?} not found", path);
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| ExtractorError::Config(format!("{:?}: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_builder() {
        let config = ExtractorConfig::new("https://example.com/")
            .with_credentials("user", "pass")
            .with_max_records(100)
            .with_headless(false)
            .with_debug(true)
            .with_output_file("/tmp/out.json");

        assert_eq!(config.target_url, "https://example.com/");
        assert_eq!(config.username.as_deref(), Some("user"));
        assert_eq!(config.password.as_deref(), Some("pass"));
        assert_eq!(config.max_records, 100);
        assert!(!config.headless);
        assert!(config.debug);
        assert_eq!(config.output_file, PathBuf::from("/tmp/out.json"));
    }

    #[test]
    fn test_config_defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.max_records, DEFAULT_MAX_RECORDS);
        assert!(config.headless);
        assert_eq!(config.session_file, PathBuf::from("session.json"));
        assert_eq!(config.settle.post_login, Duration::from_secs(5));
    }

    #[test]
    fn test_resolve_explicit_credentials() {
        let config = ExtractorConfig::new("https://example.com/")
            .with_credentials("user", "pass")
            .with_credentials_file("/nonexistent/config.json");

        let creds = config.resolve_credentials().unwrap();
        assert_eq!(creds.username, "user");
        assert_eq!(creds.password, "pass");
    }

    #[test]
    fn test_resolve_missing_credentials() {
        let config = ExtractorConfig::new("https://example.com/")
            .with_credentials_file("/nonexistent/config.json");

        assert!(config.resolve_credentials().is_none());
    }

    #[test]
    fn test_resolve_credentials_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"username": "file_user", "password": "file_pass"}}"#).unwrap();

        let config = ExtractorConfig::new("https://example.com/").with_credentials_file(&path);
        let creds = config.resolve_credentials().unwrap();
        assert_eq!(creds.username, "file_user");
        assert_eq!(creds.password, "file_pass");
    }

    #[test]
    fn test_file_credentials_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"username": "file_user"}}"#).unwrap();

        // ファイルのusernameが優先され、passwordは明示指定で補完される
        let config = ExtractorConfig::new("https://example.com/")
            .with_credentials("explicit_user", "explicit_pass")
            .with_credentials_file(&path);
        // 明示ペアが揃っている場合はファイルを読まない
        let creds = config.resolve_credentials().unwrap();
        assert_eq!(creds.username, "explicit_user");

        let partial = ExtractorConfig {
            username: None,
            password: Some("explicit_pass".to_string()),
            credentials_file: path.clone(),
            ..ExtractorConfig::new("https://example.com/")
        };
        let creds = partial.resolve_credentials().unwrap();
        assert_eq!(creds.username, "file_user");
        assert_eq!(creds.password, "explicit_pass");
    }

    #[test]
    fn test_malformed_credential_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "not json at all").unwrap();

        let config = ExtractorConfig::new("https://example.com/").with_credentials_file(&path);
        // 壊れたファイルは空扱いになり、ペアが揃わないのでNone
        assert!(config.resolve_credentials().is_none());
    }
}
