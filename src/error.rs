use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("設定ファイルエラー: {0}")]
    Config(String),

    #[error("ログインが必要ですが認証情報がありません")]
    MissingCredentials,

    #[error("ログイン検証失敗: 送信後もログインフォームが表示されています")]
    LoginVerification,

    #[error("抽出タイムアウト: {0}")]
    ExtractionTimeout(String),

    #[error("クリーンアップエラー: {0}")]
    Cleanup(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("JSONエラー: {0}")]
    Json(#[from] serde_json::Error),
}
