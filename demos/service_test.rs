use catalog_scraper::{ExtractRequest, ExtractorService};
use tower::Service;

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // 環境変数から認証情報を取得
    let username =
        std::env::var("IDEN_USERNAME").expect("IDEN_USERNAME environment variable not set");
    let password =
        std::env::var("IDEN_PASSWORD").expect("IDEN_PASSWORD environment variable not set");

    let request = ExtractRequest::new("https://hiring.idenhq.com/")
        .with_credentials(&username, &password)
        .with_max_records(100)
        .with_headless(false); // デバッグ用に表示モード

    let mut service = ExtractorService::new();

    println!("=== Extractor Service Test ===");

    match service.call(request).await {
        Ok(report) => {
            println!(
                "成功! {}件抽出 ({}), 保存先: {:?}",
                report.records.len(),
                report.stop,
                report.output_path
            );
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
        }
    }
}
