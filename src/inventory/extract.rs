//! 無限スクロールテーブルからのページネーション抽出

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::SettleTuning;
use crate::driver::{Locator, PageDriver};
use crate::error::ExtractorError;

use super::types::{ExtractionState, RawCard, StopReason};

/// 製品グリッド内のカード（1枚でも描画されたらグリッド表示とみなす）
const PRODUCT_GRID: Locator = Locator::Css(".grid > div");
/// グリッド表示待ちのタイムアウト
const GRID_TIMEOUT: Duration = Duration::from_secs(20);
/// 新規レコードなしバッチがこの回数続いたら収束とみなす
const MAX_EMPTY_BATCHES: u32 = 3;
/// 高さ不変スクロールの上限
const MAX_NO_GROWTH_SCROLLS: u32 = 1000;

/// 表示中の製品カードを一括で読み取るスクリプト
///
/// カードのラベル行（ID: / Price / Mass (kg) / Score）から値を取り出す。
/// フィールドが欠けたカードはページ側で捨てる。
const CARD_HARVEST_JS: &str = r#"
(() => {
    const products = [];
    const cards = document.querySelectorAll('.grid > div');
    cards.forEach(card => {
        try {
            const product = {};
            const nameElem = card.querySelector('div.h-12');
            if (nameElem) {
                product.name = nameElem.textContent.trim();
            }

            const details = card.querySelector('.p-3');
            if (details) {
                details.querySelectorAll('div.text-xs > div').forEach(row => {
                    const text = row.textContent.trim();
                    const spans = row.querySelectorAll('span');
                    const lastSpan = spans.length > 0
                        ? spans[spans.length - 1].textContent.trim()
                        : null;

                    if (text.startsWith('ID:')) {
                        product.id = lastSpan !== null ? lastSpan : text.replace('ID:', '').trim();
                    } else if (text.includes('Price')) {
                        if (lastSpan !== null) {
                            product.price = lastSpan;
                        } else {
                            const m = text.match(/\$[\d,]+\.[\d]{2}/);
                            product.price = m ? m[0] : text.replace('Price', '').trim();
                        }
                    } else if (text.includes('Mass (kg)')) {
                        if (lastSpan !== null) {
                            product.mass_kg = lastSpan;
                        } else {
                            const m = text.match(/[\d.]+/);
                            product.mass_kg = m ? m[0] : text.replace('Mass (kg)', '').trim();
                        }
                    } else if (text.includes('Score')) {
                        const scoreSpan = row.querySelector('span.ml-1');
                        if (scoreSpan) {
                            product.score = scoreSpan.textContent.trim();
                        } else if (lastSpan !== null) {
                            product.score = lastSpan;
                        } else {
                            const m = text.match(/[\d.]+/);
                            product.score = m ? m[0] : text.replace('Score', '').trim();
                        }
                    }
                });
            }

            if (product.name && product.id && product.price && product.mass_kg && product.score) {
                products.push(product);
            }
        } catch (e) {
            console.error('card parse failed', e);
        }
    });
    return products;
})()
"#;

/// スクロールしながらレコードを収集する
///
/// 停止条件は3つ: 新規なしバッチの連続（Converged）、上限到達
/// （LimitReached）、高さ不変スクロールの上限（MaxAttemptsExceeded）。
/// グリッドが表示されない場合はExtractionTimeoutエラー。
/// 収集済みレコードは state に残るので、呼び出し側は部分結果を利用できる。
pub async fn run(
    page: &dyn PageDriver,
    state: &mut ExtractionState,
    settle: &SettleTuning,
) -> Result<StopReason, ExtractorError> {
    if !page.is_visible(&PRODUCT_GRID, GRID_TIMEOUT).await? {
        return Err(ExtractorError::ExtractionTimeout(format!(
            "製品グリッドが{}秒以内に表示されませんでした",
            GRID_TIMEOUT.as_secs()
        )));
    }
    info!("Product grid detected, starting scroll extraction");

    // 高さ変化検出の基準値
    state.observe_height(page.scroll_height().await?);

    loop {
        let batch = harvest(page).await?;
        let batch_size = batch.len();
        let accepted = state.absorb(batch);
        if accepted == 0 {
            state.empty_batches += 1;
        } else {
            state.empty_batches = 0;
        }
        debug!(
            "Batch: {} cards, {} new, total {}/{}",
            batch_size,
            accepted,
            state.records.len(),
            state.ceiling
        );

        if state.is_full() {
            info!("Record ceiling {} reached", state.ceiling);
            return Ok(StopReason::LimitReached);
        }

        page.scroll_to_bottom().await?;
        sleep(settle.scroll).await;
        state.observe_height(page.scroll_height().await?);

        if state.empty_batches >= MAX_EMPTY_BATCHES {
            info!(
                "No new records in {} consecutive batches, extraction converged",
                state.empty_batches
            );
            return Ok(StopReason::Converged);
        }
        if state.no_growth_scrolls >= MAX_NO_GROWTH_SCROLLS {
            warn!(
                "Page height unchanged after {} scrolls, giving up",
                state.no_growth_scrolls
            );
            return Ok(StopReason::MaxAttemptsExceeded);
        }

        sleep(settle.iteration).await;
    }
}

async fn harvest(page: &dyn PageDriver) -> Result<Vec<RawCard>, ExtractorError> {
    let value = page.evaluate(CARD_HARVEST_JS).await?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakePage;
    use serde_json::json;

    fn instant_settle() -> SettleTuning {
        SettleTuning {
            idle: Duration::ZERO,
            post_nav: Duration::ZERO,
            post_login: Duration::ZERO,
            scroll: Duration::ZERO,
            iteration: Duration::ZERO,
        }
    }

    fn card_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": format!("Product {}", id),
            "price": "$10.00",
            "mass_kg": "1.0",
            "score": "5.0"
        })
    }

    fn page_with_grid() -> FakePage {
        let page = FakePage::new();
        page.show(&PRODUCT_GRID);
        page
    }

    #[tokio::test]
    async fn test_converges_after_repeated_batches() {
        let page = page_with_grid();
        // 初回は2件、その後は同じカードしか返らない
        page.push_batch(json!([card_json("1"), card_json("2")]));
        page.push_batch(json!([card_json("1"), card_json("2")]));
        page.push_batch(json!([card_json("1")]));
        page.push_batch(json!([card_json("2")]));
        for h in [100, 200, 300, 400, 500, 600] {
            page.push_height(h);
        }

        let mut state = ExtractionState::new(100);
        let stop = run(&page, &mut state, &instant_settle()).await.unwrap();

        assert_eq!(stop, StopReason::Converged);
        assert_eq!(state.records.len(), 2);
        let ids: Vec<&str> = state.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        // 空バッチ3回分のスクロールは行われている
        assert_eq!(*page.scrolls.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_limit_reached_stops_before_scrolling() {
        let page = page_with_grid();
        let batch: Vec<serde_json::Value> = (0..9).map(|i| card_json(&i.to_string())).collect();
        page.push_batch(json!(batch));
        page.push_height(100);

        let mut state = ExtractionState::new(5);
        let stop = run(&page, &mut state, &instant_settle()).await.unwrap();

        assert_eq!(stop, StopReason::LimitReached);
        assert_eq!(state.records.len(), 5);
        // 上限到達後はスクロールしない
        assert_eq!(*page.scrolls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stalled_page_height_exhausts_attempts() {
        let page = page_with_grid();
        // 毎回新規レコードがあり高さだけが変わらないページ
        for i in 0..1000 {
            page.push_batch(json!([card_json(&i.to_string())]));
        }

        let mut state = ExtractionState::new(5000);
        let stop = run(&page, &mut state, &instant_settle()).await.unwrap();

        assert_eq!(stop, StopReason::MaxAttemptsExceeded);
        assert_eq!(state.records.len(), 1000);
        assert_eq!(*page.scrolls.lock().unwrap(), 1000);
    }

    #[tokio::test]
    async fn test_missing_grid_is_extraction_timeout() {
        let page = FakePage::new();

        let mut state = ExtractionState::new(100);
        let result = run(&page, &mut state, &instant_settle()).await;

        assert!(matches!(
            result,
            Err(ExtractorError::ExtractionTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_records_survive_malformed_batch() {
        let page = page_with_grid();
        page.push_batch(json!([card_json("1")]));
        page.push_batch(json!("not an array"));
        for h in [100, 200, 300] {
            page.push_height(h);
        }

        let mut state = ExtractionState::new(100);
        let result = run(&page, &mut state, &instant_settle()).await;

        assert!(matches!(result, Err(ExtractorError::Json(_))));
        // エラーまでに受理したレコードはstateに残る
        assert_eq!(state.records.len(), 1);
    }

    #[tokio::test]
    async fn test_dirty_fields_are_normalized_during_absorb() {
        let page = page_with_grid();
        page.push_batch(json!([{
            "id": "42 units",
            "name": "Espresso Machine",
            "price": "$19.99 USD",
            "mass_kg": "3.2 kg",
            "score": "8.7"
        }]));
        page.push_height(100);

        let mut state = ExtractionState::new(1);
        let stop = run(&page, &mut state, &instant_settle()).await.unwrap();

        assert_eq!(stop, StopReason::LimitReached);
        let record = &state.records[0];
        assert_eq!(record.id, "42");
        assert_eq!(record.price, "$19.99");
        assert_eq!(record.mass_kg, "3.2");
        assert_eq!(record.score, "8.7");
    }
}
