//! データビューへの固定トラバーサル
//!
//! メニューから製品テーブル表示までのUI操作列。各ステップは
//! ロケータ候補のカスケードを持ち、最初に使えた候補をクリックする。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::driver::{Locator, PageDriver};
use crate::error::ExtractorError;

/// トラバーサルの1ステップ
#[derive(Debug, Clone)]
pub struct TraversalStep {
    pub name: &'static str,
    /// ロケータ候補（優先順）
    pub cascade: &'static [Locator],
    /// 候補1つあたりの表示待ちタイムアウト
    pub candidate_timeout: Duration,
    /// ステップ完了後の安定待機
    pub settle: Duration,
}

/// メニューから製品テーブルまでの既定プラン
pub const TRAVERSAL_STEPS: [TraversalStep; 5] = [
    TraversalStep {
        name: "open menu",
        cascade: &[
            Locator::Text {
                tag: "button",
                needle: "Menu",
            },
            Locator::Css("[aria-label='Menu']"),
            Locator::Css(".menu-button"),
            Locator::Css("button[class*='menu']"),
            Locator::Css("button:has(svg)"),
            Locator::Css("button"),
        ],
        candidate_timeout: Duration::from_secs(5),
        settle: Duration::from_secs(2),
    },
    TraversalStep {
        name: "data management",
        cascade: &[
            Locator::Text {
                tag: "button",
                needle: "Data Management",
            },
            Locator::Text {
                tag: "a",
                needle: "Data Management",
            },
            Locator::Css("[href*='data']"),
            Locator::Css("[href*='management']"),
            Locator::Text {
                tag: "div",
                needle: "Data Management",
            },
        ],
        candidate_timeout: Duration::from_secs(5),
        settle: Duration::from_secs(1),
    },
    TraversalStep {
        name: "inventory",
        cascade: &[
            Locator::Text {
                tag: "button",
                needle: "Inventory",
            },
            Locator::Text {
                tag: "a",
                needle: "Inventory",
            },
            Locator::Css("[href*='inventory']"),
            Locator::Text {
                tag: "div",
                needle: "Inventory",
            },
        ],
        candidate_timeout: Duration::from_secs(5),
        settle: Duration::from_secs(1),
    },
    TraversalStep {
        name: "view all products",
        cascade: &[
            Locator::Text {
                tag: "button",
                needle: "View All Products",
            },
            Locator::Text {
                tag: "a",
                needle: "View All Products",
            },
            Locator::Text {
                tag: "button",
                needle: "View All",
            },
            Locator::Text {
                tag: "a",
                needle: "View All",
            },
            Locator::Css("[href*='product']"),
            Locator::Css("[href*='view']"),
        ],
        candidate_timeout: Duration::from_secs(10),
        settle: Duration::from_secs(3),
    },
    TraversalStep {
        name: "load product table",
        cascade: &[
            Locator::Text {
                tag: "button",
                needle: "Load Product Table",
            },
            Locator::Text {
                tag: "button",
                needle: "Load Table",
            },
            Locator::Text {
                tag: "button",
                needle: "Load Products",
            },
            Locator::Text {
                tag: "button",
                needle: "Load",
            },
            Locator::Css("button"),
        ],
        candidate_timeout: Duration::from_secs(10),
        settle: Duration::from_secs(5),
    },
];

/// プランを順に実行する
///
/// カスケードが全滅したステップは警告だけ出して先へ進む
/// （目的のビューが既に開いていることがある）。
/// ステップ後は毎回ネットワークアイドル待ち+安定待機を入れる。
pub async fn traverse(
    page: &dyn PageDriver,
    steps: &[TraversalStep],
    idle_timeout: Duration,
) -> Result<(), ExtractorError> {
    for step in steps {
        info!("Navigation step: {}", step.name);
        match resolve_and_click(page, step).await {
            Some(locator) => info!("Step '{}' resolved via {}", step.name, locator),
            None => warn!("Step '{}': no candidate matched, continuing", step.name),
        }
        page.wait_idle(idle_timeout).await?;
        sleep(step.settle).await;
    }
    Ok(())
}

/// カスケードから最初に使える候補を選んでクリックする
async fn resolve_and_click(page: &dyn PageDriver, step: &TraversalStep) -> Option<Locator> {
    for locator in step.cascade {
        let mut present = page
            .is_visible(locator, step.candidate_timeout)
            .await
            .unwrap_or(false);
        if !present {
            // 表示待ちに失敗しても、DOM上にあればクリックは試す
            present = page.exists(locator).await.unwrap_or(false);
        }
        if !present {
            debug!("Candidate {} not found for step '{}'", locator, step.name);
            continue;
        }

        match page.click(locator).await {
            Ok(()) => return Some(*locator),
            Err(e) => debug!("Click on {} failed, trying next candidate: {}", locator, e),
        }
    }
    None
}
