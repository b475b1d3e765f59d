//! インベントリ抽出の型定義

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::normalize::normalize_card;

/// 抽出した製品レコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub price: String,
    pub mass_kg: String,
    pub score: String,
}

/// 製品カードから取り出した生の値（正規化前）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCard {
    pub id: Option<String>,
    pub name: Option<String>,
    pub price: Option<String>,
    pub mass_kg: Option<String>,
    pub score: Option<String>,
}

/// 抽出ループの進行状態
///
/// 呼び出し側が生成してループに渡す。ループが中断しても
/// それまでのレコードはここに残る。
#[derive(Debug)]
pub struct ExtractionState {
    /// 正規化済みIDの既出集合
    pub seen: HashSet<String>,
    /// 受理したレコード（受理順）
    pub records: Vec<ProductRecord>,
    /// レコード数の上限
    pub ceiling: usize,
    /// 前回観測したドキュメント高さ
    pub last_height: Option<i64>,
    /// 新規レコードなしバッチの連続回数
    pub empty_batches: u32,
    /// 高さが変化しなかったスクロールの連続回数
    pub no_growth_scrolls: u32,
}

impl ExtractionState {
    pub fn new(ceiling: usize) -> Self {
        Self {
            seen: HashSet::new(),
            records: Vec::new(),
            ceiling,
            last_height: None,
            empty_batches: 0,
            no_growth_scrolls: 0,
        }
    }

    /// バッチを取り込み、受理した件数を返す
    ///
    /// 正規化してからIDで重複排除する。上限に達したらバッチ途中でも打ち切る。
    pub fn absorb(&mut self, batch: Vec<RawCard>) -> usize {
        let mut accepted = 0;
        for card in batch {
            if self.is_full() {
                break;
            }
            let record = match normalize_card(card) {
                Some(record) => record,
                None => continue,
            };
            if !self.seen.insert(record.id.clone()) {
                continue;
            }
            self.records.push(record);
            accepted += 1;
        }
        accepted
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.ceiling
    }

    /// スクロール後の高さを記録し、変化がなければカウンタを進める
    pub fn observe_height(&mut self, height: i64) {
        match self.last_height {
            Some(prev) if prev == height => self.no_growth_scrolls += 1,
            _ => self.no_growth_scrolls = 0,
        }
        self.last_height = Some(height);
    }

    pub fn into_records(self) -> Vec<ProductRecord> {
        self.records
    }
}

/// 抽出ループの終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 新規レコードなしバッチが規定回数続いた
    Converged,
    /// レコード数上限に達した
    LimitReached,
    /// 高さ不変スクロールが規定回数続いた
    MaxAttemptsExceeded,
    /// グリッドが表示されず部分結果で終了した
    GridTimeout,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StopReason::Converged => "converged",
            StopReason::LimitReached => "limit reached",
            StopReason::MaxAttemptsExceeded => "max scroll attempts exceeded",
            StopReason::GridTimeout => "grid timeout",
        };
        write!(f, "{}", label)
    }
}

/// 抽出結果レポート
#[derive(Debug)]
pub struct ExtractionReport {
    pub records: Vec<ProductRecord>,
    pub stop: StopReason,
    pub output_path: PathBuf,
}
