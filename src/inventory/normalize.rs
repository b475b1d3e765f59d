//! 抽出値の正規化
//!
//! カードから取れるテキストには単位やラベルの残骸が混ざる
//! （例: "42 units", "$19.99 USD"）。データ本体のトークンだけを残す。

use super::types::{ProductRecord, RawCard};

/// 生テキストから値トークンを取り出す
///
/// 空白を含まない入力はそのまま返す。空白で分割した場合は、数字を含むか
/// $で始まる最初のトークンを優先し、該当がなければ先頭トークン。
/// 冪等: clean(clean(x)) == clean(x)
pub fn clean(raw: &str) -> String {
    if !raw.chars().any(char::is_whitespace) {
        return raw.to_string();
    }

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let first = match tokens.first() {
        Some(first) => *first,
        // 空白のみの入力は分割できないのでそのまま
        None => return raw.to_string(),
    };

    tokens
        .iter()
        .find(|t| t.chars().any(|c| c.is_ascii_digit()) || t.starts_with('$'))
        .unwrap_or(&first)
        .to_string()
}

/// 生カードを正規化してレコードにする
///
/// フィールド欠落、または正規化後に空になったカードは捨てる（Noneを返す）。
pub(super) fn normalize_card(card: RawCard) -> Option<ProductRecord> {
    let name = card.name?.trim().to_string();
    let id = clean(&card.id?);
    let price = clean(&card.price?);
    let mass_kg = clean(&card.mass_kg?);
    let score = clean(&card.score?);

    if name.is_empty() || id.is_empty() || price.is_empty() || mass_kg.is_empty() || score.is_empty()
    {
        return None;
    }

    Some(ProductRecord {
        id,
        name,
        price,
        mass_kg,
        score,
    })
}
