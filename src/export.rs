//! 抽出結果のファイル出力

use std::path::Path;

use tracing::info;

use crate::error::ExtractorError;
use crate::inventory::ProductRecord;

/// レコードをJSONファイルに書き出す
///
/// 受理順を保ったインデント付きJSON配列。非ASCII文字はエスケープしない。
pub fn write_records(records: &[ProductRecord], path: &Path) -> Result<(), ExtractorError> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;
    info!("Exported {} records to {:?}", records.len(), path);
    Ok(())
}
