// ==========================================
// 增量对账引擎 - 参考表查找合并
// ==========================================
// update_by_key: 按主键对齐覆写，源端空值不覆盖（主数据回写使用）
// 源表按主键去重，首次出现为准
// ==========================================

use crate::domain::record_set::{Record, RecordSet};
use crate::engine::error::{EngineError, EngineResult};
use std::collections::HashMap;

/// 主键规范化函数
pub type KeyNormalizer = fn(&str) -> String;

fn identity(value: &str) -> String {
    value.to_string()
}

fn composite_key(row: &Record, key_columns: &[&str], normalizer: KeyNormalizer) -> String {
    key_columns
        .iter()
        .map(|c| normalizer(row.get(*c).map(|s| s.as_str()).unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

fn index_source<'a>(
    source: &'a RecordSet,
    key_columns: &[&str],
    normalizer: KeyNormalizer,
) -> HashMap<String, &'a Record> {
    let mut index: HashMap<String, &Record> = HashMap::new();
    for row in source.rows() {
        index
            .entry(composite_key(row, key_columns, normalizer))
            .or_insert(row);
    }
    index
}

fn check_source(
    source: &RecordSet,
    source_name: &str,
    key_columns: &[&str],
    value_columns: &[&str],
) -> EngineResult<()> {
    let mut required: Vec<&str> = key_columns.to_vec();
    required.extend_from_slice(value_columns);
    let missing = source.missing_columns(&required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EngineError::missing(source_name, missing))
    }
}

/// 按主键对齐覆写指定列（源端为空的单元格不覆盖）
///
/// # 参数
/// - target: 目标记录集（原地修改）
/// - source: 更新来源
/// - key_column: 目标侧主键列
/// - source_key_column: 来源侧主键列
/// - update_columns: 覆写列
/// - normalizer: 两侧主键的比较规范化
///
/// # 返回
/// - Ok(被更新的目标行数)
pub fn update_by_key(
    target: &mut RecordSet,
    source: &RecordSet,
    source_name: &str,
    key_column: &str,
    source_key_column: &str,
    update_columns: &[&str],
    normalizer: KeyNormalizer,
) -> EngineResult<usize> {
    check_source(source, source_name, &[source_key_column], update_columns)?;
    let index = index_source(source, &[source_key_column], normalizer);

    for column in update_columns {
        target.ensure_column(column, "");
    }

    let mut updated = 0;
    for row in target.rows_mut() {
        let key = composite_key(row, &[key_column], normalizer);
        let Some(source_row) = index.get(&key) else {
            continue;
        };
        let mut touched = false;
        for column in update_columns {
            let value = source_row.get(*column).map(|s| s.as_str()).unwrap_or("");
            if value.trim().is_empty() || value.eq_ignore_ascii_case("nan") {
                continue;
            }
            row.insert(column.to_string(), value.to_string());
            touched = true;
        }
        if touched {
            updated += 1;
        }
    }
    Ok(updated)
}

/// 恒等规范化（精确匹配）
pub fn exact(value: &str) -> String {
    identity(value)
}
