// ==========================================
// 增量对账引擎 - 主数据回写
// ==========================================
// 语义: 已存在的主键只覆写允许列表内的列（其余主数据列保持不动）
//       新主键补齐主数据全部列（缺失列写 "-"）后追加
// 顺序: 先全部主数据行（原顺序），再新增行（审核文件顺序）
// ==========================================

use crate::domain::record_set::{Record, RecordSet};
use crate::domain::types::MISSING;
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// 回写结果
#[derive(Debug, Clone, PartialEq)]
pub struct MasterUpsertOutcome {
    pub records: RecordSet,
    /// 被覆写的主数据行数
    pub updated: usize,
    pub inserted: usize,
}

// ==========================================
// MasterUpsert
// ==========================================
#[derive(Debug, Clone)]
pub struct MasterUpsert {
    key_field: String,
    allow_list: Vec<String>,
    master_columns: Vec<String>,
}

fn is_empty_source(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// 主键比较值：两侧均去首尾空白
fn key_of(row: &Record, key: &str) -> String {
    row.get(key).map(|s| s.trim().to_string()).unwrap_or_default()
}

impl MasterUpsert {
    /// # 参数
    /// - key_field: 主键列（如 SKU）
    /// - allow_list: 对已存在记录允许覆写的列
    /// - master_columns: 主数据完整列（输出顺序）
    pub fn new(key_field: &str, allow_list: &[&str], master_columns: &[&str]) -> Self {
        Self {
            key_field: key_field.to_string(),
            allow_list: allow_list.iter().map(|c| c.to_string()).collect(),
            master_columns: master_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// 应用已确认的变更
    ///
    /// # 参数
    /// - master: 当前主数据
    /// - verified: 已确认变更（需含主键列）
    ///
    /// # 返回
    /// - Err(MissingColumns): 变更表缺少主键列
    pub fn apply(&self, master: RecordSet, verified: &RecordSet) -> EngineResult<MasterUpsertOutcome> {
        let key = self.key_field.as_str();
        if !verified.has_column(key) {
            return Err(EngineError::missing("verified_changes", vec![key.to_string()]));
        }
        if !master.is_empty() && !master.has_column(key) {
            return Err(EngineError::missing("master", vec![key.to_string()]));
        }

        let master_keys: HashSet<String> = master.rows().iter().map(|r| key_of(r, key)).collect();

        // 同一主键多次出现时以最后一次为准
        let mut changes: HashMap<String, &Record> = HashMap::new();
        let mut new_rows: Vec<Record> = Vec::new();
        let mut new_keys: HashSet<String> = HashSet::new();
        let mut duplicate_new = 0;
        for row in verified.rows() {
            let row_key = key_of(row, key);
            if row_key.is_empty() {
                continue;
            }
            if master_keys.contains(&row_key) {
                changes.insert(row_key, row);
            } else if new_keys.insert(row_key) {
                new_rows.push(row.clone());
            } else {
                duplicate_new += 1;
            }
        }
        if duplicate_new > 0 {
            warn!(
                duplicates = duplicate_new,
                key_field = key,
                "变更表中存在重复的新主键，仅保留首次出现"
            );
        }

        let mut updated = 0;
        let mut records = master;
        for column in &self.allow_list {
            records.ensure_column(column, MISSING);
        }
        for row in records.rows_mut() {
            let Some(change) = changes.get(&key_of(row, key)) else {
                continue;
            };
            let mut touched = false;
            for column in &self.allow_list {
                if let Some(value) = change.get(column) {
                    if !is_empty_source(value) {
                        row.insert(column.clone(), value.clone());
                        touched = true;
                    }
                }
            }
            if touched {
                updated += 1;
            }
        }

        let inserted = new_rows.len();
        let columns: Vec<&str> = self.master_columns.iter().map(|c| c.as_str()).collect();
        let additions = RecordSet::from_rows(Vec::new(), new_rows).select(&columns, MISSING);
        let records = records.select(&columns, MISSING).concat(additions);

        debug!(
            key_field = key,
            updated = updated,
            inserted = inserted,
            "主数据回写完成"
        );

        Ok(MasterUpsertOutcome {
            records,
            updated,
            inserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record_set::record_of;

    fn upsert() -> MasterUpsert {
        MasterUpsert::new("SKU", &["GPP", "Brand"], &["SKU", "GPP", "Brand", "Link"])
    }

    fn master() -> RecordSet {
        RecordSet::from_rows(
            vec![],
            vec![
                record_of(&[("SKU", "A"), ("GPP", "OLD"), ("Brand", "X"), ("Link", "http://a")]),
                record_of(&[("SKU", "B"), ("GPP", "KEEP"), ("Brand", "Y"), ("Link", "http://b")]),
            ],
        )
    }

    #[test]
    fn test_updates_allow_list_only_and_appends_new() {
        let verified = RecordSet::from_rows(
            vec![],
            vec![
                record_of(&[("SKU", "A"), ("GPP", "NEW"), ("Brand", ""), ("Link", "ignored")]),
                record_of(&[("SKU", "C"), ("GPP", "PWT-1"), ("Brand", "DEWALT")]),
            ],
        );
        let outcome = upsert().apply(master(), &verified).unwrap();
        let r = &outcome.records;

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(r.len(), 3);
        assert_eq!(r.value(0, "GPP"), "NEW");
        assert_eq!(r.value(0, "Brand"), "X"); // 空值不覆盖
        assert_eq!(r.value(0, "Link"), "http://a"); // 非允许列不动
        assert_eq!(r.value(2, "SKU"), "C");
        assert_eq!(r.value(2, "Link"), MISSING);
        assert_eq!(r.columns(), &["SKU", "GPP", "Brand", "Link"]);
    }

    #[test]
    fn test_master_key_with_trailing_space_is_updated_in_place() {
        let master = RecordSet::from_rows(
            vec![],
            vec![record_of(&[("SKU", "A "), ("GPP", "OLD"), ("Brand", "X"), ("Link", "-")])],
        );
        let verified =
            RecordSet::from_rows(vec![], vec![record_of(&[("SKU", " A"), ("GPP", "NEW")])]);
        let outcome = upsert().apply(master, &verified).unwrap();

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.inserted, 0);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records.value(0, "GPP"), "NEW");
    }

    #[test]
    fn test_empty_master_appends_everything() {
        let verified = RecordSet::from_rows(vec![], vec![record_of(&[("SKU", "Z"), ("GPP", "G")])]);
        let outcome = upsert()
            .apply(RecordSet::with_schema(&["SKU"]), &verified)
            .unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records.value(0, "Brand"), MISSING);
    }

    #[test]
    fn test_missing_key_column() {
        let verified = RecordSet::with_schema(&["GPP"]);
        assert!(upsert().apply(master(), &verified).is_err());
    }
}
