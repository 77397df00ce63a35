// ==========================================
// 增量对账引擎 - 重复主键诊断
// ==========================================
// 职责: 检测同批次内重复的复合主键
// 说明: 仅诊断并告警；Upsert 以整批 incoming 为准，不在此丢弃记录
// ==========================================

use crate::domain::record_set::RecordSet;
use crate::importer::importer_trait::ConflictHandler as ConflictHandlerTrait;
use std::collections::HashMap;

pub struct ConflictHandler;

impl ConflictHandlerTrait for ConflictHandler {
    /// 检测同批次内重复主键
    ///
    /// # 返回
    /// - Vec<(行号, 主键)>: 重复记录列表（不包括第一次出现）
    fn detect_duplicates(&self, records: &RecordSet, key_field: &str) -> Vec<(usize, String)> {
        let mut first_occurrence: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for (idx, row) in records.rows().iter().enumerate() {
            let row_number = idx + 1;
            if let Some(key) = row.get(key_field) {
                if first_occurrence.contains_key(key.as_str()) {
                    // 发现重复：记录当前行号
                    duplicates.push((row_number, key.clone()));
                } else {
                    // 首次出现：记录行号
                    first_occurrence.insert(key.as_str(), row_number);
                }
            }
        }

        duplicates
    }
}
