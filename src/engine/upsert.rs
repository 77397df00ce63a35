// ==========================================
// 增量对账引擎 - Upsert 引擎
// ==========================================
// 语义: 按主键整行替换（不做字段级合并）
// 顺序: 先保留的历史记录（原顺序），再追加全部 incoming（原顺序）
// 幂等: upsert(upsert(H, I, k), I, k) == upsert(H, I, k)
// ==========================================

use crate::domain::record_set::RecordSet;
use crate::engine::error::{EngineError, EngineResult};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Upsert 结果
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub records: RecordSet,
    /// 被 incoming 替换掉的历史记录数
    pub superseded: usize,
    /// 原样保留的历史记录数
    pub retained: usize,
    pub incoming: usize,
}

// ==========================================
// UpsertEngine
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct UpsertEngine;

impl UpsertEngine {
    pub fn new() -> Self {
        Self
    }

    /// 按主键替换合并
    ///
    /// # 参数
    /// - historical: 历史记录集
    /// - incoming: 新到记录集（调用方须提供完整行）
    /// - key_field: 主键列
    ///
    /// # 返回
    /// - Err(MissingColumns): incoming 或非空 historical 缺少主键列
    pub fn upsert(
        &self,
        historical: RecordSet,
        incoming: RecordSet,
        key_field: &str,
    ) -> EngineResult<UpsertOutcome> {
        if !incoming.has_column(key_field) {
            return Err(EngineError::missing("incoming", vec![key_field.to_string()]));
        }
        if !historical.is_empty() && !historical.has_column(key_field) {
            return Err(EngineError::missing("historical", vec![key_field.to_string()]));
        }

        let keys_to_update: HashSet<String> = incoming
            .rows()
            .iter()
            .map(|r| r.get(key_field).cloned().unwrap_or_default())
            .collect();

        let historical_rows = historical.len();
        let mut filtered = historical;
        filtered.retain(|r| {
            let key = r.get(key_field).map(|s| s.as_str()).unwrap_or("");
            !keys_to_update.contains(key)
        });

        let retained = filtered.len();
        let superseded = historical_rows - retained;
        let incoming_rows = incoming.len();

        let records = if filtered.is_empty() {
            // 全部历史被替换通常意味着主键派生有误
            warn!(
                key_field = key_field,
                historical_rows = historical_rows,
                incoming_rows = incoming_rows,
                "没有可保留的历史记录，结果即 incoming"
            );
            let columns = filtered.columns().to_vec();
            RecordSet::new(columns).concat(incoming)
        } else {
            filtered.concat(incoming)
        };

        debug!(
            key_field = key_field,
            retained = retained,
            superseded = superseded,
            incoming = incoming_rows,
            "Upsert 完成"
        );

        Ok(UpsertOutcome {
            records,
            superseded,
            retained,
            incoming: incoming_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record_set::record_of;

    const KEY: &str = "key";

    fn set(rows: &[(&str, &str)]) -> RecordSet {
        RecordSet::from_rows(
            vec![KEY.to_string(), "qty".to_string()],
            rows.iter()
                .map(|(k, q)| record_of(&[(KEY, k), ("qty", q)]))
                .collect(),
        )
    }

    #[test]
    fn test_replace_by_key_then_append() {
        let historical = set(&[("2024-01-MX-SKU1", "10"), ("2024-01-MX-SKU9", "7")]);
        let incoming = set(&[("2024-01-MX-SKU1", "15"), ("2024-01-MX-SKU2", "5")]);

        let outcome = UpsertEngine.upsert(historical, incoming, KEY).unwrap();
        let rows = outcome.records.rows();
        assert_eq!(outcome.superseded, 1);
        assert_eq!(outcome.retained, 1);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][KEY], "2024-01-MX-SKU9");
        assert_eq!(rows[1][KEY], "2024-01-MX-SKU1");
        assert_eq!(rows[1]["qty"], "15");
        assert_eq!(rows[2][KEY], "2024-01-MX-SKU2");
    }

    #[test]
    fn test_incoming_supersedes_whole_row() {
        let mut historical = set(&[("A", "10")]);
        historical.rows_mut()[0].insert("note".to_string(), "legacy".to_string());
        let incoming = set(&[("A", "11")]);

        let outcome = UpsertEngine.upsert(historical, incoming, KEY).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.records.rows()[0].get("note").is_none());
    }

    #[test]
    fn test_all_history_superseded() {
        let historical = set(&[("A", "1")]);
        let incoming = set(&[("A", "2"), ("B", "3")]);
        let outcome = UpsertEngine.upsert(historical, incoming.clone(), KEY).unwrap();
        assert_eq!(outcome.records.rows(), incoming.rows());
        assert_eq!(outcome.retained, 0);
    }

    #[test]
    fn test_idempotent() {
        let historical = set(&[("A", "1"), ("B", "2"), ("C", "3")]);
        let incoming = set(&[("B", "20"), ("D", "40")]);

        let once = UpsertEngine
            .upsert(historical, incoming.clone(), KEY)
            .unwrap()
            .records;
        let twice = UpsertEngine
            .upsert(once.clone(), incoming, KEY)
            .unwrap()
            .records;
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_key_column() {
        let incoming = RecordSet::with_schema(&["qty"]);
        let err = UpsertEngine
            .upsert(RecordSet::default(), incoming, KEY)
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingColumns { .. }));
    }
}
