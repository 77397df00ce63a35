// ==========================================
// 增量对账引擎 - 国家解析器
// ==========================================
// 职责: 由国家参考表为抽取记录补充 fk_Country
// 方式: Demand 按 "Demand Group"; FillRate/Sales 按 "Country Code"+"Destination Country"
// ==========================================

use crate::domain::dataset::{cols, CountryStrategy};
use crate::domain::record_set::RecordSet;
use crate::importer::data_cleaner::normalize;
use crate::importer::error::{ImportError, ImportResult};
use std::collections::HashMap;
use tracing::{info, warn};

// ==========================================
// CountryResolver
// ==========================================
#[derive(Debug, Clone)]
pub struct CountryResolver {
    strategy: CountryStrategy,
    // 规范化查找键 → 国家
    lookup: HashMap<String, String>,
}

impl CountryResolver {
    /// 由参考表构建
    ///
    /// # 参数
    /// - strategy: 解析方式
    /// - reference: 对应工作表的记录集
    ///
    /// # 返回
    /// - Err(ReferenceFileMissing): 参考表缺少查找列（视为参考文件不可用）
    pub fn from_reference(strategy: CountryStrategy, reference: &RecordSet) -> ImportResult<Self> {
        let key_column = strategy.reference_key_column();
        let missing = reference.missing_columns(&[key_column, cols::REF_COUNTRY]);
        if !missing.is_empty() {
            return Err(ImportError::ReferenceFileMissing {
                name: strategy.sheet_name().to_string(),
                message: format!("缺少列 {:?}", missing),
            });
        }

        let mut lookup = HashMap::new();
        for row in reference.rows() {
            let key = normalize(row.get(key_column).map(|s| s.as_str()).unwrap_or(""));
            let country = normalize(row.get(cols::REF_COUNTRY).map(|s| s.as_str()).unwrap_or(""));
            if key.is_empty() {
                continue;
            }
            // 重复键以最后一次出现为准（与 Series 索引映射一致）
            lookup.insert(key, country);
        }

        Ok(Self { strategy, lookup })
    }

    /// 查找国家
    pub fn resolve(&self, lookup_key: &str) -> Option<&str> {
        self.lookup.get(&normalize(lookup_key)).map(|s| s.as_str())
    }

    /// 由记录计算查找键
    fn lookup_key(&self, row: &crate::domain::record_set::Record) -> String {
        self.strategy
            .source_columns()
            .iter()
            .map(|c| row.get(*c).map(|s| s.as_str()).unwrap_or(""))
            .collect::<Vec<_>>()
            .concat()
    }

    /// 为记录集写入 fk_Country；未命中的记录写空值
    ///
    /// # 返回
    /// - 未解析出国家的记录数
    pub fn assign(&self, records: &mut RecordSet) -> usize {
        records.ensure_column(cols::FK_COUNTRY, "");
        let mut unresolved = 0;

        for row in records.rows_mut() {
            let key = self.lookup_key(row);
            let country = match self.resolve(&key) {
                Some(c) => c.to_string(),
                None => {
                    unresolved += 1;
                    String::new()
                }
            };
            row.insert(cols::FK_COUNTRY.to_string(), country);
        }

        if unresolved > 0 {
            warn!(unresolved = unresolved, "部分记录未能解析国家，主键将使用空标记");
        } else {
            info!(rows = records.len(), "国家解析完成");
        }
        unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record_set::record_of;

    fn fill_rate_reference() -> RecordSet {
        RecordSet::from_rows(
            vec!["Country Code Concat".to_string(), "Country".to_string()],
            vec![
                record_of(&[("Country Code Concat", "MX01MX"), ("Country", "Mexico")]),
                record_of(&[("Country Code Concat", "CO01CO"), ("Country", "colombia")]),
            ],
        )
    }

    #[test]
    fn test_code_concat_lookup() {
        let resolver =
            CountryResolver::from_reference(CountryStrategy::CodeConcat, &fill_rate_reference())
                .unwrap();
        let mut records = RecordSet::from_rows(
            vec![],
            vec![
                record_of(&[("Country Code", "MX01"), ("Destination Country", "MX")]),
                record_of(&[("Country Code", "PE01"), ("Destination Country", "PE")]),
            ],
        );
        let unresolved = resolver.assign(&mut records);
        assert_eq!(unresolved, 1);
        assert_eq!(records.value(0, cols::FK_COUNTRY), "MEXICO");
        assert_eq!(records.value(1, cols::FK_COUNTRY), "");
    }

    #[test]
    fn test_reference_without_columns_is_fatal() {
        let bad = RecordSet::with_schema(&["Country"]);
        let err = CountryResolver::from_reference(CountryStrategy::DemandGroup, &bad).unwrap_err();
        assert!(err.is_fatal());
    }
}
