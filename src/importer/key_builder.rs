// ==========================================
// 增量对账引擎 - 业务主键构建器
// ==========================================
// 职责: 由规范化后的属性按固定顺序拼接复合主键
// 规则: 分隔符固定为 "-"；缺失部分以空标记替代（不使整条主键失败）
// ==========================================

use crate::domain::dataset::KeyPart;
use crate::domain::record_set::Record;
use crate::importer::data_cleaner::{compact_upper, normalize};

/// 主键分隔符
pub const KEY_DELIMITER: &str = "-";

/// 缺失主键部分的规范化空标记
pub const EMPTY_KEY_PART: &str = "";

/// 主键部分的规范化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    /// TRIM + UPPER（交易分区主键）
    Upper,
    /// TRIM + UPPER + 去空白（主数据主键）
    Compact,
}

// ==========================================
// KeyBuilder
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct KeyBuilder {
    style: KeyStyle,
}

impl KeyBuilder {
    pub fn new(style: KeyStyle) -> Self {
        Self { style }
    }

    /// 交易分区主键构建器
    pub fn transactional() -> Self {
        Self::new(KeyStyle::Upper)
    }

    /// 主数据主键构建器
    pub fn master() -> Self {
        Self::new(KeyStyle::Compact)
    }

    fn normalize_part(&self, part: Option<&str>) -> String {
        match part {
            Some(v) if !v.trim().is_empty() => match self.style {
                KeyStyle::Upper => normalize(v),
                KeyStyle::Compact => compact_upper(v),
            },
            _ => EMPTY_KEY_PART.to_string(),
        }
    }

    /// 按顺序拼接主键
    ///
    /// # 参数
    /// - parts: 有序主键部分；None 或空白 → 空标记
    pub fn build(&self, parts: &[Option<&str>]) -> String {
        parts
            .iter()
            .map(|p| self.normalize_part(*p))
            .collect::<Vec<_>>()
            .join(KEY_DELIMITER)
    }

    /// 从记录中按列取值拼接主键
    pub fn build_from_record(&self, record: &Record, columns: &[&str]) -> String {
        let parts: Vec<Option<&str>> = columns
            .iter()
            .map(|c| record.get(*c).map(|v| v.as_str()))
            .collect();
        self.build(&parts)
    }

    /// 按数据集的主键组成拼接主键
    pub fn build_for_parts(&self, record: &Record, key_parts: &[KeyPart]) -> String {
        let columns: Vec<&str> = key_parts.iter().map(|p| p.column()).collect();
        self.build_from_record(record, &columns)
    }

    /// 主键中缺失部分的数量（用于审核标记）
    pub fn count_missing_parts(record: &Record, key_parts: &[KeyPart]) -> usize {
        key_parts
            .iter()
            .filter(|p| {
                record
                    .get(p.column())
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record_set::record_of;

    #[test]
    fn test_equal_normalized_parts_give_equal_keys() {
        let builder = KeyBuilder::transactional();
        let a = builder.build(&[Some("2024-01"), Some(" mexico"), Some("C001")]);
        let b = builder.build(&[Some("2024-01"), Some("MEXICO "), Some("c001")]);
        assert_eq!(a, b);
        assert_eq!(a, "2024-01-MEXICO-C001");
    }

    #[test]
    fn test_missing_part_uses_empty_marker() {
        let builder = KeyBuilder::transactional();
        let key = builder.build(&[Some("2024-01"), None, Some("PT-DR-DRILLS")]);
        assert_eq!(key, "2024-01--PT-DR-DRILLS");
    }

    #[test]
    fn test_compact_style_strips_inner_spaces() {
        let builder = KeyBuilder::master();
        assert_eq!(builder.build(&[Some("Costa Rica"), Some("10 55")]), "COSTARICA-1055");
    }

    #[test]
    fn test_build_for_parts() {
        let record = record_of(&[
            ("fk_year_month", "2024-02"),
            ("fk_Country", "PERU"),
            ("clasification", "PT-DR-DRILLS"),
        ]);
        let builder = KeyBuilder::transactional();
        let key = builder.build_for_parts(
            &record,
            &[KeyPart::Period, KeyPart::Country, KeyPart::Customer],
        );
        assert_eq!(key, "2024-02-PERU-");
        assert_eq!(
            KeyBuilder::count_missing_parts(&record, &[KeyPart::Period, KeyPart::Customer]),
            1
        );
    }
}
