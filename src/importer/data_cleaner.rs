// ==========================================
// 增量对账引擎 - 数据清洗器实现
// ==========================================
// 职责: 文本标准化规则 (TRIM / UPPER / 去空白 / NULL 标准化) 与度量解析
// 说明: 所有键比较与查表前都必须经过这里的函数，保证不同来源格式一致
// ==========================================

use crate::importer::importer_trait::DataCleaner as DataCleanerTrait;

/// TRIM + UPPER
pub fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

/// TRIM + UPPER + 去除所有空白
pub fn compact_upper(value: &str) -> String {
    value
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// TRIM + LOWER + 去除所有空白
pub fn compact_lower(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// 解析度量值（允许千分位逗号）；无法解析 → 0.0
pub fn parse_measure(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str) -> String {
        normalize(value)
    }

    fn compact(&self, value: &str) -> String {
        compact_upper(value)
    }

    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn parse_measure(&self, value: &str) -> f64 {
        parse_measure(value)
    }
}
