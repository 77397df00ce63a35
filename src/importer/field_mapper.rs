// ==========================================
// 增量对账引擎 - 交易字段映射器
// ==========================================
// 职责: 源列别名统一 → 期间 / 分类 / 主键派生 → 分区输出列格式化
// 期间: Fiscal Year + "-" + Fiscal Period(补零至 2 位)
// 分类: GPP Division-GPP Category-GPP Portfolio
// ==========================================

use crate::domain::dataset::{cols, DatasetSpec};
use crate::domain::record_set::{Record, RecordSet};
use crate::importer::data_cleaner::parse_measure;
use crate::importer::key_builder::{KeyBuilder, KEY_DELIMITER};
use chrono::NaiveDate;
use tracing::{debug, warn};

/// 由财年与财期派生期间标签
///
/// # 示例
/// - ("2024", "1") → "2024-01"
/// - ("2024", "12") → "2024-12"
pub fn period_tag(fiscal_year: &str, fiscal_period: &str) -> String {
    let year = strip_decimal(fiscal_year.trim());
    let period = strip_decimal(fiscal_period.trim());
    format!("{}-{:0>2}", year, period)
}

// Excel 数值单元格可能写成 "2024.0"
fn strip_decimal(value: &str) -> &str {
    match value.strip_suffix(".0") {
        Some(v) if !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()) => v,
        _ => value,
    }
}

/// 期间标签 → 月首日期 (YYYY-MM-01)；无法解析返回 None
pub fn period_date(period: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", period), "%Y-%m-%d").ok()
}

/// 度量值格式化（整数不带小数点）
pub fn format_measure(value: f64) -> String {
    format!("{}", value)
}

// ==========================================
// TransactionFieldMapper
// ==========================================
pub struct TransactionFieldMapper {
    spec: DatasetSpec,
    key_builder: KeyBuilder,
}

impl TransactionFieldMapper {
    pub fn new(spec: DatasetSpec) -> Self {
        Self {
            spec,
            key_builder: KeyBuilder::transactional(),
        }
    }

    pub fn spec(&self) -> &DatasetSpec {
        &self.spec
    }

    fn derive_row(&self, row: &mut Record) -> bool {
        let get = |r: &Record, c: &str| r.get(c).cloned().unwrap_or_default();

        let year = get(row, cols::FISCAL_YEAR);
        let fiscal_period = get(row, cols::FISCAL_PERIOD);
        let period = period_tag(&year, &fiscal_period);
        let valid_period = period_date(&period).is_some();

        let classification = [
            get(row, cols::GPP_DIVISION),
            get(row, cols::GPP_CATEGORY),
            get(row, cols::GPP_PORTFOLIO),
        ]
        .join(KEY_DELIMITER);

        let date = period_date(&period)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        row.insert(cols::FK_YEAR_MONTH.to_string(), period);
        row.insert(cols::CLASSIFICATION.to_string(), classification);
        row.insert(cols::FK_DATE.to_string(), date);

        let key = self.key_builder.build_for_parts(row, self.spec.key_parts);
        row.insert(self.spec.key_field.to_string(), key);
        valid_period
    }

    /// 列别名统一并派生期间 / 分类 / 主键
    ///
    /// # 返回
    /// - 期间无法解析的记录数（记录仍保留，主键照常生成）
    pub fn map_records(&self, records: &mut RecordSet) -> usize {
        records.rename_columns(self.spec.aliases);
        for column in [
            cols::FK_YEAR_MONTH,
            cols::CLASSIFICATION,
            cols::FK_DATE,
            self.spec.key_field,
        ] {
            records.ensure_column(column, "");
        }

        let mut invalid_periods = 0;
        for row in records.rows_mut() {
            if !self.derive_row(row) {
                invalid_periods += 1;
            }
        }

        if invalid_periods > 0 {
            warn!(
                dataset = %self.spec.kind,
                invalid_periods = invalid_periods,
                "部分记录的财年/财期无法解析"
            );
        }
        debug!(dataset = %self.spec.kind, rows = records.len(), "字段映射完成");
        invalid_periods
    }

    /// 格式化为分区输出列
    ///
    /// - 文本列: 去首尾空白，"nan" → ""
    /// - 度量列: 解析为浮点，失败 → 0
    pub fn format_partition(&self, records: &RecordSet) -> RecordSet {
        let output_columns = self.spec.output_columns();
        let mut formatted = records.select(&output_columns, "");

        for row in formatted.rows_mut() {
            for column in self.spec.text_columns() {
                if let Some(v) = row.get_mut(column) {
                    let trimmed = v.trim();
                    *v = if trimmed.eq_ignore_ascii_case("nan") {
                        String::new()
                    } else {
                        trimmed.to_string()
                    };
                }
            }
            for column in self.spec.measures {
                if let Some(v) = row.get_mut(*column) {
                    *v = format_measure(parse_measure(v));
                }
            }
        }
        formatted
    }
}
