// ==========================================
// 增量对账引擎 - HTS / PWT 工作文件状态
// ==========================================
// 规则: 从主数据中筛出对应 SBU 的 SKU
//       不在现有工作文件中 → "New sku"；在 → "Verified"
//       Verified 但关键字段拼接后仍含 "-" → 字段缺失待复核
// 排序: check_sku, SKU, SKU Base；空值写 "-"
// ==========================================

use crate::domain::product::product_cols as pc;
use crate::domain::record_set::{Record, RecordSet};
use crate::domain::types::{CheckStatus, MISSING};
use crate::importer::data_cleaner::compact_lower;
use std::collections::HashSet;
use tracing::debug;

/// 工作文件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkfileKind {
    Hts,
    Pwt,
}

const COMMON_COLUMNS: [&str; 9] = [
    pc::SKU,
    pc::SKU_BASE,
    pc::SKU_DESCRIPTION,
    pc::BRAND,
    pc::GPP_SBU,
    pc::GPP_DIVISION_CODE,
    pc::GPP_DIVISION_DESCRIPTION,
    pc::GPP_CATEGORY_DESCRIPTION,
    pc::GPP_PORTFOLIO_DESCRIPTION,
];

impl WorkfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkfileKind::Hts => "hts",
            WorkfileKind::Pwt => "pwt",
        }
    }

    /// 适用的 SBU
    pub fn sbu(&self) -> &'static str {
        match self {
            WorkfileKind::Hts => "HMT",
            WorkfileKind::Pwt => "PWT",
        }
    }

    /// 工作文件中的业务列（不含 check_sku）
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = COMMON_COLUMNS.to_vec();
        match self {
            WorkfileKind::Hts => columns.extend_from_slice(&[
                pc::BIG_ROCK,
                pc::TOP_CATEGORY,
                pc::NPI_PROJECT,
                pc::CATEGORIA_HTS,
                pc::FAMILIA_HTS,
                pc::SUB_FAMILIA_HTS,
                pc::CLASE_HTS,
                pc::NPI_PROJECT_HTS,
                pc::POSICIONAMIENTO_HTS,
            ]),
            WorkfileKind::Pwt => columns.extend_from_slice(&[pc::GROUP_1, pc::GROUP_2]),
        }
        columns
    }

    /// 判定"字段缺失"时拼接检查的列
    pub fn completeness_columns(&self) -> &'static [&'static str] {
        match self {
            WorkfileKind::Hts => &[
                pc::CATEGORIA_HTS,
                pc::FAMILIA_HTS,
                pc::SUB_FAMILIA_HTS,
                pc::CLASE_HTS,
                pc::NPI_PROJECT_HTS,
                pc::POSICIONAMIENTO_HTS,
            ],
            WorkfileKind::Pwt => &[pc::GROUP_1, pc::GROUP_2],
        }
    }
}

fn has_incomplete_fields(row: &Record, columns: &[&str]) -> bool {
    let joined: String = columns
        .iter()
        .map(|c| row.get(*c).map(|s| s.as_str()).unwrap_or(""))
        .collect();
    compact_lower(&joined).contains(MISSING)
}

/// 重建工作文件
///
/// # 参数
/// - kind: HTS / PWT
/// - master: 产品主数据
/// - existing: 现有工作文件（判定已确认 SKU）
pub fn build_workfile(kind: WorkfileKind, master: &RecordSet, existing: &RecordSet) -> RecordSet {
    let known: HashSet<&str> = existing
        .rows()
        .iter()
        .filter_map(|r| r.get(pc::SKU))
        .map(|s| s.as_str())
        .collect();

    let columns = kind.columns();
    let mut rows: Vec<Record> = Vec::new();
    for row in master.rows() {
        if row.get(pc::GPP_SBU).map(|s| s.as_str()) != Some(kind.sbu()) {
            continue;
        }
        let sku = row.get(pc::SKU).map(|s| s.as_str()).unwrap_or("");
        let status = if !known.contains(sku) {
            CheckStatus::NewSku
        } else if has_incomplete_fields(row, kind.completeness_columns()) {
            CheckStatus::NeedsReview
        } else {
            CheckStatus::Verified
        };

        let mut out: Record = columns
            .iter()
            .map(|c| {
                let value = row
                    .get(*c)
                    .filter(|v| !v.trim().is_empty())
                    .cloned()
                    .unwrap_or_else(|| MISSING.to_string());
                (c.to_string(), value)
            })
            .collect();
        out.insert(pc::CHECK_SKU.to_string(), status.as_str().to_string());
        rows.push(out);
    }

    let mut all_columns = columns.clone();
    all_columns.push(pc::CHECK_SKU);
    let mut workfile = RecordSet::from_rows(
        all_columns.iter().map(|c| c.to_string()).collect(),
        rows,
    );
    workfile.sort_by_columns(&[pc::CHECK_SKU, pc::SKU, pc::SKU_BASE]);

    debug!(
        workfile = kind.as_str(),
        rows = workfile.len(),
        "工作文件重建完成"
    );
    workfile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record_set::record_of;
    use crate::domain::types::NEEDS_REVIEW_MARKER;

    #[test]
    fn test_pwt_status() {
        let master = RecordSet::from_rows(
            vec![],
            vec![
                record_of(&[("SKU", "P2"), ("GPP SBU", "PWT"), ("Group 1", "Drills"), ("Group 2", "20V")]),
                record_of(&[("SKU", "P1"), ("GPP SBU", "PWT"), ("Group 1", "Drills"), ("Group 2", "-")]),
                record_of(&[("SKU", "P3"), ("GPP SBU", "PWT")]),
                record_of(&[("SKU", "H1"), ("GPP SBU", "HMT")]),
            ],
        );
        let existing = RecordSet::from_rows(
            vec![],
            vec![record_of(&[("SKU", "P1")]), record_of(&[("SKU", "P2")])],
        );

        let workfile = build_workfile(WorkfileKind::Pwt, &master, &existing);
        assert_eq!(workfile.len(), 3);
        // 排序: "New sku" < "SKU Existente..." < "Verified"
        assert_eq!(workfile.value(0, "SKU"), "P3");
        assert_eq!(workfile.value(0, "check_sku"), "New sku");
        assert_eq!(workfile.value(0, "Group 1"), MISSING);
        assert_eq!(workfile.value(1, "SKU"), "P1");
        assert_eq!(workfile.value(1, "check_sku"), NEEDS_REVIEW_MARKER);
        assert_eq!(workfile.value(2, "check_sku"), "Verified");
    }

    #[test]
    fn test_hts_filters_hmt_only() {
        let master = RecordSet::from_rows(
            vec![],
            vec![
                record_of(&[("SKU", "H1"), ("GPP SBU", "HMT"), ("Categoria HTS", "Medicion")]),
                record_of(&[("SKU", "P1"), ("GPP SBU", "PWT")]),
            ],
        );
        let workfile = build_workfile(WorkfileKind::Hts, &master, &RecordSet::default());
        assert_eq!(workfile.len(), 1);
        assert_eq!(workfile.value(0, "Categoria HTS"), "Medicion");
        assert!(workfile.has_column("Posicionamiento HTS"));
    }
}
