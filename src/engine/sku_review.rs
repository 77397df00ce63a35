// ==========================================
// 增量对账引擎 - SKU 审核工作项
// ==========================================
// 职责: 新 SKU 候选抽取 / 主数据中分类不一致的 SKU Base / 已确认变更筛选
// ==========================================

use crate::domain::product::{
    product_cols as pc, review_columns, DeclaredProduct, ProductCandidate,
    ORIGIN_INCONSISTENT_BASE,
};
use crate::domain::record_set::{Record, RecordSet};
use crate::domain::types::{is_missing, CheckStatus, GppSource, MISSING};
use crate::importer::data_cleaner::compact_upper;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// 交易抽取文件中的产品列（SKU 列, 描述列）
pub struct ExtractProductColumns {
    pub sku: &'static str,
    pub description: &'static str,
}

/// FillRate / Sales 抽取
pub const COUNTRY_MATERIAL_COLUMNS: ExtractProductColumns = ExtractProductColumns {
    sku: "Country Material",
    description: "Country Material Name",
};

/// Demand 抽取
pub const GLOBAL_MATERIAL_COLUMNS: ExtractProductColumns = ExtractProductColumns {
    sku: "Global Material",
    description: "Global Material Description",
};

/// 抽取文件中的 SAP 声明列
pub const DECLARED_BRAND: &str = "LAG Brand";
pub const DECLARED_DIVISION_CODE: &str = "GPP Division Code";
pub const DECLARED_DIVISION: &str = "GPP Division";
pub const DECLARED_CATEGORY: &str = "GPP Category";
pub const DECLARED_PORTFOLIO: &str = "GPP Portfolio";

fn declared_cell(row: &Record, column: &str) -> Option<String> {
    row.get(column)
        .filter(|v| !is_missing(v))
        .map(|v| v.trim().to_string())
}

/// 从抽取记录构建候选（SKU 规范化为大写且去空白）
fn candidate_from_extract(row: &Record, columns: &ExtractProductColumns) -> Option<ProductCandidate> {
    let sku = compact_upper(row.get(columns.sku).map(|s| s.as_str()).unwrap_or(""));
    if sku.is_empty() {
        return None;
    }
    let description = row.get(columns.description).map(|s| s.as_str()).unwrap_or("");
    let declared = DeclaredProduct {
        brand: declared_cell(row, DECLARED_BRAND),
        division_code: declared_cell(row, DECLARED_DIVISION_CODE),
        division_description: declared_cell(row, DECLARED_DIVISION),
        category_description: declared_cell(row, DECLARED_CATEGORY),
        portfolio_description: declared_cell(row, DECLARED_PORTFOLIO),
    };
    Some(ProductCandidate::new(&sku, description, declared))
}

/// 抽取新 SKU 候选
///
/// # 参数
/// - country_material_extracts: FillRate + Sales 抽取（按此顺序在前）
/// - demand_extract: Demand 抽取
/// - master: 产品主数据
///
/// # 返回
/// - 按 SKU 去重（首次出现为准）且不在主数据中的候选
pub fn collect_new_products(
    country_material_extracts: &[&RecordSet],
    demand_extract: &RecordSet,
    master: &RecordSet,
) -> Vec<ProductCandidate> {
    let master_skus: HashSet<String> = master
        .rows()
        .iter()
        .filter_map(|r| r.get(pc::SKU))
        .map(|s| compact_upper(s))
        .collect();

    let sources = country_material_extracts
        .iter()
        .map(|set| (*set, &COUNTRY_MATERIAL_COLUMNS))
        .chain(std::iter::once((demand_extract, &GLOBAL_MATERIAL_COLUMNS)));

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();
    for (set, columns) in sources {
        for row in set.rows() {
            let Some(candidate) = candidate_from_extract(row, columns) else {
                continue;
            };
            if !seen.insert(candidate.sku.clone()) {
                continue;
            }
            if master_skus.contains(&candidate.sku) {
                continue;
            }
            candidates.push(candidate);
        }
    }

    debug!(
        distinct_skus = seen.len(),
        new_skus = candidates.len(),
        "新 SKU 候选抽取完成"
    );
    candidates
}

/// 主数据中映射到多个 (SBU-品类) 组合的 SKU Base 的全部行
///
/// 输出为审核文件列，来源标记为"分类不一致"，check_sku 为 "-"
pub fn inconsistent_bases(master: &RecordSet) -> RecordSet {
    let mut combos: HashMap<&str, HashSet<String>> = HashMap::new();
    for row in master.rows() {
        let Some(base) = row.get(pc::SKU_BASE).map(|s| s.as_str()) else {
            continue;
        };
        if base.trim().is_empty() {
            continue;
        }
        let combo = format!(
            "{}-{}",
            row.get(pc::GPP_SBU).map(|s| s.as_str()).unwrap_or(""),
            row.get(pc::GPP_CATEGORY_DESCRIPTION)
                .map(|s| s.as_str())
                .unwrap_or("")
        );
        combos.entry(base).or_default().insert(combo);
    }
    let flagged: HashSet<&str> = combos
        .into_iter()
        .filter(|(_, set)| set.len() > 1)
        .map(|(base, _)| base)
        .collect();

    let mut rows: Vec<Record> = Vec::new();
    for row in master.rows() {
        let base = row.get(pc::SKU_BASE).map(|s| s.as_str()).unwrap_or("");
        if !flagged.contains(base) {
            continue;
        }
        let mut review = row.clone();
        review.insert(pc::ORIGIN.to_string(), ORIGIN_INCONSISTENT_BASE.to_string());
        review.insert(
            pc::HOW_ASSIGNED.to_string(),
            GppSource::CurrentMaster.label().to_string(),
        );
        review.insert(pc::CHECK_SKU.to_string(), MISSING.to_string());
        rows.push(review);
    }

    debug!(
        flagged_bases = flagged.len(),
        rows = rows.len(),
        "分类不一致的 SKU Base 检查完成"
    );
    RecordSet::from_rows(Vec::new(), rows).select(&review_columns(), MISSING)
}

/// 审核文件中已确认（verified / ok）的行
pub fn accepted_changes(review: &RecordSet) -> RecordSet {
    let mut accepted = review.clone();
    accepted.retain(|row| {
        row.get(pc::CHECK_SKU)
            .map(|v| CheckStatus::parse(v).is_accepted())
            .unwrap_or(false)
    });
    accepted
}
