// ==========================================
// 增量对账引擎 - 产品主数据领域模型
// ==========================================
// 职责: 产品主数据列定义 / Taxonomy 分类结果 / 待分类候选 SKU
// 约定: Taxonomy 字段为 None 表示"尚未填充"，落盘时统一写 "-"
// ==========================================

use crate::domain::record_set::Record;
use crate::domain::types::{is_missing, GppSource, MISSING};
use serde::{Deserialize, Serialize};

/// 产品主数据与审核文件使用的列名
pub mod product_cols {
    pub const SKU: &str = "SKU";
    pub const SKU_BASE: &str = "SKU Base";
    pub const SKU_DESCRIPTION: &str = "SKU Description";
    pub const BRAND: &str = "Brand";
    pub const GPP: &str = "GPP";
    pub const GPP_SBU: &str = "GPP SBU";
    pub const GPP_SBU_DESCRIPTION: &str = "GPP SBU Description";
    pub const SBU_TYPE: &str = "SBU Type";
    pub const GPP_DIVISION_CODE: &str = "GPP Division Code";
    pub const GPP_DIVISION_DESCRIPTION: &str = "GPP Division Description";
    pub const GPP_CATEGORY_CODE: &str = "GPP Category Code";
    pub const GPP_CATEGORY_DESCRIPTION: &str = "GPP Category Description";
    pub const GPP_PORTFOLIO_CODE: &str = "GPP Portfolio Code";
    pub const GPP_PORTFOLIO_DESCRIPTION: &str = "GPP Portfolio Description";
    pub const POWER_TYPE: &str = "Corded / Cordless";
    pub const BATTERIES_QTY: &str = "Batteries Qty";
    pub const VOLTAGE: &str = "Voltaje";
    pub const BARE: &str = "Bare";
    pub const SUB_BRAND: &str = "Sub-Brand";

    // ===== 审核工作列 =====
    pub const ORIGIN: &str = "origen_sku";
    pub const HOW_ASSIGNED: &str = "¿como se asigno gpp?";
    pub const CHECK_SKU: &str = "check_sku";

    // ===== 主数据扩展列 =====
    pub const BRAND_GROUP: &str = "Brand Group";
    pub const BRAND_SBU: &str = "Brand + SBU";
    pub const GROUP_1: &str = "Group 1";
    pub const GROUP_2: &str = "Group 2";
    pub const CATEGORY_GROUP: &str = "Category Group";
    pub const BIG_ROCK: &str = "Big Rock";
    pub const TOP_CATEGORY: &str = "Top Category";
    pub const NPI_PROJECT: &str = "NPI Project";
    pub const CATEGORIA_HTS: &str = "Categoria HTS";
    pub const FAMILIA_HTS: &str = "Familia HTS";
    pub const SUB_FAMILIA_HTS: &str = "Sub Familia HTS";
    pub const CLASE_HTS: &str = "Clase HTS";
    pub const NPI_PROJECT_HTS: &str = "NPI Project HTS";
    pub const POSICIONAMIENTO_HTS: &str = "Posicionamiento HTS";
    pub const LINK: &str = "Link";
}

use product_cols as pc;

/// GPP 层级列（Tier 2/3 通过 GPP 展开）
pub const HIERARCHY_COLUMNS: [&str; 9] = [
    pc::GPP_SBU,
    pc::GPP_SBU_DESCRIPTION,
    pc::SBU_TYPE,
    pc::GPP_DIVISION_CODE,
    pc::GPP_DIVISION_DESCRIPTION,
    pc::GPP_CATEGORY_CODE,
    pc::GPP_CATEGORY_DESCRIPTION,
    pc::GPP_PORTFOLIO_CODE,
    pc::GPP_PORTFOLIO_DESCRIPTION,
];

/// 审核后允许覆写到主数据的分类列
pub const CLASSIFICATION_ALLOW_LIST: [&str; 18] = [
    pc::SKU_BASE,
    pc::SKU_DESCRIPTION,
    pc::BRAND,
    pc::GPP,
    pc::GPP_SBU,
    pc::GPP_SBU_DESCRIPTION,
    pc::SBU_TYPE,
    pc::GPP_DIVISION_CODE,
    pc::GPP_DIVISION_DESCRIPTION,
    pc::GPP_CATEGORY_CODE,
    pc::GPP_CATEGORY_DESCRIPTION,
    pc::GPP_PORTFOLIO_CODE,
    pc::GPP_PORTFOLIO_DESCRIPTION,
    pc::POWER_TYPE,
    pc::BATTERIES_QTY,
    pc::VOLTAGE,
    pc::BARE,
    pc::SUB_BRAND,
];

/// HTS 工作文件回写列
pub const HTS_UPDATE_COLUMNS: [&str; 9] = [
    pc::BIG_ROCK,
    pc::TOP_CATEGORY,
    pc::NPI_PROJECT,
    pc::CATEGORIA_HTS,
    pc::FAMILIA_HTS,
    pc::SUB_FAMILIA_HTS,
    pc::CLASE_HTS,
    pc::NPI_PROJECT_HTS,
    pc::POSICIONAMIENTO_HTS,
];

/// PWT 工作文件回写列
pub const PWT_UPDATE_COLUMNS: [&str; 2] = [pc::GROUP_1, pc::GROUP_2];

/// 由 GPP 查得的分组列
pub const GPP_GROUP_COLUMNS: [&str; 3] = [pc::CATEGORY_GROUP, pc::BIG_ROCK, pc::TOP_CATEGORY];

/// 产品主数据完整列（输出顺序）
pub fn master_product_columns() -> Vec<&'static str> {
    let mut columns = vec![pc::SKU];
    columns.extend_from_slice(&CLASSIFICATION_ALLOW_LIST);
    columns.extend_from_slice(&[
        pc::BRAND_GROUP,
        pc::BRAND_SBU,
        pc::GROUP_1,
        pc::GROUP_2,
        pc::CATEGORY_GROUP,
        pc::BIG_ROCK,
        pc::TOP_CATEGORY,
        pc::NPI_PROJECT,
        pc::CATEGORIA_HTS,
        pc::FAMILIA_HTS,
        pc::SUB_FAMILIA_HTS,
        pc::CLASE_HTS,
        pc::NPI_PROJECT_HTS,
        pc::POSICIONAMIENTO_HTS,
        pc::LINK,
    ]);
    columns
}

/// 审核工作文件列（输出顺序）
pub fn review_columns() -> Vec<&'static str> {
    let mut columns = vec![pc::SKU];
    columns.extend_from_slice(&CLASSIFICATION_ALLOW_LIST);
    columns.extend_from_slice(&[pc::ORIGIN, pc::HOW_ASSIGNED, pc::CHECK_SKU]);
    columns
}

fn cell(value: Option<&String>) -> Option<String> {
    value.filter(|v| !is_missing(v)).map(|v| v.trim().to_string())
}

// ==========================================
// Taxonomy - GPP 分类及物理属性
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    // ===== 品牌与 GPP =====
    pub brand: Option<String>,
    pub gpp: Option<String>,

    // ===== GPP 层级 =====
    pub sbu: Option<String>,
    pub sbu_description: Option<String>,
    pub sbu_type: Option<String>,
    pub division_code: Option<String>,
    pub division_description: Option<String>,
    pub category_code: Option<String>,
    pub category_description: Option<String>,
    pub portfolio_code: Option<String>,
    pub portfolio_description: Option<String>,

    // ===== 物理属性 =====
    pub power_type: Option<String>,
    pub batteries_qty: Option<String>,
    pub voltage: Option<String>,
    pub bare: Option<String>,
}

impl Taxonomy {
    /// 从主数据行读取完整分类（Tier 1 数据源）
    pub fn from_master_row(row: &Record) -> Self {
        let mut taxonomy = Self::hierarchy_from_row(row);
        taxonomy.brand = cell(row.get(pc::BRAND));
        taxonomy.gpp = cell(row.get(pc::GPP));
        taxonomy.power_type = cell(row.get(pc::POWER_TYPE));
        taxonomy.batteries_qty = cell(row.get(pc::BATTERIES_QTY));
        taxonomy.voltage = cell(row.get(pc::VOLTAGE));
        taxonomy.bare = cell(row.get(pc::BARE));
        taxonomy
    }

    /// 从 GPP 参考表行读取层级（Tier 2/3 展开用）
    pub fn hierarchy_from_row(row: &Record) -> Self {
        Self {
            sbu: cell(row.get(pc::GPP_SBU)),
            sbu_description: cell(row.get(pc::GPP_SBU_DESCRIPTION)),
            sbu_type: cell(row.get(pc::SBU_TYPE)),
            division_code: cell(row.get(pc::GPP_DIVISION_CODE)),
            division_description: cell(row.get(pc::GPP_DIVISION_DESCRIPTION)),
            category_code: cell(row.get(pc::GPP_CATEGORY_CODE)),
            category_description: cell(row.get(pc::GPP_CATEGORY_DESCRIPTION)),
            portfolio_code: cell(row.get(pc::GPP_PORTFOLIO_CODE)),
            portfolio_description: cell(row.get(pc::GPP_PORTFOLIO_DESCRIPTION)),
            ..Default::default()
        }
    }

    fn fields_mut(&mut self) -> [&mut Option<String>; 15] {
        [
            &mut self.brand,
            &mut self.gpp,
            &mut self.sbu,
            &mut self.sbu_description,
            &mut self.sbu_type,
            &mut self.division_code,
            &mut self.division_description,
            &mut self.category_code,
            &mut self.category_description,
            &mut self.portfolio_code,
            &mut self.portfolio_description,
            &mut self.power_type,
            &mut self.batteries_qty,
            &mut self.voltage,
            &mut self.bare,
        ]
    }

    fn fields(&self) -> [&Option<String>; 15] {
        [
            &self.brand,
            &self.gpp,
            &self.sbu,
            &self.sbu_description,
            &self.sbu_type,
            &self.division_code,
            &self.division_description,
            &self.category_code,
            &self.category_description,
            &self.portfolio_code,
            &self.portfolio_description,
            &self.power_type,
            &self.batteries_qty,
            &self.voltage,
            &self.bare,
        ]
    }

    /// 仅填充尚为空的字段；已有值永不覆盖
    ///
    /// # 返回
    /// - 本次实际填充的字段数
    pub fn fill_missing(&mut self, other: &Taxonomy) -> usize {
        let mut filled = 0;
        for (target, source) in self.fields_mut().into_iter().zip(other.fields()) {
            if target.is_none() {
                if let Some(v) = source {
                    *target = Some(v.clone());
                    filled += 1;
                }
            }
        }
        filled
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|f| f.is_none())
    }
}

// ==========================================
// DeclaredProduct - 源系统(SAP)声明的产品信息
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredProduct {
    pub brand: Option<String>,
    pub division_code: Option<String>,
    pub division_description: Option<String>,
    pub category_description: Option<String>,
    pub portfolio_description: Option<String>,
}

// ==========================================
// ProductCandidate - 待分类 SKU（审核工作项）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCandidate {
    pub sku: String,
    pub description: String,
    pub declared: DeclaredProduct,
    pub sku_base: String,
    pub taxonomy: Taxonomy,
    pub sub_brand: String,
    pub gpp_source: GppSource,
    pub origin: String,
    pub check_sku: String,
}

/// 新 SKU 的来源标记
pub const ORIGIN_NEW_SKU: &str = "new sku";
/// 主数据中 SKU Base 分类不一致的来源标记
pub const ORIGIN_INCONSISTENT_BASE: &str = "SKU Base con diferentes sbu-category";

impl ProductCandidate {
    pub fn new(sku: &str, description: &str, declared: DeclaredProduct) -> Self {
        Self {
            sku: sku.trim().to_string(),
            description: description.trim().to_string(),
            declared,
            sku_base: MISSING.to_string(),
            taxonomy: Taxonomy::default(),
            sub_brand: MISSING.to_string(),
            gpp_source: GppSource::Unresolved,
            origin: ORIGIN_NEW_SKU.to_string(),
            check_sku: MISSING.to_string(),
        }
    }

    pub fn has_sku_base(&self) -> bool {
        !is_missing(&self.sku_base)
    }

    /// 当前可见品牌：分类结果优先，其次为源系统声明
    pub fn effective_brand(&self) -> &str {
        self.taxonomy
            .brand
            .as_deref()
            .or(self.declared.brand.as_deref())
            .unwrap_or(MISSING)
    }

    /// 转换为审核工作文件行（缺失值统一写 "-"）
    pub fn to_review_row(&self) -> Record {
        let t = &self.taxonomy;
        let or_missing = |v: &Option<String>| v.clone().unwrap_or_else(|| MISSING.to_string());

        let pairs: Vec<(&str, String)> = vec![
            (pc::SKU, self.sku.clone()),
            (pc::SKU_BASE, self.sku_base.clone()),
            (pc::SKU_DESCRIPTION, non_empty(&self.description)),
            (pc::BRAND, self.effective_brand().to_string()),
            (pc::GPP, or_missing(&t.gpp)),
            (pc::GPP_SBU, or_missing(&t.sbu)),
            (pc::GPP_SBU_DESCRIPTION, or_missing(&t.sbu_description)),
            (pc::SBU_TYPE, or_missing(&t.sbu_type)),
            (pc::GPP_DIVISION_CODE, or_missing(&t.division_code)),
            (pc::GPP_DIVISION_DESCRIPTION, or_missing(&t.division_description)),
            (pc::GPP_CATEGORY_CODE, or_missing(&t.category_code)),
            (pc::GPP_CATEGORY_DESCRIPTION, or_missing(&t.category_description)),
            (pc::GPP_PORTFOLIO_CODE, or_missing(&t.portfolio_code)),
            (pc::GPP_PORTFOLIO_DESCRIPTION, or_missing(&t.portfolio_description)),
            (pc::POWER_TYPE, or_missing(&t.power_type)),
            (pc::BATTERIES_QTY, or_missing(&t.batteries_qty)),
            (pc::VOLTAGE, or_missing(&t.voltage)),
            (pc::BARE, or_missing(&t.bare)),
            (pc::SUB_BRAND, self.sub_brand.clone()),
            (pc::ORIGIN, self.origin.clone()),
            (pc::HOW_ASSIGNED, self.gpp_source.label().to_string()),
            (pc::CHECK_SKU, self.check_sku.clone()),
        ];

        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

fn non_empty(value: &str) -> String {
    if value.trim().is_empty() {
        MISSING.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record_set::record_of;

    #[test]
    fn test_fill_missing_never_overwrites() {
        let mut target = Taxonomy {
            gpp: Some("PWT-10-10A-10001".to_string()),
            ..Default::default()
        };
        let source = Taxonomy {
            gpp: Some("HMT-20-20B-20002".to_string()),
            sbu: Some("HMT".to_string()),
            ..Default::default()
        };

        let filled = target.fill_missing(&source);
        assert_eq!(filled, 1);
        assert_eq!(target.gpp.as_deref(), Some("PWT-10-10A-10001"));
        assert_eq!(target.sbu.as_deref(), Some("HMT"));
    }

    #[test]
    fn test_from_master_row_treats_sentinel_as_missing() {
        let row = record_of(&[("GPP", "PWT-1"), ("Voltaje", "-"), ("Brand", "DEWALT")]);
        let taxonomy = Taxonomy::from_master_row(&row);
        assert_eq!(taxonomy.gpp.as_deref(), Some("PWT-1"));
        assert!(taxonomy.voltage.is_none());
    }

    #[test]
    fn test_review_row_has_all_columns() {
        let candidate = ProductCandidate::new("DCD771C2", "DRILL 20V", DeclaredProduct::default());
        let row = candidate.to_review_row();
        for col in review_columns() {
            assert!(row.contains_key(col), "缺少列 {}", col);
        }
        assert_eq!(row[pc::GPP], "-");
        assert_eq!(row[pc::ORIGIN], ORIGIN_NEW_SKU);
        assert_eq!(row[pc::HOW_ASSIGNED], "sin gpp asignado");
    }
}
