// ==========================================
// 增量对账引擎 - 分类级联
// ==========================================
// 职责: 为缺少分类的 SKU 依次尝试各级策略，补全 GPP 分类及层级
// 层级: 1) SKU Base → 主数据  2) SAP 声明组合 → GPP 参考表  3) PSD 共享清单 → 固定 GPP
// 红线: 任何一级只填充空字段，永不覆盖已有值；全部失败时保留 "-" 并进入审核
// ==========================================

use crate::domain::product::{product_cols as pc, ProductCandidate, Taxonomy, HIERARCHY_COLUMNS};
use crate::domain::record_set::RecordSet;
use crate::domain::types::{is_missing, GppSource, MISSING};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::sku_base::SkuBaseResolver;
use crate::importer::data_cleaner::compact_upper;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

// ==========================================
// ClassificationReferences - 级联使用的只读参考数据
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ClassificationReferences {
    // ===== Tier 1 =====
    pub sku_bases: SkuBaseResolver,
    /// SKU Base → 主数据中该 Base 首行的分类
    pub master_by_base: HashMap<String, Taxonomy>,

    // ===== Tier 2 =====
    /// (规范化组合描述, 该组合首个 GPP)，按参考表首次出现顺序
    pub portfolios: Vec<(String, String)>,
    /// 规范化 GPP → 层级
    pub gpp_hierarchy: HashMap<String, Taxonomy>,
    /// 规范化后的已知 GPP 集合
    pub known_gpps: HashSet<String>,

    // ===== Tier 3 =====
    pub psd_skus: HashSet<String>,
    pub psd_gpp: String,
}

impl ClassificationReferences {
    /// 由主数据 / GPP 参考表 / PSD 共享清单构建
    ///
    /// # 参数
    /// - master: 产品主数据（需 SKU Base 列）
    /// - gpp_reference: GPP 工作表（需 GPP、组合描述及层级列）
    /// - psd_list: PSD 共享清单（需 SKU 列）
    /// - psd_gpp: 共享清单命中时分配的 GPP
    pub fn build(
        master: &RecordSet,
        gpp_reference: &RecordSet,
        psd_list: &RecordSet,
        psd_gpp: &str,
    ) -> EngineResult<Self> {
        let missing = master.missing_columns(&[pc::SKU_BASE]);
        if !missing.is_empty() {
            return Err(EngineError::missing("master_products", missing));
        }
        let mut gpp_required = vec![pc::GPP];
        gpp_required.extend_from_slice(&HIERARCHY_COLUMNS);
        let missing = gpp_reference.missing_columns(&gpp_required);
        if !missing.is_empty() {
            return Err(EngineError::missing("GPP", missing));
        }
        let missing = psd_list.missing_columns(&[pc::SKU]);
        if !missing.is_empty() {
            return Err(EngineError::missing("PSD", missing));
        }

        let base_values = master.distinct_values(pc::SKU_BASE);
        let sku_bases = SkuBaseResolver::new(base_values.iter());

        let mut master_by_base = HashMap::new();
        for row in master.rows() {
            let base = row.get(pc::SKU_BASE).map(|s| s.trim()).unwrap_or("");
            if is_missing(base) {
                continue;
            }
            master_by_base
                .entry(base.to_string())
                .or_insert_with(|| Taxonomy::from_master_row(row));
        }

        let mut portfolios: Vec<(String, String)> = Vec::new();
        let mut seen_portfolios = HashSet::new();
        let mut gpp_hierarchy = HashMap::new();
        let mut known_gpps = HashSet::new();
        for row in gpp_reference.rows() {
            let gpp = row.get(pc::GPP).map(|s| s.as_str()).unwrap_or("");
            let portfolio = compact_upper(
                row.get(pc::GPP_PORTFOLIO_DESCRIPTION)
                    .map(|s| s.as_str())
                    .unwrap_or(""),
            );
            if seen_portfolios.insert(portfolio.clone()) {
                portfolios.push((portfolio, gpp.trim().to_string()));
            }
            if is_missing(gpp) {
                continue;
            }
            let key = compact_upper(gpp);
            known_gpps.insert(key.clone());
            gpp_hierarchy
                .entry(key)
                .or_insert_with(|| Taxonomy::hierarchy_from_row(row));
        }

        let psd_skus = psd_list
            .rows()
            .iter()
            .filter_map(|r| r.get(pc::SKU))
            .filter(|s| !s.trim().is_empty())
            .map(|s| compact_upper(s))
            .collect();

        debug!(
            bases = sku_bases.len(),
            portfolios = portfolios.len(),
            known_gpps = known_gpps.len(),
            "分类参考数据已加载"
        );

        Ok(Self {
            sku_bases,
            master_by_base,
            portfolios,
            gpp_hierarchy,
            known_gpps,
            psd_skus,
            psd_gpp: psd_gpp.to_string(),
        })
    }

    /// 由 GPP 展开层级；GPP 本身写入结果
    fn expand_gpp(&self, gpp: &str) -> Taxonomy {
        let mut taxonomy = self
            .gpp_hierarchy
            .get(&compact_upper(gpp))
            .cloned()
            .unwrap_or_default();
        taxonomy.gpp = Some(gpp.to_string());
        taxonomy
    }

    /// SAP 组合描述 → GPP
    ///
    /// 首个"以查询串开头"的已知组合决定结果；该组合没有 GPP 时返回 "-"
    fn gpp_for_portfolio(&self, declared: &str) -> Option<String> {
        let query = compact_upper(declared);
        self.portfolios
            .iter()
            .find(|(port, _)| port.starts_with(&query))
            .map(|(_, gpp)| {
                if gpp.is_empty() {
                    MISSING.to_string()
                } else {
                    gpp.clone()
                }
            })
    }

    /// 已知 GPP 校验；通过时返回规范化后的 GPP
    fn verify_gpp(&self, gpp: &str) -> Option<String> {
        let normalized = compact_upper(gpp);
        self.known_gpps.contains(&normalized).then_some(normalized)
    }
}

// ==========================================
// ClassificationTier - 单级分类策略
// ==========================================
/// 单级策略的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierResolution {
    pub taxonomy: Taxonomy,
    pub source: GppSource,
}

pub trait ClassificationTier: Send + Sync {
    fn name(&self) -> &'static str;

    /// 尝试解析；无法解析返回 None
    fn try_resolve(
        &self,
        candidate: &ProductCandidate,
        references: &ClassificationReferences,
    ) -> Option<TierResolution>;
}

/// Tier 1: 复制同 Base 主数据记录的完整分类与属性
pub struct BySkuBase;

impl ClassificationTier for BySkuBase {
    fn name(&self) -> &'static str {
        "sku_base"
    }

    fn try_resolve(
        &self,
        candidate: &ProductCandidate,
        references: &ClassificationReferences,
    ) -> Option<TierResolution> {
        if !candidate.has_sku_base() {
            return None;
        }
        references
            .master_by_base
            .get(&candidate.sku_base)
            .map(|taxonomy| TierResolution {
                taxonomy: taxonomy.clone(),
                source: GppSource::SkuBase,
            })
    }
}

/// Tier 2: 按 SAP 声明的组合描述查 GPP，并校验为已知 GPP
pub struct ByDeclaredPortfolio;

impl ClassificationTier for ByDeclaredPortfolio {
    fn name(&self) -> &'static str {
        "declared_portfolio"
    }

    fn try_resolve(
        &self,
        candidate: &ProductCandidate,
        references: &ClassificationReferences,
    ) -> Option<TierResolution> {
        let declared = candidate
            .declared
            .portfolio_description
            .as_deref()
            .filter(|p| !is_missing(p))?;
        let gpp = references.gpp_for_portfolio(declared)?;
        let verified = references.verify_gpp(&gpp)?;
        Some(TierResolution {
            taxonomy: references.expand_gpp(&verified),
            source: GppSource::DeclaredPortfolio,
        })
    }
}

/// Tier 3: SKU 位于 PSD 共享清单时分配固定 GPP
pub struct BySharedList;

impl ClassificationTier for BySharedList {
    fn name(&self) -> &'static str {
        "shared_psd_list"
    }

    fn try_resolve(
        &self,
        candidate: &ProductCandidate,
        references: &ClassificationReferences,
    ) -> Option<TierResolution> {
        if !references.psd_skus.contains(&compact_upper(&candidate.sku)) {
            return None;
        }
        Some(TierResolution {
            taxonomy: references.expand_gpp(&references.psd_gpp),
            source: GppSource::SharedPsdList,
        })
    }
}

// ==========================================
// ClassificationCascade
// ==========================================
/// 一次级联的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub by_sku_base: usize,
    pub by_portfolio: usize,
    pub by_shared_list: usize,
    pub unresolved: usize,
}

pub struct ClassificationCascade {
    tiers: Vec<Box<dyn ClassificationTier>>,
}

impl Default for ClassificationCascade {
    fn default() -> Self {
        Self::new(vec![
            Box::new(BySkuBase),
            Box::new(ByDeclaredPortfolio),
            Box::new(BySharedList),
        ])
    }
}

impl ClassificationCascade {
    pub fn new(tiers: Vec<Box<dyn ClassificationTier>>) -> Self {
        Self { tiers }
    }

    /// 解析单个候选（SKU Base 须已赋值）
    ///
    /// # 返回
    /// - 命中的来源；全部失败为 Unresolved
    pub fn classify(
        &self,
        candidate: &mut ProductCandidate,
        references: &ClassificationReferences,
    ) -> GppSource {
        for tier in &self.tiers {
            if let Some(resolution) = tier.try_resolve(candidate, references) {
                debug!(sku = %candidate.sku, tier = tier.name(), "分类命中");
                candidate.taxonomy.fill_missing(&resolution.taxonomy);
                candidate.gpp_source = resolution.source;
                return resolution.source;
            }
        }
        candidate.gpp_source = GppSource::Unresolved;
        GppSource::Unresolved
    }

    /// 批量解析：先解析 SKU Base，再逐条级联
    pub fn classify_all(
        &self,
        candidates: &mut [ProductCandidate],
        references: &ClassificationReferences,
    ) -> CascadeSummary {
        let mut summary = CascadeSummary::default();
        for candidate in candidates.iter_mut() {
            candidate.sku_base = references.sku_bases.resolve(&candidate.sku);
            match self.classify(candidate, references) {
                GppSource::SkuBase => summary.by_sku_base += 1,
                GppSource::DeclaredPortfolio => summary.by_portfolio += 1,
                GppSource::SharedPsdList => summary.by_shared_list += 1,
                _ => summary.unresolved += 1,
            }
        }

        if summary.unresolved > 0 {
            warn!(
                unresolved = summary.unresolved,
                total = candidates.len(),
                "部分 SKU 未能通过任何分类层级解析，保留 \"-\" 待人工审核"
            );
        }
        debug!(?summary, "分类级联完成");
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::DeclaredProduct;
    use crate::domain::record_set::record_of;

    fn master() -> RecordSet {
        RecordSet::from_rows(
            vec![],
            vec![
                record_of(&[
                    ("SKU", "DCD771C2"),
                    ("SKU Base", "DCD771"),
                    ("Brand", "DEWALT"),
                    ("GPP", "PWT-10-10A-10001"),
                    ("GPP SBU", "PWT"),
                    ("Batteries Qty", "2"),
                ]),
                record_of(&[
                    ("SKU", "DCD771B"),
                    ("SKU Base", "DCD771"),
                    ("Brand", "OTHER"),
                    ("GPP", "HMT-99"),
                ]),
            ],
        )
    }

    fn gpp_reference() -> RecordSet {
        let mut rows = Vec::new();
        for (gpp, sbu, port) in [
            ("HMT-20-20B-20002", "HMT", "Measuring Tapes"),
            ("HMT-20-20B-20003", "HMT", "Measuring Tapes"),
            ("PSD-70-70X-70999", "PSD", "Shared"),
        ] {
            let mut row = record_of(&[
                ("GPP", gpp),
                ("GPP SBU", sbu),
                ("GPP Portfolio Description", port),
            ]);
            for col in HIERARCHY_COLUMNS {
                row.entry(col.to_string()).or_insert_with(|| "x".to_string());
            }
            rows.push(row);
        }
        RecordSet::from_rows(vec![], rows)
    }

    fn references() -> ClassificationReferences {
        let psd = RecordSet::from_rows(vec![], vec![record_of(&[("SKU", "psd 001")])]);
        ClassificationReferences::build(&master(), &gpp_reference(), &psd, "PSD-70-70X-70999")
            .unwrap()
    }

    fn candidate(sku: &str, portfolio: Option<&str>) -> ProductCandidate {
        let declared = DeclaredProduct {
            brand: Some("STANLEY".to_string()),
            portfolio_description: portfolio.map(|p| p.to_string()),
            ..Default::default()
        };
        ProductCandidate::new(sku, "DESC", declared)
    }

    #[test]
    fn test_tier1_copies_first_master_row_of_base() {
        let refs = references();
        let mut items = vec![candidate("DCD771C2-B3", None)];
        let summary = ClassificationCascade::default().classify_all(&mut items, &refs);

        assert_eq!(summary.by_sku_base, 1);
        let t = &items[0].taxonomy;
        assert_eq!(items[0].sku_base, "DCD771");
        assert_eq!(t.gpp.as_deref(), Some("PWT-10-10A-10001"));
        assert_eq!(t.brand.as_deref(), Some("DEWALT"));
        assert_eq!(t.batteries_qty.as_deref(), Some("2"));
        assert_eq!(items[0].gpp_source, GppSource::SkuBase);
    }

    #[test]
    fn test_tier2_prefix_match_on_portfolio() {
        let refs = references();
        let mut item = candidate("ZZZ1", Some("measuring"));
        let source = ClassificationCascade::default().classify(&mut item, &refs);

        assert_eq!(source, GppSource::DeclaredPortfolio);
        // 同一组合取参考表中的首个 GPP
        assert_eq!(item.taxonomy.gpp.as_deref(), Some("HMT-20-20B-20002"));
        assert_eq!(item.taxonomy.sbu.as_deref(), Some("HMT"));
        assert_eq!(item.effective_brand(), "STANLEY");
    }

    #[test]
    fn test_tier3_shared_list_then_unresolved() {
        let refs = references();
        let cascade = ClassificationCascade::default();

        let mut psd = candidate("PSD001", Some("unknown portfolio"));
        assert_eq!(cascade.classify(&mut psd, &refs), GppSource::SharedPsdList);
        assert_eq!(psd.taxonomy.gpp.as_deref(), Some("PSD-70-70X-70999"));
        assert_eq!(psd.taxonomy.sbu.as_deref(), Some("PSD"));

        let mut lost = candidate("QQQ9", None);
        assert_eq!(cascade.classify(&mut lost, &refs), GppSource::Unresolved);
        assert!(lost.taxonomy.gpp.is_none());
    }

    #[test]
    fn test_existing_values_never_overwritten() {
        let refs = references();
        let mut item = candidate("DCD771C2-B3", None);
        item.taxonomy.brand = Some("BLACK+DECKER".to_string());
        let cascade = ClassificationCascade::default();
        cascade.classify_all(std::slice::from_mut(&mut item), &refs);
        cascade.classify_all(std::slice::from_mut(&mut item), &refs);
        assert_eq!(item.taxonomy.brand.as_deref(), Some("BLACK+DECKER"));
    }

    #[test]
    fn test_missing_reference_column() {
        let gpp = RecordSet::with_schema(&["GPP"]);
        let err = ClassificationReferences::build(&master(), &gpp, &RecordSet::with_schema(&["SKU"]), "X")
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingColumns { .. }));
    }
}
