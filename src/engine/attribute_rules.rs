// ==========================================
// 增量对账引擎 - 属性推断规则
// ==========================================
// 职责: 由 SKU 编码与描述推断 动力类型 / 电池数量 / 电压 / Bare 状态 / 子品牌
// 规则: 每个属性按固定优先级逐条匹配，首条命中即返回；均未命中时保留原值
// 输入: 全部文本先去空格并转大写后比较
// ==========================================

use crate::config::rule_tables::{RuleTables, SubBrandRule};
use crate::domain::product::ProductCandidate;
use crate::domain::types::{is_missing, BareStatus, PowerType, MISSING};
use crate::importer::data_cleaner::compact_upper;

// ==========================================
// AttributeRules
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct AttributeRules {
    tables: RuleTables,
}

fn contains_any(haystack: &str, tokens: &[String]) -> bool {
    tokens.iter().any(|t| haystack.contains(t.as_str()))
}

fn starts_with_any(haystack: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| haystack.starts_with(p.as_str()))
}

/// 取 "/" 之前的主体编码
fn sku_head(sku: &str) -> String {
    let normalized = compact_upper(sku);
    normalized
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn prior_or_missing(prior: Option<&str>) -> Option<String> {
    prior.filter(|p| !is_missing(p)).map(|p| p.to_string())
}

impl AttributeRules {
    pub fn new(tables: RuleTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &RuleTables {
        &self.tables
    }

    /// 动力类型
    ///
    /// # 参数
    /// - sku / description: 产品编码与描述
    /// - category / portfolio: GPP 品类与组合描述
    /// - prior: 当前已有值（无规则命中时原样返回）
    pub fn power_type(
        &self,
        sku: &str,
        description: &str,
        category: &str,
        portfolio: &str,
        prior: Option<&str>,
    ) -> Option<String> {
        let rules = &self.tables.power_type;
        let sku = compact_upper(sku);
        let description = compact_upper(description);
        let category_portfolio = format!("{}{}", compact_upper(category), compact_upper(portfolio));

        // 优先级 1: SKU 前缀
        if starts_with_any(&sku, &rules.cordless_sku_prefixes) {
            return Some(PowerType::Cordless.as_str().to_string());
        }
        if starts_with_any(&sku, &rules.corded_sku_prefixes) {
            return Some(PowerType::Corded.as_str().to_string());
        }

        // 优先级 2: 描述关键字
        if contains_any(&description, &rules.corded_description_tokens) {
            return Some(PowerType::Corded.as_str().to_string());
        }
        if contains_any(&description, &rules.cordless_description_tokens)
            && !description.contains(rules.cordless_exclusion_token.as_str())
        {
            return Some(PowerType::Cordless.as_str().to_string());
        }

        // 优先级 3: 品类 + 组合
        if contains_any(&category_portfolio, &rules.cordless_category_tokens) {
            return Some(PowerType::Cordless.as_str().to_string());
        }
        if contains_any(&category_portfolio, &rules.corded_category_tokens) {
            return Some(PowerType::Corded.as_str().to_string());
        }

        // 优先级 4: 燃油
        if contains_any(&description, &rules.gas_description_tokens) {
            return Some(PowerType::Gas.as_str().to_string());
        }

        prior_or_missing(prior)
    }

    /// 电池数量
    ///
    /// SKU 末两位属于电池编码表时，数量取已知值的最后一个字符；
    /// 以 Bare 后缀结尾时为 "0"；否则保留原值
    pub fn battery_qty(&self, sku: &str, prior: Option<&str>) -> Option<String> {
        let head = sku_head(sku);
        let chars: Vec<char> = head.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(2)..].iter().collect();

        if self.tables.battery_codes.iter().any(|code| *code == tail) {
            return prior_or_missing(prior)
                .and_then(|p| p.chars().last())
                .map(|c| c.to_string());
        }
        if head.ends_with(self.tables.bare_suffix.as_str()) {
            return Some("0".to_string());
        }
        prior_or_missing(prior)
    }

    /// 电压：描述中首个命中的电压标记（含 220V 时不取），否则原值，否则 "-"
    pub fn voltage(&self, description: &str, prior: Option<&str>) -> String {
        let description = compact_upper(description);
        if !description.contains(self.tables.voltage_exclusion_token.as_str()) {
            if let Some(token) = self
                .tables
                .voltage_tokens
                .iter()
                .find(|t| description.contains(t.as_str()))
            {
                return token.clone();
            }
        }
        prior_or_missing(prior).unwrap_or_else(|| MISSING.to_string())
    }

    /// Bare 状态（仅 Cordless 评估）
    ///
    /// # 返回
    /// - None: 非 Cordless
    pub fn bare(&self, sku: &str, battery_qty: &str, power_type: &str) -> Option<BareStatus> {
        if compact_upper(power_type) != PowerType::Cordless.as_str() {
            return None;
        }
        let head = sku_head(sku);
        let qty = if battery_qty.contains('-') {
            0
        } else {
            battery_qty
                .trim()
                .parse::<f64>()
                .map(|q| q as i64)
                .unwrap_or(0)
        };

        let ends_bare = head.ends_with(self.tables.bare_suffix.as_str());
        Some(match (qty, ends_bare) {
            (0, _) => BareStatus::Bare,
            (_, false) => BareStatus::NonBare,
            (_, true) => BareStatus::BarePlusBatteries,
        })
    }

    /// 子品牌（按规则顺序，首条命中）
    pub fn sub_brand(&self, sku: &str, description: &str, brand: &str) -> String {
        let description = compact_upper(description);
        let brand = compact_upper(brand);
        let sku = sku.trim();

        for rule in &self.tables.sub_brand_rules {
            let hit = match rule {
                SubBrandRule::DescriptionContains { token, sub_brand } => {
                    description.contains(token.as_str()).then_some(sub_brand)
                }
                SubBrandRule::SkuPrefixWithBrand {
                    prefix,
                    brand: required,
                    sub_brand,
                } => (sku.starts_with(prefix.as_str()) && brand == compact_upper(required))
                    .then_some(sub_brand),
                SubBrandRule::SkuPrefix { prefix, sub_brand } => {
                    sku.starts_with(prefix.as_str()).then_some(sub_brand)
                }
            };
            if let Some(sub_brand) = hit {
                return sub_brand.clone();
            }
        }
        MISSING.to_string()
    }

    /// 对候选 SKU 依次推断全部属性（动力类型 → 电池 → 电压 → Bare → 子品牌）
    pub fn apply(&self, candidate: &mut ProductCandidate) {
        let sku = candidate.sku.clone();
        let description = candidate.description.clone();
        let brand = candidate.effective_brand().to_string();
        let t = &mut candidate.taxonomy;

        t.power_type = self.power_type(
            &sku,
            &description,
            t.category_description.as_deref().unwrap_or(MISSING),
            t.portfolio_description.as_deref().unwrap_or(MISSING),
            t.power_type.as_deref(),
        );
        t.batteries_qty = self.battery_qty(&sku, t.batteries_qty.as_deref());
        t.voltage = Some(self.voltage(&description, t.voltage.as_deref()));
        t.bare = self
            .bare(
                &sku,
                t.batteries_qty.as_deref().unwrap_or(MISSING),
                t.power_type.as_deref().unwrap_or(MISSING),
            )
            .map(|b| b.as_str().to_string());
        candidate.sub_brand = self.sub_brand(&sku, &description, &brand);
    }
}
