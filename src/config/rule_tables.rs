// ==========================================
// 增量对账引擎 - 业务规则表
// ==========================================
// 职责: 属性推断 / 品牌标准化 / 渠道默认值所需的全部查找表
// 约定: 构造后不可变，按引用注入各组件；可由 config_kv 中的 JSON 整体覆写
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// ==========================================
// PowerTypeRules - 动力类型判定表
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerTypeRules {
    // ===== 优先级 1: SKU 前缀 =====
    pub cordless_sku_prefixes: Vec<String>,
    pub corded_sku_prefixes: Vec<String>,

    // ===== 优先级 2: 描述关键字 =====
    pub corded_description_tokens: Vec<String>,
    pub cordless_description_tokens: Vec<String>,
    /// 描述含此标记时不判定为 Cordless
    pub cordless_exclusion_token: String,

    // ===== 优先级 3: 品类 + 组合描述关键字 =====
    pub cordless_category_tokens: Vec<String>,
    pub corded_category_tokens: Vec<String>,

    // ===== 优先级 4: 燃油关键字 =====
    pub gas_description_tokens: Vec<String>,
}

impl Default for PowerTypeRules {
    fn default() -> Self {
        Self {
            cordless_sku_prefixes: strings(&["BDC", "CMC", "DWC", "PCC", "STC", "DC"]),
            corded_sku_prefixes: strings(&["DWE", "FME", "BEW", "KS"]),
            corded_description_tokens: strings(&[
                "CRD", "CORDED", "ALAMBRICO", "ELECTRIC", "WATT", "AMPER", "AMP", "STATIONARY",
                "BENCHTOP", "COMPRESSOR", "0W", "110V", "120V", "220V", "230V", "127V",
            ]),
            cordless_description_tokens: strings(&[
                "CORDLESS", "CDL", "INALAMBRIC", "BATTERY", "BATT", "BRUSHLESS", "XR", "MAX",
                "LI-ION", "2.4V", "3.6V", "3.8V", "4V", "4.8V", "6V", "7.2V", "8V", "9.6V",
                "10.8V", "12V", "14.4V", "16V", "18V", "20V", "24V", "36V", "40V", "54V", "60V",
                "CHARGER", "CARGADOR",
            ]),
            cordless_exclusion_token: "220V".to_string(),
            cordless_category_tokens: strings(&["CDL", "CORDLESS", "20V", "12V"]),
            corded_category_tokens: strings(&["CORDED", "CRD"]),
            gas_description_tokens: strings(&[
                "GAS", "GASOLINE", "GASOLINA", "0CC", "1CC", "2CC", "3CC", "4CC", "5CC", "6CC",
                "7CC", "8CC", "9CC", "10CC", "0PSI",
            ]),
        }
    }
}

// ==========================================
// SubBrandRule - 子品牌规则（按顺序匹配）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubBrandRule {
    /// 描述包含标记
    DescriptionContains { token: String, sub_brand: String },
    /// SKU 前缀 + 品牌相等
    SkuPrefixWithBrand {
        prefix: String,
        brand: String,
        sub_brand: String,
    },
    /// SKU 前缀
    SkuPrefix { prefix: String, sub_brand: String },
}

// ==========================================
// BrandStandard - 品牌标准写法及其变体
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandStandard {
    pub standard: String,
    pub variations: Vec<String>,
}

fn brand(standard: &str, variations: &[&str]) -> BrandStandard {
    BrandStandard {
        standard: standard.to_string(),
        variations: strings(variations),
    }
}

// ==========================================
// ChannelDefaults - 按国家的渠道默认值
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDefaults {
    /// 国家（规范化）→ 未映射渠道时的默认渠道
    pub by_country: BTreeMap<String, String>,
    /// 其余国家的默认渠道
    pub fallback: String,
}

impl ChannelDefaults {
    pub fn default_for(&self, country: &str) -> &str {
        self.by_country
            .get(country)
            .map(|s| s.as_str())
            .unwrap_or(&self.fallback)
    }
}

impl Default for ChannelDefaults {
    fn default() -> Self {
        let mut by_country = BTreeMap::new();
        by_country.insert("COLOMBIA".to_string(), "SHOWROOMS".to_string());
        Self {
            by_country,
            fallback: "TRADITIONALHARDWARESTORES".to_string(),
        }
    }
}

// ==========================================
// RuleTables - 全部规则表
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTables {
    pub power_type: PowerTypeRules,

    // ===== 电池 / 电压 =====
    pub battery_codes: Vec<String>,
    pub bare_suffix: String,
    pub voltage_tokens: Vec<String>,
    pub voltage_exclusion_token: String,

    // ===== 品牌 =====
    pub sub_brand_rules: Vec<SubBrandRule>,
    pub brand_standards: Vec<BrandStandard>,

    // ===== 客户渠道 =====
    pub channel_synonyms: BTreeMap<String, String>,
    pub not_found_markers: Vec<String>,
    pub not_found_placeholder: String,
    pub channel_defaults: ChannelDefaults,

    // ===== 分类 =====
    /// PSD 共享清单命中时分配的 GPP
    pub psd_gpp: String,
}

impl Default for RuleTables {
    fn default() -> Self {
        let mut channel_synonyms = BTreeMap::new();
        channel_synonyms.insert("MESSMERCHANT".to_string(), "MASSMERCHANT".to_string());

        Self {
            power_type: PowerTypeRules::default(),
            battery_codes: strings(&[
                "S1", "S2", "C1", "C2", "E1", "E2", "D1", "D2", "F1", "F2", "L1", "L2", "G1",
                "G2", "M1", "M2", "Q1", "Q2", "P1", "P2", "R1", "R2", "J1", "J2", "T1", "T2",
                "W1", "W2", "X1", "X2", "U1", "U2", "Y1", "Y2", "Z1", "Z2",
            ]),
            bare_suffix: "B".to_string(),
            voltage_tokens: strings(&[
                "2.4V", "3.6V", "3.8V", "4V", "4.8V", "6V", "7.2V", "8V", "9.6V", "10.8V", "12V",
                "14.4V", "16V", "18V", "20V", "24V", "36V", "40V", "54V", "60V", "120V",
            ]),
            voltage_exclusion_token: "220V".to_string(),
            sub_brand_rules: vec![
                SubBrandRule::DescriptionContains {
                    token: "FATMA".to_string(),
                    sub_brand: "FATMAX".to_string(),
                },
                SubBrandRule::SkuPrefixWithBrand {
                    prefix: "E".to_string(),
                    brand: "FACOM".to_string(),
                    sub_brand: "IAR EXPERT".to_string(),
                },
                SubBrandRule::SkuPrefix {
                    prefix: "STA82".to_string(),
                    sub_brand: "MASS".to_string(),
                },
            ],
            brand_standards: default_brand_standards(),
            channel_synonyms,
            not_found_markers: strings(&["NOTFOUND", "NOT"]),
            not_found_placeholder: "NOTFOUND".to_string(),
            channel_defaults: ChannelDefaults::default(),
            psd_gpp: "PSD-70-70X-70999".to_string(),
        }
    }
}

fn default_brand_standards() -> Vec<BrandStandard> {
    vec![
        brand(
            "BLACK + DECKER",
            &["B+D", "BLACK&DECKER", "BLACKANDDECKER", "BLACK+DECKER®", "BLACK + DECKER"],
        ),
        brand("DEWALT", &["DEWALT®", "DWLT", "DEWALT"]),
        brand("STANLEY", &["STANLEY®", "STANLEYTOOLS", "STANLEY"]),
        brand("CRAFTSMAN", &["CRAFTSMAN", "CRAFTSMN", "CRAFTSMAN®"]),
        brand("PORTER CABLE", &["PORTERCABLE", "PORTER-CABLE", "PCABLE"]),
        brand("FATMAX", &["FATMAX", "FATMAXX", "FAT MAX"]),
        brand("IRWIN", &["IRWIN", "IRWININDUSTRIAL"]),
        brand("PROTO", &["PROTO", "PROTOTOOLS", "PROTOTOOL", "PROTOTOO"]),
        brand("FACOM", &["FACOM", "FACOMS.A.", "FACOMS", "FACON", "FACONS"]),
        brand(
            "BOSTITCH",
            &["BOSTITCH", "BOSTICH", "BOSTICTH", "BOSTITCHSTANLEY"],
        ),
        brand("IAR EXPERT", &["IAR EXPERT", "IAREXPERT"]),
        brand("LENOX", &["LENOX", "LENOXTOOLS", "LNX"]),
        brand("GRIDEST", &["GRIDEST", "GRYDEST"]),
        brand("DEWALT POWERS", &["DEWALTPOWERS", "DWLTPOWERS", "DEWALTPOWER"]),
        brand("TROY-BILT", &["TROYBILT", "TROY-BILT"]),
        brand("YARD MACHINES", &["YARDMACHINES", "YARDMACH"]),
        brand(
            "GENUINE FACTORY PAR",
            &["GENUINEFACTORYPART", "GENUINEFACTORY", "GFPARTS"],
        ),
        brand("OTHER", &["OTHERS", "OTHERBRAND", "OTRA", "OTH", "OTHER"]),
        brand("SAT (SSS)", &["SAT", "SSS", "SATSSS"]),
        brand("CUB CADET", &["CUB CADET", "CUBCADET"]),
        brand("DELTA", &["DELTA", "DELTAPOWER"]),
        brand("BIESEMEYER", &["BIESEMEYER"]),
        brand("TRIMMER PLUS", &["TRIMMERPLUS", "TRIMMER+"]),
        brand("SIDCHROME", &["SIDCHROME", "SIDCHROMETOOLS"]),
    ]
}

impl RuleTables {
    /// 从 JSON 覆写解析（缺省字段取默认值）
    pub fn from_json(raw: &str) -> EngineResult<Self> {
        let tables: RuleTables = serde_json::from_str(raw)
            .map_err(|e| EngineError::InvalidRuleTable(e.to_string()))?;
        tables.validate()?;
        Ok(tables)
    }

    /// 基本一致性校验
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(code) = self.battery_codes.iter().find(|c| c.chars().count() != 2) {
            return Err(EngineError::InvalidRuleTable(format!(
                "电池编码必须为 2 个字符: {}",
                code
            )));
        }
        if self.channel_defaults.fallback.trim().is_empty() {
            return Err(EngineError::InvalidRuleTable(
                "渠道默认值不能为空".to_string(),
            ));
        }
        if self.psd_gpp.trim().is_empty() {
            return Err(EngineError::InvalidRuleTable("PSD GPP 不能为空".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_are_valid() {
        let tables = RuleTables::default();
        assert!(tables.validate().is_ok());
        assert_eq!(tables.battery_codes.len(), 36);
        assert_eq!(tables.brand_standards.len(), 24);
        assert_eq!(tables.channel_defaults.default_for("COLOMBIA"), "SHOWROOMS");
        assert_eq!(
            tables.channel_defaults.default_for("MEXICO"),
            "TRADITIONALHARDWARESTORES"
        );
    }

    #[test]
    fn test_partial_json_override() {
        let raw = r#"{
            "channel_defaults": {
                "by_country": {"COLOMBIA": "SHOWROOMS", "PERU": "DISTRIBUTORS"},
                "fallback": "TRADITIONALHARDWARESTORES"
            }
        }"#;
        let tables = RuleTables::from_json(raw).unwrap();
        assert_eq!(tables.channel_defaults.default_for("PERU"), "DISTRIBUTORS");
        // 未覆写的字段保持默认
        assert_eq!(tables.psd_gpp, "PSD-70-70X-70999");
    }

    #[test]
    fn test_invalid_battery_code_rejected() {
        let raw = r#"{"battery_codes": ["X1", "XYZ"]}"#;
        assert!(RuleTables::from_json(raw).is_err());
    }
}
