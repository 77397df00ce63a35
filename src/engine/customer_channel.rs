// ==========================================
// 增量对账引擎 - 客户渠道解析
// ==========================================
// 流程: 规范化客户编码 → (国家-编码) 主键 → 共享清单渠道
//       → 未找到时回退到客户自报渠道 → 同义词归一
//       → 不在已知渠道集合时取国家默认渠道 → 渠道分类表得到分销类型
// 去重: 按 (国家-编码) 主键，首次出现为准
// ==========================================

use crate::config::rule_tables::RuleTables;
use crate::domain::customer::{customer_cols as cc, ResolvedCustomer};
use crate::domain::dataset::cols;
use crate::domain::record_set::{Record, RecordSet};
use crate::engine::error::{EngineError, EngineResult};
use crate::importer::data_cleaner::{compact_upper, normalize};
use crate::importer::key_builder::KeyBuilder;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// 代码中含分隔符时需要去掉的前缀宽度（国家/工厂前缀）
const CODE_PREFIX_WIDTH: usize = 3;

/// 规范化客户编码：含 "/" 时去掉前 3 个字符，再去掉前导零
pub fn normalize_customer_code(code: &str) -> String {
    let code = code.trim();
    let stripped: String = if code.contains('/') {
        code.chars().skip(CODE_PREFIX_WIDTH).collect()
    } else {
        code.to_string()
    };
    stripped.trim_start_matches('0').to_string()
}

/// 客户主键：国家 + "-" + 规范化编码（去空白、大写）
pub fn customer_key(country: &str, raw_code: &str) -> String {
    KeyBuilder::master().build(&[Some(country), Some(&normalize_customer_code(raw_code))])
}

fn cell<'a>(row: &'a Record, column: &str) -> &'a str {
    row.get(column).map(|s| s.as_str()).unwrap_or("")
}

// ==========================================
// CustomerChannelResolver
// ==========================================
pub struct CustomerChannelResolver {
    /// (国家-编码) → 共享清单渠道（原值）
    shared_channels: HashMap<String, String>,
    /// 规范化渠道 → (分类表原始写法, 分销类型)
    classifications: HashMap<String, (String, String)>,
    tables: RuleTables,
}

impl CustomerChannelResolver {
    /// 构建解析器
    ///
    /// # 参数
    /// - shared: 共享客户清单（Country / fk_Customer_Code / Sold-To Dist Channel Shared）
    /// - classifications: 渠道分类表（pk_Sold-To Dist Channel / fk_Sold-To Dist Type）
    /// - tables: 规则表（同义词、未找到标记、国家默认渠道）
    pub fn new(
        shared: &RecordSet,
        classifications: &RecordSet,
        tables: RuleTables,
    ) -> EngineResult<Self> {
        let missing = shared.missing_columns(&[
            cc::SHARED_COUNTRY,
            cc::SHARED_CUSTOMER_CODE,
            cc::SHARED_CHANNEL,
        ]);
        if !missing.is_empty() {
            return Err(EngineError::missing("Customers_Shared_by_Country", missing));
        }
        let missing = classifications.missing_columns(&[cc::CLASS_CHANNEL, cc::CLASS_DIST_TYPE]);
        if !missing.is_empty() {
            return Err(EngineError::missing("Clasifications", missing));
        }

        let key_builder = KeyBuilder::master();
        let mut shared_channels = HashMap::new();
        for row in shared.rows() {
            let key = key_builder.build(&[
                Some(cell(row, cc::SHARED_COUNTRY)),
                Some(cell(row, cc::SHARED_CUSTOMER_CODE)),
            ]);
            shared_channels
                .entry(key)
                .or_insert_with(|| cell(row, cc::SHARED_CHANNEL).to_string());
        }

        let mut class_map = HashMap::new();
        for row in classifications.rows() {
            let channel = cell(row, cc::CLASS_CHANNEL);
            class_map.entry(compact_upper(channel)).or_insert_with(|| {
                (
                    channel.trim().to_string(),
                    cell(row, cc::CLASS_DIST_TYPE).trim().to_string(),
                )
            });
        }

        debug!(
            shared = shared_channels.len(),
            channels = class_map.len(),
            "渠道参考数据已加载"
        );

        Ok(Self {
            shared_channels,
            classifications: class_map,
            tables,
        })
    }

    fn is_not_found(&self, channel: &str) -> bool {
        self.tables
            .not_found_markers
            .iter()
            .any(|m| channel.contains(m.as_str()))
    }

    /// 解析渠道（规范化写法）
    ///
    /// # 参数
    /// - country: 已解析国家
    /// - key: (国家-编码) 主键
    /// - declared_channel: 客户自报渠道
    pub fn resolve_channel(&self, country: &str, key: &str, declared_channel: &str) -> String {
        let shared = self
            .shared_channels
            .get(key)
            .map(|c| c.as_str())
            .unwrap_or(self.tables.not_found_placeholder.as_str());
        let mut channel = compact_upper(shared);
        if self.is_not_found(&channel) {
            channel = compact_upper(declared_channel);
        }
        if let Some(canonical) = self.tables.channel_synonyms.get(&channel) {
            channel = canonical.clone();
        }

        if self.classifications.contains_key(&channel) {
            channel
        } else {
            self.tables
                .channel_defaults
                .default_for(&normalize(country))
                .to_string()
        }
    }

    /// 解析单个客户
    pub fn resolve(&self, row: &Record) -> ResolvedCustomer {
        let country = cell(row, cols::FK_COUNTRY).trim().to_string();
        let raw_code = cell(row, cc::CUSTOMER_CODE).trim().to_string();
        let key = customer_key(&country, &raw_code);
        let channel = self.resolve_channel(&country, &key, cell(row, cc::DECLARED_CHANNEL));

        let (dist_channel, dist_type) = self
            .classifications
            .get(&channel)
            .cloned()
            .unwrap_or_default();

        ResolvedCustomer {
            country,
            customer_code: raw_code,
            customer_name: cell(row, cc::CUSTOMER_NAME).trim().to_string(),
            key,
            dist_channel,
            dist_type,
        }
    }

    /// 批量解析并按主键去重（首次出现为准）
    ///
    /// # 参数
    /// - consolidated: 已完成国家解析的客户记录（需 fk_Country 列）
    pub fn resolve_all(&self, consolidated: &RecordSet) -> EngineResult<Vec<ResolvedCustomer>> {
        let missing = consolidated.missing_columns(&[
            cols::FK_COUNTRY,
            cc::CUSTOMER_CODE,
            cc::CUSTOMER_NAME,
            cc::DECLARED_CHANNEL,
        ]);
        if !missing.is_empty() {
            return Err(EngineError::missing("customers", missing));
        }

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        let mut unclassified = 0;
        for row in consolidated.rows() {
            let customer = self.resolve(row);
            if !seen.insert(customer.key.clone()) {
                continue;
            }
            if customer.dist_type.is_empty() {
                unclassified += 1;
            }
            resolved.push(customer);
        }

        if unclassified > 0 {
            warn!(
                unclassified = unclassified,
                "部分客户的渠道不在分类表中，分销类型为空"
            );
        }
        debug!(
            input = consolidated.len(),
            resolved = resolved.len(),
            "客户渠道解析完成"
        );
        Ok(resolved)
    }
}

// ==========================================
// NameNotation - 客户名称校正表
// ==========================================
/// 规范化名称 (去空白、大写) → 校正后名称
#[derive(Debug, Clone, Default)]
pub struct NameNotation {
    corrections: HashMap<String, String>,
}

impl NameNotation {
    /// 由校正表构建（Text Condition / Result）
    pub fn from_reference(notation: &RecordSet) -> EngineResult<Self> {
        let missing = notation.missing_columns(&[cc::NOTATION_TEXT, cc::NOTATION_RESULT]);
        if !missing.is_empty() {
            return Err(EngineError::missing("customer_notation", missing));
        }

        let mut corrections = HashMap::new();
        for row in notation.rows() {
            let text = compact_upper(cell(row, cc::NOTATION_TEXT));
            if text.is_empty() {
                continue;
            }
            corrections.insert(text, cell(row, cc::NOTATION_RESULT).trim().to_string());
        }
        Ok(Self { corrections })
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    /// 校正名称；未收录的名称原样返回
    pub fn correct<'a>(&'a self, name: &'a str) -> &'a str {
        self.corrections
            .get(&compact_upper(name))
            .map(|s| s.as_str())
            .unwrap_or(name)
    }

    /// 校正记录集中指定列
    ///
    /// # 返回
    /// - 被校正的记录数
    pub fn apply(&self, records: &mut RecordSet, column: &str) -> usize {
        let mut corrected = 0;
        for row in records.rows_mut() {
            let Some(value) = row.get_mut(column) else {
                continue;
            };
            if let Some(result) = self.corrections.get(&compact_upper(value)) {
                if result != value {
                    *value = result.clone();
                    corrected += 1;
                }
            }
        }
        debug!(column = column, corrected = corrected, "客户名称校正完成");
        corrected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record_set::record_of;

    fn resolver() -> CustomerChannelResolver {
        let shared = RecordSet::from_rows(
            vec![],
            vec![
                record_of(&[
                    ("Country", "Mexico"),
                    ("fk_Customer_Code", "123"),
                    ("Sold-To Dist Channel Shared", "Mess Merchant"),
                ]),
                record_of(&[
                    ("Country", "PERU"),
                    ("fk_Customer_Code", "77"),
                    ("Sold-To Dist Channel Shared", "NOT FOUND"),
                ]),
            ],
        );
        let classes = RecordSet::from_rows(
            vec![],
            vec![
                record_of(&[
                    ("pk_Sold-To Dist Channel", "Mass Merchant"),
                    ("fk_Sold-To Dist Type", "Retail"),
                ]),
                record_of(&[
                    ("pk_Sold-To Dist Channel", "Showrooms"),
                    ("fk_Sold-To Dist Type", "Specialty"),
                ]),
                record_of(&[
                    ("pk_Sold-To Dist Channel", "Traditional Hardware Stores"),
                    ("fk_Sold-To Dist Type", "Traditional"),
                ]),
                record_of(&[
                    ("pk_Sold-To Dist Channel", "Industrial"),
                    ("fk_Sold-To Dist Type", "Industrial"),
                ]),
            ],
        );
        CustomerChannelResolver::new(&shared, &classes, RuleTables::default()).unwrap()
    }

    fn customer(country: &str, code: &str, channel: &str) -> Record {
        record_of(&[
            ("fk_Country", country),
            ("Sold-To Customer Code", code),
            ("Sold-To Customer", "ACME"),
            ("Sold-To Dist Channel", channel),
        ])
    }

    #[test]
    fn test_normalize_customer_code() {
        // 固定宽度前缀：分隔符位置不同不影响截取
        assert_eq!(normalize_customer_code("MX1/000123"), "/000123");
        assert_eq!(normalize_customer_code("MX/000123"), "123");
        assert_eq!(normalize_customer_code("000450"), "450");
        assert_eq!(customer_key("Costa Rica", "MX/0009"), "COSTARICA-9");
    }

    #[test]
    fn test_shared_channel_with_synonym() {
        let c = resolver().resolve(&customer("MEXICO", "MX/000123", "Industrial"));
        assert_eq!(c.key, "MEXICO-123");
        assert_eq!(c.dist_channel, "Mass Merchant");
        assert_eq!(c.dist_type, "Retail");
        assert_eq!(c.customer_code, "MX/000123");
    }

    #[test]
    fn test_not_found_falls_back_to_declared_channel() {
        let c = resolver().resolve(&customer("PERU", "77", "industrial"));
        assert_eq!(c.dist_channel, "Industrial");
    }

    #[test]
    fn test_colombia_and_general_defaults() {
        let r = resolver();
        let colombia = r.resolve(&customer("COLOMBIA", "1", "Unknown Channel"));
        assert_eq!(colombia.dist_channel, "Showrooms");
        let chile = r.resolve(&customer("CHILE", "1", "Unknown Channel"));
        assert_eq!(chile.dist_channel, "Traditional Hardware Stores");
        assert_eq!(chile.dist_type, "Traditional");
    }

    #[test]
    fn test_resolve_all_dedups_by_key() {
        let set = RecordSet::from_rows(
            vec![],
            vec![
                customer("CHILE", "0042", "Industrial"),
                customer("CHILE", "42", "Unknown"),
            ],
        );
        let resolved = resolver().resolve_all(&set).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].dist_channel, "Industrial");
    }

    #[test]
    fn test_name_notation_corrects_normalized_names() {
        let table = RecordSet::from_rows(
            vec![],
            vec![
                record_of(&[("Text Condition", "Home  Depot"), ("Result", "The Home Depot")]),
                record_of(&[("Text Condition", ""), ("Result", "ignored")]),
            ],
        );
        let notation = NameNotation::from_reference(&table).unwrap();
        assert_eq!(notation.len(), 1);
        assert_eq!(notation.correct("home depot"), "The Home Depot");
        assert_eq!(notation.correct("Sodimac"), "Sodimac");

        let mut master = RecordSet::from_rows(
            vec![],
            vec![
                record_of(&[("Sold-To Customer Name", "HOME DEPOT")]),
                record_of(&[("Sold-To Customer Name", "Ferreteria Uno")]),
            ],
        );
        assert_eq!(notation.apply(&mut master, "Sold-To Customer Name"), 1);
        assert_eq!(master.value(0, "Sold-To Customer Name"), "The Home Depot");
        assert_eq!(master.value(1, "Sold-To Customer Name"), "Ferreteria Uno");
    }

    #[test]
    fn test_name_notation_requires_columns() {
        let table = RecordSet::from_rows(vec![], vec![record_of(&[("Text", "A")])]);
        assert!(NameNotation::from_reference(&table).is_err());
    }
}
