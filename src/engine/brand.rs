// ==========================================
// 增量对账引擎 - 品牌标准化
// ==========================================
// 规则: 品牌去空格大写后查变体表，命中则替换为标准写法（同样去空格大写）
//       未命中保留原值
// ==========================================

use crate::config::rule_tables::BrandStandard;
use crate::domain::product::product_cols as pc;
use crate::domain::record_set::RecordSet;
use std::collections::HashMap;

fn squash(value: &str) -> String {
    value.replace(' ', "").to_uppercase()
}

#[derive(Debug, Clone, Default)]
pub struct BrandStandardizer {
    /// 规范化变体 → 规范化标准品牌
    inverse: HashMap<String, String>,
}

impl BrandStandardizer {
    pub fn new(standards: &[BrandStandard]) -> Self {
        let mut inverse = HashMap::new();
        for standard in standards {
            let target = squash(&standard.standard);
            for variation in &standard.variations {
                inverse.insert(squash(variation), target.clone());
            }
        }
        Self { inverse }
    }

    /// 标准化单个品牌
    pub fn standardize(&self, brand: &str) -> String {
        let key = squash(brand.trim());
        self.inverse
            .get(&key)
            .cloned()
            .unwrap_or_else(|| brand.to_string())
    }

    /// 原地标准化记录集的 Brand 列
    ///
    /// # 返回
    /// - 值发生变化的行数
    pub fn apply(&self, records: &mut RecordSet) -> usize {
        let mut changed = 0;
        for row in records.rows_mut() {
            let Some(current) = row.get(pc::BRAND) else {
                continue;
            };
            let standard = self.standardize(current);
            if &standard != current {
                row.insert(pc::BRAND.to_string(), standard);
                changed += 1;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::rule_tables::RuleTables;
    use crate::domain::record_set::record_of;

    fn standardizer() -> BrandStandardizer {
        BrandStandardizer::new(&RuleTables::default().brand_standards)
    }

    #[test]
    fn test_variations_map_to_squashed_standard() {
        let s = standardizer();
        assert_eq!(s.standardize("Black&Decker"), "BLACK+DECKER");
        assert_eq!(s.standardize("B+D"), "BLACK+DECKER");
        assert_eq!(s.standardize("dwlt"), "DEWALT");
        assert_eq!(s.standardize("Cub Cadet"), "CUBCADET");
    }

    #[test]
    fn test_unknown_brand_kept() {
        assert_eq!(standardizer().standardize("Makita Pro"), "Makita Pro");
    }

    #[test]
    fn test_apply_counts_changes() {
        let mut set = RecordSet::from_rows(
            vec![],
            vec![
                record_of(&[("Brand", "DEWALT")]),
                record_of(&[("Brand", "Stanley Tools")]),
            ],
        );
        assert_eq!(standardizer().apply(&mut set), 1);
        assert_eq!(set.value(1, "Brand"), "STANLEY");
    }
}
