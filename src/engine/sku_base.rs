// ==========================================
// 增量对账引擎 - SKU Base 解析器
// ==========================================
// 规则: 从完整 SKU 开始，自右向左逐字符截短，首个命中已知 Base 集合的前缀即结果
// 下限: max(3, len - 11) 个字符；未命中返回 "-"
// 复杂度: 每个 SKU O(后缀长度) 次集合查找
// ==========================================

use crate::domain::types::{is_missing, MISSING};
use std::collections::HashSet;

/// 前缀最短长度
pub const MIN_BASE_LEN: usize = 3;
/// 最多可截去的变体后缀长度
pub const MAX_VARIANT_SUFFIX: usize = 11;

#[derive(Debug, Clone, Default)]
pub struct SkuBaseResolver {
    bases: HashSet<String>,
}

impl SkuBaseResolver {
    /// 由已知 Base 集合构建（空值与 "-" 被忽略）
    pub fn new<I, S>(bases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let bases = bases
            .into_iter()
            .map(|b| b.as_ref().trim().to_string())
            .filter(|b| !is_missing(b))
            .collect();
        Self { bases }
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn contains(&self, base: &str) -> bool {
        self.bases.contains(base)
    }

    /// 解析 SKU 的 Base
    ///
    /// # 返回
    /// - 最长命中前缀；未命中（或 SKU 短于 3 个字符）返回 "-"
    pub fn resolve(&self, full_sku: &str) -> String {
        let sku = full_sku.trim();
        // 按字符边界截短
        let boundaries: Vec<usize> = sku
            .char_indices()
            .map(|(i, _)| i)
            .skip(1)
            .chain(std::iter::once(sku.len()))
            .collect();
        let char_len = boundaries.len();
        if sku.is_empty() || char_len < MIN_BASE_LEN {
            return MISSING.to_string();
        }

        let min_len = MIN_BASE_LEN.max(char_len.saturating_sub(MAX_VARIANT_SUFFIX));
        for len in (min_len..=char_len).rev() {
            let prefix = &sku[..boundaries[len - 1]];
            if self.bases.contains(prefix) {
                return prefix.to_string();
            }
        }
        MISSING.to_string()
    }
}
