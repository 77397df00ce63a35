// ==========================================
// 增量对账引擎 - 表格记录集
// ==========================================
// 职责: 带列名的内存表（分区文件 / 主数据 / 参考表的统一抽象）
// 约定: 单元格一律按字符串保存；缺失单元格视为空字符串
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// 一行记录（列名 → 单元格值）
pub type Record = HashMap<String, String>;

// ==========================================
// RecordSet - 有序列 + 有序行
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl RecordSet {
    /// 创建指定列的空记录集
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 以静态列名创建空记录集（用于"无历史分区"时的空表结构）
    pub fn with_schema(columns: &[&str]) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect())
    }

    /// 由列与行构建；行中出现的未声明列会追加到列尾
    pub fn from_rows(columns: Vec<String>, rows: Vec<Record>) -> Self {
        let mut set = Self::new(columns);
        for row in rows {
            set.push(row);
        }
        set
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Record] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// 追加一行
    pub fn push(&mut self, row: Record) {
        for key in row.keys() {
            if !self.has_column(key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    /// 读取单元格（缺失返回空字符串）
    pub fn value<'a>(&'a self, row_idx: usize, column: &str) -> &'a str {
        self.rows
            .get(row_idx)
            .and_then(|r| r.get(column))
            .map(|v| v.as_str())
            .unwrap_or("")
    }

    /// 确保列存在，缺失单元格以 default 填充
    pub fn ensure_column(&mut self, name: &str, default: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
        for row in &mut self.rows {
            row.entry(name.to_string())
                .or_insert_with(|| default.to_string());
        }
    }

    /// 删除列
    pub fn drop_column(&mut self, name: &str) {
        self.columns.retain(|c| c != name);
        for row in &mut self.rows {
            row.remove(name);
        }
    }

    /// 返回记录集中不存在的列（保持传入顺序）
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect()
    }

    /// 按映射重命名列；不存在的源列被忽略
    ///
    /// 多个别名映射到同一目标列时合并：目标为空的单元格取别名列的非空值，别名列随后删除
    pub fn rename_columns(&mut self, mapping: &[(&str, &str)]) {
        for (from, to) in mapping {
            if !self.has_column(from) || from == to {
                continue;
            }
            if self.has_column(to) {
                let mut merged = 0;
                for row in &mut self.rows {
                    let Some(v) = row.remove(*from) else {
                        continue;
                    };
                    if v.trim().is_empty() {
                        continue;
                    }
                    let target = row.entry(to.to_string()).or_default();
                    if target.trim().is_empty() {
                        *target = v;
                        merged += 1;
                    }
                }
                self.columns.retain(|c| c != from);
                debug!(from = %from, to = %to, merged = merged, "别名列与已有目标列合并");
                continue;
            }
            for col in &mut self.columns {
                if col == from {
                    *col = to.to_string();
                }
            }
            for row in &mut self.rows {
                if let Some(v) = row.remove(*from) {
                    row.insert(to.to_string(), v);
                }
            }
        }
    }

    /// 投影到指定列（缺失单元格填充 default）
    pub fn select(&self, columns: &[&str], default: &str) -> RecordSet {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| {
                        let v = row.get(*c).cloned().unwrap_or_else(|| default.to_string());
                        (c.to_string(), v)
                    })
                    .collect::<Record>()
            })
            .collect();

        RecordSet {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// 纵向拼接：self 在前，other 在后；列取并集
    pub fn concat(mut self, other: RecordSet) -> RecordSet {
        for col in other.columns {
            if !self.has_column(&col) {
                self.columns.push(col);
            }
        }
        self.rows.extend(other.rows);
        self
    }

    /// 保留满足条件的行
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Record) -> bool,
    {
        self.rows.retain(|r| keep(r));
    }

    /// 列的去重取值（首次出现顺序）
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut values = Vec::new();
        for row in &self.rows {
            if let Some(v) = row.get(column) {
                if seen.insert(v.as_str()) {
                    values.push(v.clone());
                }
            }
        }
        values
    }

    /// 按多列字典序稳定排序
    pub fn sort_by_columns(&mut self, columns: &[&str]) {
        self.rows.sort_by(|a, b| {
            for col in columns {
                let av = a.get(*col).map(|v| v.as_str()).unwrap_or("");
                let bv = b.get(*col).map(|v| v.as_str()).unwrap_or("");
                match av.cmp(bv) {
                    std::cmp::Ordering::Equal => continue,
                    other => return other,
                }
            }
            std::cmp::Ordering::Equal
        });
    }

    /// 以指定列为键对行分组（组顺序按首次出现）
    pub fn group_by(&self, column: &str) -> Vec<(String, RecordSet)> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Record>> = HashMap::new();

        for row in &self.rows {
            let key = row.get(column).cloned().unwrap_or_default();
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(row.clone());
        }

        order
            .into_iter()
            .map(|key| {
                let rows = groups.remove(&key).unwrap_or_default();
                let set = RecordSet {
                    columns: self.columns.clone(),
                    rows,
                };
                (key, set)
            })
            .collect()
    }
}

/// 由 (列, 值) 对构造一行，测试与参考表构造时使用
pub fn record_of(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordSet {
        RecordSet::from_rows(
            vec!["SKU".to_string(), "Brand".to_string()],
            vec![
                record_of(&[("SKU", "B2"), ("Brand", "DEWALT")]),
                record_of(&[("SKU", "A1"), ("Brand", "STANLEY")]),
                record_of(&[("SKU", "B2"), ("Brand", "IRWIN")]),
            ],
        )
    }

    #[test]
    fn test_concat_unions_columns() {
        let left = sample();
        let right = RecordSet::from_rows(
            vec!["SKU".to_string(), "GPP".to_string()],
            vec![record_of(&[("SKU", "C3"), ("GPP", "PWT-1")])],
        );
        let merged = left.concat(right);
        assert_eq!(merged.columns(), &["SKU", "Brand", "GPP"]);
        assert_eq!(merged.len(), 4);
        assert_eq!(merged.value(3, "Brand"), "");
    }

    #[test]
    fn test_rename_and_select() {
        let mut set = sample();
        set.rename_columns(&[("Brand", "LAG Brand"), ("Missing", "X")]);
        assert!(set.has_column("LAG Brand"));
        let projected = set.select(&["SKU", "Voltaje"], "-");
        assert_eq!(projected.value(1, "Voltaje"), "-");
        assert_eq!(projected.columns().len(), 2);
    }

    #[test]
    fn test_rename_merges_aliases_with_same_target() {
        let mut set = RecordSet::from_rows(
            vec![
                "Sold-To-Customer Code".to_string(),
                "Sold-To Customer Code".to_string(),
            ],
            vec![
                record_of(&[("Sold-To-Customer Code", "C1"), ("Sold-To Customer Code", "")]),
                record_of(&[("Sold-To-Customer Code", ""), ("Sold-To Customer Code", "C2")]),
                record_of(&[("Sold-To-Customer Code", "C3"), ("Sold-To Customer Code", "C9")]),
            ],
        );
        set.rename_columns(&[
            ("Sold-To-Customer Code", "fk_Customer"),
            ("Sold-To Customer Code", "fk_Customer"),
        ]);
        assert_eq!(set.columns(), &["fk_Customer"]);
        assert_eq!(set.value(0, "fk_Customer"), "C1");
        assert_eq!(set.value(1, "fk_Customer"), "C2");
        // 首个别名的非空值优先
        assert_eq!(set.value(2, "fk_Customer"), "C3");
    }

    #[test]
    fn test_sort_and_group() {
        let mut set = sample();
        set.sort_by_columns(&["SKU", "Brand"]);
        assert_eq!(set.value(0, "SKU"), "A1");
        assert_eq!(set.value(1, "Brand"), "DEWALT");

        let groups = sample().group_by("SKU");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "B2");
        assert_eq!(groups[0].1.len(), 2);
    }
}
