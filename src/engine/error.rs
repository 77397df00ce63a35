// ==========================================
// 增量对账引擎 - 引擎层错误类型
// ==========================================
// 说明: 分类 / 匹配失败本身不是错误（以 "-" 哨兵标记并进入审核）
//       这里只覆盖输入表结构不满足引擎前提的情况
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("表 {table} 缺少必需列: {columns:?}")]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("规则表配置无效: {0}")]
    InvalidRuleTable(String),
}

impl EngineError {
    pub fn missing(table: &str, columns: Vec<String>) -> Self {
        EngineError::MissingColumns {
            table: table.to_string(),
            columns,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
