// ==========================================
// 增量对账引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分级: 参考文件缺失 / 存储失败 → 致命；单个抽取文件损坏 → 可恢复
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作表不存在 ({file}): {sheet}")]
    SheetNotFound { file: String, sheet: String },

    // ===== 结构错误 =====
    #[error("文件缺少必需列 ({file}): {columns:?}")]
    MissingColumns { file: String, columns: Vec<String> },

    // ===== 参考数据错误 =====
    #[error("参考文件不可用 ({name}): {message}")]
    ReferenceFileMissing { name: String, message: String },

    // ===== 下游错误 =====
    #[error("存储失败: {0}")]
    Storage(#[from] RepositoryError),

    #[error("引擎错误: {0}")]
    Engine(#[from] EngineError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否终止整次运行
    ///
    /// 单个抽取文件的解析/结构错误可跳过；其余错误一律致命
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ImportError::UnsupportedFormat(_)
                | ImportError::FileReadError(_)
                | ImportError::ExcelParseError(_)
                | ImportError::CsvParseError(_)
                | ImportError::SheetNotFound { .. }
                | ImportError::MissingColumns { .. }
        )
    }

    /// 将文件级错误包装为参考文件错误（参考文件不可用时必须致命）
    pub fn into_reference(self, name: &str) -> ImportError {
        match self {
            ImportError::ReferenceFileMissing { .. } => self,
            other => ImportError::ReferenceFileMissing {
                name: name.to_string(),
                message: other.to_string(),
            },
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
