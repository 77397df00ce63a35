// ==========================================
// 增量对账引擎 - 导入组件 Trait
// ==========================================
// 职责: 定义文件解析 / 清洗 / 重复键诊断 / 管道运行接口（不包含实现）
// ==========================================

use crate::domain::record_set::RecordSet;
use crate::domain::run_log::RunLogEntry;
use crate::importer::error::ImportResult;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解析文件为记录集
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - sheet: 工作表名（仅 Excel 有效；None 表示第一个工作表）
    ///
    /// # 返回
    /// - Ok(RecordSet): 表头去空白，单元格去首尾空白，完全空白行被跳过
    fn parse(&self, file_path: &Path, sheet: Option<&str>) -> ImportResult<RecordSet>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 文本标准化与度量解析
// 实现者: DataCleaner
pub trait DataCleaner: Send + Sync {
    /// TRIM + UPPER
    fn clean_text(&self, value: &str) -> String;

    /// TRIM + UPPER + 去除所有内部空白（键比较使用）
    fn compact(&self, value: &str) -> String;

    /// 空字符串 / "nan" → None
    fn normalize_null(&self, value: Option<String>) -> Option<String>;

    /// 解析度量值；无法解析 → 0.0
    fn parse_measure(&self, value: &str) -> f64;

    /// 对记录集所有单元格执行 clean_text
    fn clean_record_set(&self, records: &mut RecordSet) {
        for row in records.rows_mut() {
            for value in row.values_mut() {
                *value = self.clean_text(value);
            }
        }
    }
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 用途: 同批次内重复主键诊断（仅诊断，不丢弃数据）
// 实现者: ConflictHandler
pub trait ConflictHandler: Send + Sync {
    /// 检测记录集中重复的主键
    ///
    /// # 返回
    /// - Vec<(行号, 主键)>: 重复记录（不包括首次出现；行号从 1 开始）
    fn detect_duplicates(&self, records: &RecordSet, key_field: &str) -> Vec<(usize, String)>;
}

// ==========================================
// PipelineRunner Trait
// ==========================================
// 用途: 一次完整的管道运行（读 → 对账 → 写 → 记录运行日志）
// 实现者: TransactionImporter, CustomerImporter
pub trait PipelineRunner: Send + Sync {
    /// 管道名称（写入 run_log.pipeline）
    fn pipeline_name(&self) -> &str;

    /// 执行一次运行
    ///
    /// # 返回
    /// - Ok(RunLogEntry): 成功或无输入（NoInput）
    /// - Err: 致命错误（参考文件缺失 / 存储失败），此时不会写出任何分区或主数据
    fn run(&self) -> ImportResult<RunLogEntry>;
}
