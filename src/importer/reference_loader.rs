// ==========================================
// 增量对账引擎 - 参考表 / 主数据加载
// ==========================================
// 规则: 参考表与主数据不可读 → 致命 (ReferenceFileMissing)
//       工作文件首次运行可能不存在 → 视为空表
// ==========================================

use crate::domain::record_set::RecordSet;
use crate::importer::error::ImportResult;
use crate::importer::importer_trait::FileParser;
use std::path::Path;
use tracing::{debug, info};

/// 加载必需的参考表
///
/// # 参数
/// - parser: 文件解析器
/// - path: 文件路径
/// - sheet: 工作表（None 为第一个工作表）
/// - name: 参考表名称（错误信息用）
///
/// # 返回
/// - Err(ReferenceFileMissing): 文件缺失、工作表缺失或无法解析
pub fn load_reference(
    parser: &dyn FileParser,
    path: &Path,
    sheet: Option<&str>,
    name: &str,
) -> ImportResult<RecordSet> {
    let records = parser
        .parse(path, sheet)
        .map_err(|e| e.into_reference(name))?;
    debug!(
        reference = name,
        path = %path.display(),
        rows = records.len(),
        "参考表加载完成"
    );
    Ok(records)
}

/// 加载可选的工作文件；文件不存在时返回空表
pub fn load_optional(
    parser: &dyn FileParser,
    path: &Path,
    sheet: Option<&str>,
    name: &str,
) -> ImportResult<RecordSet> {
    if !path.exists() {
        info!(workfile = name, path = %path.display(), "工作文件不存在，按空表处理");
        return Ok(RecordSet::default());
    }
    load_reference(parser, path, sheet, name)
}
