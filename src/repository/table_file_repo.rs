// ==========================================
// 增量对账引擎 - 主数据 / 工作文件写出
// ==========================================
// 红线: Repository 不含业务逻辑
// 格式: .xlsx (rust_xlsxwriter) 或 .csv；按扩展名选择
// 写入: 临时文件写完后 rename，避免留下半个文件
// ==========================================

use crate::domain::record_set::RecordSet;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::partition_store::{encode_csv, replace_file};
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::Path;
use tracing::info;

/// 单个工作表的默认名称
pub const DEFAULT_SHEET: &str = "Sheet1";

// ==========================================
// TableFileRepository
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct TableFileRepository;

impl TableFileRepository {
    pub fn new() -> Self {
        Self
    }

    /// 写出单表
    pub fn write_table(&self, path: &Path, records: &RecordSet) -> RepositoryResult<()> {
        self.write_workbook(path, &[(DEFAULT_SHEET, records)])
    }

    /// 写出多工作表文件（CSV 仅写第一张表）
    ///
    /// # 参数
    /// - path: 目标文件
    /// - sheets: (工作表名, 记录集)
    pub fn write_workbook(&self, path: &Path, sheets: &[(&str, &RecordSet)]) -> RepositoryResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| write_error(path, e.to_string()))?;
            }
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => {
                let Some((_, records)) = sheets.first() else {
                    return Ok(());
                };
                let bytes = encode_csv(records.columns(), records.rows())
                    .map_err(|message| write_error(path, message))?;
                replace_file(path, &bytes)?;
            }
            "xlsx" => self.write_xlsx(path, sheets)?,
            other => {
                return Err(write_error(path, format!("不支持的输出格式: {}", other)));
            }
        }

        let rows: usize = sheets.iter().map(|(_, r)| r.len()).sum();
        info!(path = %path.display(), sheets = sheets.len(), rows = rows, "表格文件已写出");
        Ok(())
    }

    fn write_xlsx(&self, path: &Path, sheets: &[(&str, &RecordSet)]) -> RepositoryResult<()> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        for (name, records) in sheets {
            let worksheet = workbook
                .add_worksheet()
                .set_name(*name)
                .map_err(|e| write_error(path, format!("工作表 {} 创建失败: {}", name, e)))?;

            for (col_idx, column) in records.columns().iter().enumerate() {
                worksheet
                    .write_string_with_format(0, col_idx as u16, column, &header_format)
                    .map_err(|e| write_error(path, e.to_string()))?;
            }
            for (row_idx, row) in records.rows().iter().enumerate() {
                for (col_idx, column) in records.columns().iter().enumerate() {
                    let value = row.get(column).map(|s| s.as_str()).unwrap_or("");
                    if value.is_empty() {
                        continue;
                    }
                    worksheet
                        .write_string((row_idx + 1) as u32, col_idx as u16, value)
                        .map_err(|e| write_error(path, e.to_string()))?;
                }
            }
        }

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("table.xlsx");
        let tmp = path.with_file_name(format!(".{}.tmp", file_name));
        workbook
            .save(&tmp)
            .map_err(|e| write_error(path, e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| write_error(path, e.to_string()))?;
        Ok(())
    }
}

fn write_error(path: &Path, message: String) -> RepositoryError {
    RepositoryError::FileWriteError {
        path: path.display().to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record_set::record_of;
    use crate::repository::partition_store::read_csv;
    use tempfile::TempDir;

    #[test]
    fn test_write_csv_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("master").join("master_customers.csv");
        let records = RecordSet::from_rows(
            vec!["fk_Country".to_string(), "fk_Sold-To Customer".to_string()],
            vec![record_of(&[("fk_Country", "MEXICO"), ("fk_Sold-To Customer", "123")])],
        );
        TableFileRepository.write_table(&path, &records).unwrap();

        let back = read_csv(&path).unwrap();
        assert_eq!(back.value(0, "fk_Sold-To Customer"), "123");
    }

    #[test]
    fn test_write_xlsx_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("workfile_hts.xlsx");
        let records = RecordSet::from_rows(vec![], vec![record_of(&[("SKU", "H1")])]);
        TableFileRepository
            .write_workbook(&path, &[("HTS", &records)])
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let err = TableFileRepository
            .write_table(&dir.path().join("a.json"), &RecordSet::default())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::FileWriteError { .. }));
    }
}
