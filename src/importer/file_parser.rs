// ==========================================
// 增量对账引擎 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 职责: 单文件解析为 RecordSet；抽取目录批量读取（坏文件跳过并告警）
// ==========================================

use crate::domain::record_set::{Record, RecordSet};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook, Reader, Xlsx};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 抽取目录中可识别的扩展名
pub const EXTRACT_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn build_record(headers: &[String], values: impl Iterator<Item = String>) -> Option<Record> {
    let mut row_map = Record::new();
    for (col_idx, value) in values.enumerate() {
        if let Some(header) = headers.get(col_idx) {
            if header.is_empty() {
                continue;
            }
            row_map.insert(header.clone(), value.trim().to_string());
        }
    }

    // 跳过完全空白的行
    if row_map.values().all(|v| v.is_empty()) {
        None
    } else {
        Some(row_map)
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path, _sheet: Option<&str>) -> ImportResult<RecordSet> {
        // 检查文件存在
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        // 检查扩展名
        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut set = RecordSet::new(headers.iter().filter(|h| !h.is_empty()).cloned().collect());
        for result in reader.records() {
            let record = result?;
            if let Some(row) = build_record(&headers, record.iter().map(|v| v.to_string())) {
                set.push(row);
            }
        }

        Ok(set)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse(&self, file_path: &Path, sheet: Option<&str>) -> ImportResult<RecordSet> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook: Xlsx<_> = open_workbook(file_path)
            .map_err(|e: calamine::XlsxError| ImportError::ExcelParseError(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = match sheet {
            Some(name) => {
                if !sheet_names.iter().any(|s| s == name) {
                    return Err(ImportError::SheetNotFound {
                        file: file_path.display().to_string(),
                        sheet: name.to_string(),
                    });
                }
                name.to_string()
            }
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
        };

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        // 提取表头（第一行）
        let mut rows = range.rows();
        let header_row = match rows.next() {
            Some(row) => row,
            None => return Ok(RecordSet::default()),
        };

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut set = RecordSet::new(headers.iter().filter(|h| !h.is_empty()).cloned().collect());
        for data_row in rows {
            if let Some(row) = build_record(&headers, data_row.iter().map(|c| c.to_string())) {
                set.push(row);
            }
        }

        Ok(set)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse(&self, file_path: &Path, sheet: Option<&str>) -> ImportResult<RecordSet> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse(file_path, sheet),
            "xlsx" | "xls" => ExcelParser.parse(file_path, sheet),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

// ==========================================
// 抽取目录批量读取
// ==========================================

/// 一次目录读取的结果
#[derive(Debug, Default)]
pub struct ExtractBatch {
    pub records: RecordSet,
    pub files_read: Vec<PathBuf>,
    /// (文件, 跳过原因)
    pub skipped: Vec<(PathBuf, String)>,
}

impl ExtractBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 列出目录下可识别的抽取文件（按文件名排序）
pub fn list_extract_files(dir: &Path) -> ImportResult<Vec<PathBuf>> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "抽取目录不存在");
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            // 跳过 Excel 锁文件
            let locked = p
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("~$"))
                .unwrap_or(false);
            !locked && EXTRACT_EXTENSIONS.contains(&extension_of(p).as_str())
        })
        .collect();
    files.sort();
    Ok(files)
}

/// 读取抽取目录中的全部文件并纵向拼接
///
/// # 参数
/// - parser: 文件解析器
/// - dir: 抽取目录
/// - required_columns: 每个文件都必须具备的列；缺列文件被跳过
///
/// # 返回
/// - Ok(ExtractBatch): 可读文件拼接结果（单个坏文件不影响其他文件）
/// - Err: 目录本身不可读
pub fn read_extract_dir(
    parser: &dyn FileParser,
    dir: &Path,
    required_columns: &[&str],
) -> ImportResult<ExtractBatch> {
    let files = list_extract_files(dir)?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "抽取目录中没有可读取的文件");
        return Ok(ExtractBatch::default());
    }

    let mut batch = ExtractBatch::default();
    for file in files {
        debug!(file = %file.display(), "读取抽取文件");
        let parsed = parser.parse(&file, None).and_then(|set| {
            let missing = set.missing_columns(required_columns);
            if missing.is_empty() {
                Ok(set)
            } else {
                Err(ImportError::MissingColumns {
                    file: file.display().to_string(),
                    columns: missing,
                })
            }
        });

        match parsed {
            Ok(set) => {
                let records = std::mem::take(&mut batch.records);
                batch.records = records.concat(set);
                batch.files_read.push(file);
            }
            Err(e) if !e.is_fatal() => {
                warn!(file = %file.display(), error = %e, "跳过无法处理的抽取文件");
                batch.skipped.push((file, e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        files = batch.files_read.len(),
        skipped = batch.skipped.len(),
        rows = batch.records.len(),
        "抽取目录读取完成"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_csv_parser_trims_and_skips_blank_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "a.csv",
            " SKU , Brand\n DCD771 , dewalt \n,\nSTHT1,stanley\n",
        );
        let set = CsvParser.parse(&path, None).unwrap();
        assert_eq!(set.columns(), &["SKU", "Brand"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.value(0, "SKU"), "DCD771");
        assert_eq!(set.value(0, "Brand"), "dewalt");
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.txt", "x");
        let err = UniversalFileParser.parse(&path, None).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_read_extract_dir_skips_structurally_bad_file() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "01.csv", "Fiscal Year,Units Sold\n2024,5\n");
        write_file(dir.path(), "02.csv", "Other\nx\n");
        write_file(dir.path(), "notes.txt", "ignored");

        let batch = read_extract_dir(&UniversalFileParser, dir.path(), &["Fiscal Year"]).unwrap();
        assert_eq!(batch.files_read.len(), 1);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.records.len(), 1);
    }

    #[test]
    fn test_read_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let batch =
            read_extract_dir(&UniversalFileParser, &dir.path().join("nope"), &[]).unwrap();
        assert!(batch.is_empty());
    }
}
