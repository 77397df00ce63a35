// ==========================================
// 增量对账引擎 - 期间分区仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 存储: 每个 (数据集, 期间) 一个 CSV 文件: {prefix}_{YYYY-MM}.csv
// 写入: 先在内存中生成全部分区内容，再逐个"临时文件 + rename"整文件替换
// ==========================================

use crate::domain::dataset::DatasetSpec;
use crate::domain::record_set::{Record, RecordSet};
use crate::repository::error::{RepositoryError, RepositoryResult};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 期间列为空的记录写入的分区标签
pub const UNDATED_PERIOD: &str = "UNDATED";

/// 已发现的分区文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionHandle {
    pub period: String,
    pub path: PathBuf,
}

// ==========================================
// PartitionStore - 期间分区目录
// ==========================================
#[derive(Debug, Clone)]
pub struct PartitionStore {
    dir: PathBuf,
    file_prefix: String,
    /// 空结果时的列结构，同时决定写出时的列顺序
    schema: Vec<String>,
}

impl PartitionStore {
    pub fn new(dir: impl Into<PathBuf>, file_prefix: &str, schema: &[&str]) -> Self {
        Self {
            dir: dir.into(),
            file_prefix: file_prefix.to_string(),
            schema: schema.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// 按数据集描述创建（前缀与输出列取自描述）
    pub fn for_dataset(dir: impl Into<PathBuf>, spec: &DatasetSpec) -> Self {
        Self::new(dir, spec.file_prefix, &spec.output_columns())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 分区文件路径
    pub fn partition_path(&self, period: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", self.file_prefix, period))
    }

    /// 查找请求期间对应的分区文件
    ///
    /// # 参数
    /// - periods: 期间标签（YYYY-MM）
    ///
    /// # 返回
    /// - 文件名包含期间标签的全部 CSV 文件；某期间无文件时仅告警
    pub fn list_partitions(&self, periods: &[String]) -> RepositoryResult<Vec<PartitionHandle>> {
        if !self.dir.exists() {
            warn!(dir = %self.dir.display(), "分区目录不存在，视为无历史分区");
            return Ok(Vec::new());
        }
        if !self.dir.is_dir() {
            return Err(RepositoryError::PartitionDirUnavailable(
                self.dir.display().to_string(),
            ));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        let mut handles = Vec::new();
        for period in periods {
            let matched: Vec<&PathBuf> = files
                .iter()
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.contains(period.as_str()))
                        .unwrap_or(false)
                })
                .collect();

            if matched.is_empty() {
                warn!(period = %period, dir = %self.dir.display(), "未找到期间分区文件");
                continue;
            }
            for path in matched {
                if handles.iter().any(|h: &PartitionHandle| &h.path == path) {
                    continue;
                }
                handles.push(PartitionHandle {
                    period: period.clone(),
                    path: path.clone(),
                });
            }
        }

        debug!(requested = periods.len(), found = handles.len(), "分区查找完成");
        Ok(handles)
    }

    /// 读取并拼接分区
    ///
    /// # 返回
    /// - 无分区时返回带 schema 列的空记录集
    pub fn read_partitions(&self, handles: &[PartitionHandle]) -> RepositoryResult<RecordSet> {
        let mut merged = RecordSet::new(self.schema.clone());
        for handle in handles {
            let set = read_csv(&handle.path)?;
            debug!(path = %handle.path.display(), rows = set.len(), "读取分区");
            merged = merged.concat(set);
        }
        Ok(merged)
    }

    /// 按期间列分组整文件写出
    ///
    /// # 参数
    /// - records: 完整结果集（Upsert 之后）
    /// - period_field: 期间列
    ///
    /// # 返回
    /// - 写出的分区文件路径
    pub fn write_partitions(
        &self,
        records: &RecordSet,
        period_field: &str,
    ) -> RepositoryResult<Vec<PathBuf>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        if !records.has_column(period_field) {
            return Err(RepositoryError::MissingPeriodColumn {
                column: period_field.to_string(),
            });
        }

        let columns = self.output_columns(records);

        // 先在内存中生成全部分区，任何一个失败都不触碰磁盘
        let mut contents: Vec<(PathBuf, Vec<u8>, usize)> = Vec::new();
        for (period, group) in records.group_by(period_field) {
            let tag = if period.trim().is_empty() {
                warn!(rows = group.len(), "存在期间为空的记录，写入 {} 分区", UNDATED_PERIOD);
                UNDATED_PERIOD.to_string()
            } else {
                period.trim().to_string()
            };
            let path = self.partition_path(&tag);
            let bytes = encode_csv(&columns, group.rows()).map_err(|message| {
                RepositoryError::FileWriteError {
                    path: path.display().to_string(),
                    message,
                }
            })?;
            contents.push((path, bytes, group.len()));
        }

        fs::create_dir_all(&self.dir).map_err(|e| RepositoryError::FileWriteError {
            path: self.dir.display().to_string(),
            message: e.to_string(),
        })?;

        let mut written = Vec::new();
        for (path, bytes, rows) in contents {
            replace_file(&path, &bytes)?;
            info!(path = %path.display(), rows = rows, "分区已写出");
            written.push(path);
        }
        Ok(written)
    }

    fn output_columns(&self, records: &RecordSet) -> Vec<String> {
        let mut columns = self.schema.clone();
        for column in records.columns() {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        columns
    }
}

/// 读取单个 CSV 文件为记录集（空单元格保留为空字符串）
pub fn read_csv(path: &Path) -> RepositoryResult<RecordSet> {
    let read_error = |message: String| RepositoryError::PartitionReadError {
        path: path.display().to_string(),
        message,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| read_error(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| read_error(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut set = RecordSet::new(headers.clone());
    for result in reader.records() {
        let record = result.map_err(|e| read_error(e.to_string()))?;
        let row: Record = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        set.push(row);
    }
    Ok(set)
}

/// 将行编码为 CSV 字节（缺失单元格写空）
pub fn encode_csv(columns: &[String], rows: &[Record]) -> Result<Vec<u8>, String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(columns).map_err(|e| e.to_string())?;
    for row in rows {
        let values = columns
            .iter()
            .map(|c| row.get(c).map(|s| s.as_str()).unwrap_or(""));
        writer.write_record(values).map_err(|e| e.to_string())?;
    }
    writer.into_inner().map_err(|e| e.to_string())
}

/// 临时文件写入后 rename 覆盖目标
pub fn replace_file(path: &Path, bytes: &[u8]) -> RepositoryResult<()> {
    let write_error = |e: std::io::Error| RepositoryError::FileWriteError {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("partition");
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, bytes).map_err(write_error)?;
    fs::rename(&tmp, path).map_err(write_error)?;
    Ok(())
}
