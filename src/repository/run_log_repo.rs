// ==========================================
// 增量对账引擎 - 运行日志仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 存储: run_log 表（每次管道运行一行）
// ==========================================

use crate::domain::run_log::RunLogEntry;
use crate::domain::types::RunStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    run_id, pipeline, periods,
    historical_rows, incoming_rows, final_rows, superseded_rows, degraded_rows,
    status, message, elapsed_ms, started_at, finished_at
"#;

// ==========================================
// RunLogRepository - 运行日志仓储
// ==========================================
pub struct RunLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RunLogRepository {
    /// 创建新的 RunLogRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入一次运行记录
    pub fn insert(&self, entry: &RunLogEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO run_log (
                run_id, pipeline, periods,
                historical_rows, incoming_rows, final_rows, superseded_rows, degraded_rows,
                status, message, elapsed_ms, started_at, finished_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                entry.run_id,
                entry.pipeline,
                entry.periods,
                entry.historical_rows as i64,
                entry.incoming_rows as i64,
                entry.final_rows as i64,
                entry.superseded_rows as i64,
                entry.degraded_rows as i64,
                entry.status.as_str(),
                entry.message,
                entry.elapsed_ms as i64,
                entry.started_at,
                entry.finished_at,
            ],
        )?;
        Ok(())
    }

    /// 按 run_id 查询
    ///
    /// # 返回
    /// - Ok(Some(RunLogEntry)): 找到记录
    /// - Ok(None): 未找到
    pub fn find_by_id(&self, run_id: &str) -> RepositoryResult<Option<RunLogEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM run_log WHERE run_id = ?1", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let result = stmt.query_row(params![run_id], map_row);
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某管道最近的运行（按开始时间倒序）
    pub fn list_recent(&self, pipeline: &str, limit: usize) -> RepositoryResult<Vec<RunLogEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM run_log WHERE pipeline = ?1 ORDER BY started_at DESC LIMIT ?2",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![pipeline, limit as i64], map_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<RunLogEntry> {
    let status_raw: String = row.get(8)?;
    let status = status_raw.parse::<RunStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            Box::new(RepositoryError::FieldValueError {
                field: "status".to_string(),
                message: e,
            }),
        )
    })?;

    Ok(RunLogEntry {
        run_id: row.get(0)?,
        pipeline: row.get(1)?,
        periods: row.get(2)?,
        historical_rows: row.get::<_, i64>(3)?.max(0) as usize,
        incoming_rows: row.get::<_, i64>(4)?.max(0) as usize,
        final_rows: row.get::<_, i64>(5)?.max(0) as usize,
        superseded_rows: row.get::<_, i64>(6)?.max(0) as usize,
        degraded_rows: row.get::<_, i64>(7)?.max(0) as usize,
        status,
        message: row.get(9)?,
        elapsed_ms: row.get::<_, i64>(10)?.max(0) as u64,
        started_at: row.get::<_, NaiveDateTime>(11)?,
        finished_at: row.get::<_, NaiveDateTime>(12)?,
    })
}
