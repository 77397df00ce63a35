// ==========================================
// 增量对账引擎 - 运行日志记录
// ==========================================
// 职责: 管道结束时写入 run_log；未注入仓储时只输出日志
// ==========================================

use crate::domain::run_log::RunLogEntry;
use crate::domain::types::RunStatus;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::RunLogRepository;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone, Default)]
pub struct RunRecorder {
    repo: Option<Arc<RunLogRepository>>,
}

impl RunRecorder {
    pub fn new(repo: Option<Arc<RunLogRepository>>) -> Self {
        Self { repo }
    }

    /// 不落库的记录器（测试 / 离线运行）
    pub fn disabled() -> Self {
        Self { repo: None }
    }

    /// 以给定状态结束并写入日志
    pub fn finish(
        &self,
        mut entry: RunLogEntry,
        status: RunStatus,
        message: Option<String>,
    ) -> ImportResult<RunLogEntry> {
        entry.finish(status, message);
        info!(
            run_id = %entry.run_id,
            pipeline = %entry.pipeline,
            status = entry.status.as_str(),
            periods = %entry.periods,
            historical_rows = entry.historical_rows,
            incoming_rows = entry.incoming_rows,
            final_rows = entry.final_rows,
            superseded_rows = entry.superseded_rows,
            degraded_rows = entry.degraded_rows,
            elapsed_ms = entry.elapsed_ms,
            "管道运行结束"
        );
        if let Some(repo) = &self.repo {
            repo.insert(&entry)?;
        }
        Ok(entry)
    }

    /// 失败路径：尽力写入失败记录后原样返回错误
    pub fn fail(&self, entry: RunLogEntry, err: ImportError) -> ImportError {
        error!(pipeline = %entry.pipeline, error = %err, "管道运行失败");
        if let Err(log_err) = self.finish(entry, RunStatus::Failed, Some(err.to_string())) {
            error!(error = %log_err, "失败记录写入 run_log 失败");
        }
        err
    }
}
