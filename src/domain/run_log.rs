// ==========================================
// 增量对账引擎 - 管道运行日志
// ==========================================
// 职责: 记录每次管道运行的行数统计与结果，供审计回溯
// 存储: run_log 表
// ==========================================

use crate::domain::types::RunStatus;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// RunLogEntry - 单次运行记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub run_id: String,
    pub pipeline: String,
    /// 涉及的期间标签（逗号分隔）
    pub periods: String,

    // ===== 行数统计 =====
    pub historical_rows: usize,
    pub incoming_rows: usize,
    pub final_rows: usize,
    pub superseded_rows: usize,
    /// 主键存在缺失部分的新记录（保留写入，待审核）
    pub degraded_rows: usize,

    // ===== 结果 =====
    pub status: RunStatus,
    pub message: Option<String>,
    pub elapsed_ms: u64,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
}

impl RunLogEntry {
    /// 开始一次运行（生成 run_id，统计为 0）
    pub fn start(pipeline: &str) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            run_id: Uuid::new_v4().to_string(),
            pipeline: pipeline.to_string(),
            periods: String::new(),
            historical_rows: 0,
            incoming_rows: 0,
            final_rows: 0,
            superseded_rows: 0,
            degraded_rows: 0,
            status: RunStatus::Success,
            message: None,
            elapsed_ms: 0,
            started_at: now,
            finished_at: now,
        }
    }

    /// 结束运行并记录结果
    pub fn finish(&mut self, status: RunStatus, message: Option<String>) {
        let now = Utc::now().naive_utc();
        self.status = status;
        self.message = message;
        self.finished_at = now;
        self.elapsed_ms = (now - self.started_at).num_milliseconds().max(0) as u64;
    }
}
