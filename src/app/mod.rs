// ==========================================
// 增量对账引擎 - 应用层
// ==========================================
// 职责: 应用状态组装与命令分发，供 main.rs 使用
// ==========================================

pub mod commands;
pub mod state;

// 重导出
pub use commands::{dispatch, Command};
pub use state::{get_default_db_path, AppState};
