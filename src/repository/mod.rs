// ==========================================
// 增量对账引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 期间分区文件、主数据/工作文件写出、运行日志
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod partition_store;
pub mod run_log_repo;
pub mod table_file_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use partition_store::{PartitionHandle, PartitionStore};
pub use run_log_repo::RunLogRepository;
pub use table_file_repo::TableFileRepository;
