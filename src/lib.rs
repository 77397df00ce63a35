// ==========================================
// 增量对账引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + CSV/Excel
// 系统定位: 月度抽取数据的分区 Upsert，以及产品/客户主数据的分类维护
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录集、数据集描述与实体
pub mod domain;

// 数据仓储层 - 分区文件、主数据文件、运行日志
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据与管道编排
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 状态组装与命令分发
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BareStatus, CheckStatus, DatasetKind, GppSource, PowerType, RunStatus};

// 领域实体
pub use domain::{DatasetSpec, ProductCandidate, RecordSet, ResolvedCustomer, RunLogEntry};

// 引擎
pub use engine::{
    AttributeRules, BrandStandardizer, ClassificationCascade, CustomerChannelResolver,
    MasterUpsert, SkuBaseResolver, UpsertEngine,
};

// 管道
pub use importer::{
    CustomerImporter, PipelineRunner, ProductReviewImporter, ReviewOperation, TransactionImporter,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "增量对账引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
