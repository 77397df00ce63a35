// ==========================================
// 增量对账引擎 - 领域模型层
// ==========================================
// 职责: 记录集抽象、数据集描述、产品/客户实体、公共类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod customer;
pub mod dataset;
pub mod product;
pub mod record_set;
pub mod run_log;
pub mod types;

// 重导出核心类型
pub use customer::{customer_cols, ResolvedCustomer, MASTER_CUSTOMER_COLUMNS};
pub use dataset::{cols, CountryStrategy, DatasetSpec, KeyPart};
pub use product::{
    master_product_columns, product_cols, review_columns, DeclaredProduct, ProductCandidate,
    Taxonomy, CLASSIFICATION_ALLOW_LIST,
};
pub use record_set::{record_of, Record, RecordSet};
pub use run_log::RunLogEntry;
pub use types::{
    is_missing, BareStatus, CheckStatus, DatasetKind, GppSource, PowerType, RunStatus, MISSING,
};
