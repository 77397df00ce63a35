// ==========================================
// 增量对账引擎 - 引擎层
// ==========================================
// 职责: 纯内存的对账与分类规则，不做文件与数据库 IO
// 红线: 分类 / 匹配失败不报错，以 "-" 标记并进入审核
// ==========================================

pub mod attribute_rules;
pub mod brand;
pub mod classification;
pub mod customer_channel;
pub mod error;
pub mod lookup;
pub mod master_upsert;
pub mod sku_base;
pub mod sku_review;
pub mod upsert;
pub mod workfile_status;

// 重导出核心引擎
pub use attribute_rules::AttributeRules;
pub use brand::BrandStandardizer;
pub use classification::{
    BySharedList, BySkuBase, ByDeclaredPortfolio, CascadeSummary, ClassificationCascade,
    ClassificationReferences, ClassificationTier, TierResolution,
};
pub use customer_channel::{
    customer_key, normalize_customer_code, CustomerChannelResolver, NameNotation,
};
pub use error::{EngineError, EngineResult};
pub use master_upsert::{MasterUpsert, MasterUpsertOutcome};
pub use sku_base::SkuBaseResolver;
pub use upsert::{UpsertEngine, UpsertOutcome};
pub use workfile_status::{build_workfile, WorkfileKind};
