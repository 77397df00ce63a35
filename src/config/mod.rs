// ==========================================
// 增量对账引擎 - 配置层
// ==========================================
// 职责: 路径布局与规则表的加载，支持 config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod paths;
pub mod rule_tables;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use paths::{DatasetDirs, PathLayout};
pub use rule_tables::{BrandStandard, ChannelDefaults, PowerTypeRules, RuleTables, SubBrandRule};
