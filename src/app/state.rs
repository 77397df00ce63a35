// ==========================================
// 增量对账引擎 - 应用状态
// ==========================================
// 职责: 打开共享数据库连接，加载配置并组装各条管道
// ==========================================

use crate::config::config_manager::ConfigManager;
use crate::config::paths::PathLayout;
use crate::config::rule_tables::RuleTables;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::types::DatasetKind;
use crate::importer::customer_importer::CustomerImporter;
use crate::importer::product_review_importer::{ProductReviewImporter, ReviewOperation};
use crate::importer::run_recorder::RunRecorder;
use crate::importer::transaction_importer::TransactionImporter;
use crate::repository::run_log_repo::RunLogRepository;
use std::sync::{Arc, Mutex};

/// 应用状态
///
/// 配置在启动时读取一次；规则表与路径布局在一次运行内不可变
pub struct AppState {
    /// 数据库路径
    pub db_path: String,
    /// 配置管理器
    pub config: Arc<ConfigManager>,
    /// 路径布局
    pub layout: PathLayout,
    /// 规则表
    pub tables: RuleTables,
    /// 运行日志仓储
    pub run_log_repo: Arc<RunLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("数据库表初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let layout = config
            .get_path_layout()
            .map_err(|e| format!("路径配置读取失败: {}", e))?;
        let tables = config
            .get_rule_tables()
            .map_err(|e| format!("规则表配置读取失败: {}", e))?;
        let run_log_repo = Arc::new(RunLogRepository::from_connection(conn));

        tracing::info!(base_dir = %layout.base_dir.display(), "AppState初始化成功");
        Ok(Self {
            db_path,
            config,
            layout,
            tables,
            run_log_repo,
        })
    }

    fn recorder(&self) -> RunRecorder {
        RunRecorder::new(Some(self.run_log_repo.clone()))
    }

    /// 交易数据集更新管道
    pub fn transaction_importer(&self, kind: DatasetKind) -> TransactionImporter {
        TransactionImporter::new(kind, &self.layout, self.recorder())
    }

    /// 客户主数据更新管道
    pub fn customer_importer(&self) -> CustomerImporter {
        CustomerImporter::new(self.layout.clone(), self.tables.clone(), self.recorder())
    }

    /// 产品主数据审核管道
    pub fn product_review_importer(&self, operation: ReviewOperation) -> ProductReviewImporter {
        ProductReviewImporter::new(
            operation,
            self.layout.clone(),
            self.tables.clone(),
            self.recorder(),
        )
    }
}

/// 默认数据库路径
///
/// 优先使用环境变量 RETAIL_RECON_DB_PATH，其次用户数据目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("RETAIL_RECON_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./retail_recon.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("retail-recon");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("retail_recon.db");
        }
    }
    path.to_string_lossy().to_string()
}
