// ==========================================
// 增量对账引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 缺省: 配置键不存在时使用 PathLayout / RuleTables 的默认值
// ==========================================

use crate::config::paths::PathLayout;
use crate::config::rule_tables::RuleTables;
use crate::db::open_sqlite_connection;
use crate::domain::types::DatasetKind;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON 格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global'")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut config_map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(serde_json::to_string(&config_map)?)
    }

    fn path_override(&self, key: &str) -> Result<Option<PathBuf>, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from))
    }

    // ===== 路径布局 =====

    /// 读取路径布局
    ///
    /// # 说明
    /// 先以 base_dir 生成默认布局，再逐项应用 config_kv 中的覆写
    pub fn get_path_layout(&self) -> Result<PathLayout, Box<dyn Error>> {
        let base = self
            .path_override(config_keys::BASE_DIR)?
            .unwrap_or_else(|| PathBuf::from(config_keys::DEFAULT_BASE_DIR));
        let mut layout = PathLayout::with_base(base);

        for kind in DatasetKind::all() {
            if let Some(dir) = self.path_override(&config_keys::update_dir(kind))? {
                layout.dataset_mut(kind).update_dir = dir;
            }
            if let Some(dir) = self.path_override(&config_keys::partition_dir(kind))? {
                layout.dataset_mut(kind).partition_dir = dir;
            }
        }

        let file_overrides: [(&str, &mut PathBuf); 10] = [
            (config_keys::COUNTRY_CODES_FILE, &mut layout.country_codes_file),
            (config_keys::GPP_BRAND_FILE, &mut layout.gpp_brand_file),
            (config_keys::PSD_SHARED_FILE, &mut layout.psd_shared_file),
            (config_keys::CUSTOMERS_SHARED_FILE, &mut layout.customers_shared_file),
            (config_keys::CUSTOMER_NOTATION_FILE, &mut layout.customer_notation_file),
            (config_keys::PRODUCT_MASTER_FILE, &mut layout.product_master_file),
            (config_keys::CUSTOMER_MASTER_FILE, &mut layout.customer_master_file),
            (config_keys::REVIEW_WORKFILE, &mut layout.review_workfile),
            (config_keys::HTS_WORKFILE, &mut layout.hts_workfile),
            (config_keys::PWT_WORKFILE, &mut layout.pwt_workfile),
        ];
        for (key, slot) in file_overrides {
            if let Some(path) = self.path_override(key)? {
                *slot = path;
            }
        }

        debug!(base_dir = %layout.base_dir.display(), "路径布局已加载");
        Ok(layout)
    }

    // ===== 规则表 =====

    /// 读取规则表（config_kv 中的 JSON 覆写；缺省为生产规则）
    pub fn get_rule_tables(&self) -> Result<RuleTables, Box<dyn Error>> {
        match self.get_config_value(config_keys::RULE_TABLES_JSON)? {
            Some(raw) if !raw.trim().is_empty() => Ok(RuleTables::from_json(&raw)?),
            _ => Ok(RuleTables::default()),
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    use crate::domain::types::DatasetKind;

    // 根目录
    pub const BASE_DIR: &str = "base_dir";
    pub const DEFAULT_BASE_DIR: &str = "./data";

    // 参考表
    pub const COUNTRY_CODES_FILE: &str = "country_codes_file";
    pub const GPP_BRAND_FILE: &str = "gpp_brand_file";
    pub const PSD_SHARED_FILE: &str = "psd_shared_file";
    pub const CUSTOMERS_SHARED_FILE: &str = "customers_shared_file";
    pub const CUSTOMER_NOTATION_FILE: &str = "customer_notation_file";

    // 主数据与工作文件
    pub const PRODUCT_MASTER_FILE: &str = "product_master_file";
    pub const CUSTOMER_MASTER_FILE: &str = "customer_master_file";
    pub const REVIEW_WORKFILE: &str = "review_workfile";
    pub const HTS_WORKFILE: &str = "hts_workfile";
    pub const PWT_WORKFILE: &str = "pwt_workfile";

    // 规则表覆写 (JSON)
    pub const RULE_TABLES_JSON: &str = "rule_tables_json";

    /// 数据集抽取目录键，例如 demand_update_dir
    pub fn update_dir(kind: DatasetKind) -> String {
        format!("{}_update_dir", kind.as_str())
    }

    /// 数据集分区目录键，例如 sales_partition_dir
    pub fn partition_dir(kind: DatasetKind) -> String {
        format!("{}_partition_dir", kind.as_str())
    }
}
