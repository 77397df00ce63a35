// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、目录布局、参考文件生成等功能
// ==========================================

use retail_recon::config::PathLayout;
use retail_recon::db::{ensure_schema, open_sqlite_connection};
use retail_recon::domain::{record_of, RecordSet};
use rusqlite::{params, Connection};
use std::error::Error;
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库连接
pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    Ok(open_sqlite_connection(db_path)?)
}

/// 写入 global scope 配置
pub fn insert_test_config(db_path: &str, pairs: &[(&str, &str)]) -> Result<(), Box<dyn Error>> {
    let conn = open_test_connection(db_path)?;
    for (key, value) in pairs {
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
    }
    Ok(())
}

/// 由列名与行值构建记录集
pub fn record_set(columns: &[&str], rows: &[&[&str]]) -> RecordSet {
    let mut set = RecordSet::with_schema(columns);
    for values in rows {
        let pairs: Vec<(&str, &str)> = columns.iter().copied().zip(values.iter().copied()).collect();
        set.push(record_of(&pairs));
    }
    set
}

/// 写出文本文件（自动创建父目录）
pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// 以 base 为根的测试布局：参考表、主数据与工作文件全部使用 CSV
pub fn csv_layout(base: &Path) -> PathLayout {
    let mut layout = PathLayout::with_base(base);
    layout.country_codes_file = base.join("shared").join("country_codes.csv");
    layout.gpp_brand_file = base.join("shared").join("gpp_brand.xlsx");
    layout.psd_shared_file = base.join("shared").join("psd.xlsx");
    layout.customers_shared_file = base.join("customers").join("shared.xlsx");
    layout.customer_notation_file = base.join("customers").join("notation.csv");
    layout.product_master_file = base.join("master").join("master_products.csv");
    layout.customer_master_file = base.join("master").join("master_customers.csv");
    layout.review_workfile = base.join("work").join("sku_for_review.csv");
    layout.hts_workfile = base.join("work").join("workfile_hts.csv");
    layout.pwt_workfile = base.join("work").join("workfile_pwt.csv");
    layout
}

/// 国家参考表（CSV 不区分工作表，两种查找键放在同一文件）
pub fn write_country_codes(layout: &PathLayout) {
    write_file(
        &layout.country_codes_file,
        "Demand Group,Country Code Concat,Country\n\
         MX,MX01MX,Mexico\n\
         CO,CO01CO,Colombia\n",
    );
}
