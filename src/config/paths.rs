// ==========================================
// 增量对账引擎 - 目录与文件布局
// ==========================================
// 职责: 各管道读写位置的统一描述
// 默认: 全部位于 base_dir 之下；每一项均可由 config_kv 单独覆写
// ==========================================

use crate::domain::types::DatasetKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 单个交易数据集的目录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDirs {
    /// 月度抽取文件所在目录
    pub update_dir: PathBuf,
    /// 期间分区目录
    pub partition_dir: PathBuf,
}

// ==========================================
// PathLayout
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathLayout {
    pub base_dir: PathBuf,

    // ===== 交易数据集 =====
    pub demand: DatasetDirs,
    pub fill_rate: DatasetDirs,
    pub sales: DatasetDirs,

    // ===== 参考表 =====
    pub country_codes_file: PathBuf,
    pub gpp_brand_file: PathBuf,
    pub psd_shared_file: PathBuf,
    pub customers_shared_file: PathBuf,
    pub customer_notation_file: PathBuf,

    // ===== 主数据与工作文件 =====
    pub product_master_file: PathBuf,
    pub customer_master_file: PathBuf,
    pub review_workfile: PathBuf,
    pub hts_workfile: PathBuf,
    pub pwt_workfile: PathBuf,
}

fn dataset_dirs(base: &Path, kind: DatasetKind) -> DatasetDirs {
    DatasetDirs {
        update_dir: base.join("raw").join(kind.as_str()).join("monthly_update"),
        partition_dir: base.join("processed").join(kind.as_str()).join("partitions"),
    }
}

impl PathLayout {
    /// 以 base_dir 生成默认布局
    pub fn with_base(base_dir: impl Into<PathBuf>) -> Self {
        let base: PathBuf = base_dir.into();
        let raw = base.join("raw");
        let processed = base.join("processed");

        Self {
            demand: dataset_dirs(&base, DatasetKind::Demand),
            fill_rate: dataset_dirs(&base, DatasetKind::FillRate),
            sales: dataset_dirs(&base, DatasetKind::Sales),
            country_codes_file: processed.join("shared").join("region_country_codes.xlsx"),
            gpp_brand_file: processed.join("master_products").join("gpp_brand.xlsx"),
            psd_shared_file: raw.join("products").join("sku_shared_of_psd.xlsx"),
            customers_shared_file: raw.join("customers").join("clasifications_customers.xlsx"),
            customer_notation_file: raw.join("customers").join("notation_name_customers.xlsx"),
            product_master_file: processed.join("master_products").join("master_products.xlsx"),
            customer_master_file: processed
                .join("master_customers")
                .join("master_customers.xlsx"),
            review_workfile: raw.join("products").join("sku_for_review.xlsx"),
            hts_workfile: raw.join("products").join("workfile_hts.xlsx"),
            pwt_workfile: raw.join("products").join("workfile_pwt.xlsx"),
            base_dir: base,
        }
    }

    pub fn dataset(&self, kind: DatasetKind) -> &DatasetDirs {
        match kind {
            DatasetKind::Demand => &self.demand,
            DatasetKind::FillRate => &self.fill_rate,
            DatasetKind::Sales => &self.sales,
        }
    }

    pub fn dataset_mut(&mut self, kind: DatasetKind) -> &mut DatasetDirs {
        match kind {
            DatasetKind::Demand => &mut self.demand,
            DatasetKind::FillRate => &mut self.fill_rate,
            DatasetKind::Sales => &mut self.sales,
        }
    }
}
