// ==========================================
// 增量对账引擎 - 客户主数据领域模型
// ==========================================
// 职责: 客户主数据列定义 / 客户渠道解析结果
// 主键: (fk_Country, 客户编码) 规范化后拼接
// ==========================================

use crate::domain::record_set::Record;
use serde::{Deserialize, Serialize};

/// 客户相关列名
pub mod customer_cols {
    // ===== 源文件（FillRate / Sales）=====
    pub const CUSTOMER_CODE: &str = "Sold-To Customer Code";
    pub const CUSTOMER_NAME: &str = "Sold-To Customer";
    pub const DECLARED_CHANNEL: &str = "Sold-To Dist Channel";

    // ===== 共享客户清单 =====
    pub const SHARED_COUNTRY: &str = "Country";
    pub const SHARED_CUSTOMER_CODE: &str = "fk_Customer_Code";
    pub const SHARED_CHANNEL: &str = "Sold-To Dist Channel Shared";

    // ===== 渠道分类表 =====
    pub const CLASS_CHANNEL: &str = "pk_Sold-To Dist Channel";
    pub const CLASS_DIST_TYPE: &str = "fk_Sold-To Dist Type";

    // ===== 名称校正表 =====
    pub const NOTATION_TEXT: &str = "Text Condition";
    pub const NOTATION_RESULT: &str = "Result";

    // ===== 主数据 =====
    pub const FK_COUNTRY: &str = "fk_Country";
    pub const FK_CUSTOMER: &str = "fk_Sold-To Customer";
    pub const CUSTOMER_NAME_OUT: &str = "Sold-To Customer Name";
    pub const FK_DIST_CHANNEL: &str = "fk_Dist_Channel";
    pub const FK_DIST_TYPE: &str = "fk_Dist_Type";

    /// 临时主键列（不落盘）
    pub const FK_COUNTRY_CUSTOMER: &str = "fk_country_customer";
}

use customer_cols as cc;

/// 从源文件抽取的客户列
pub const CUSTOMER_SOURCE_COLUMNS: [&str; 5] = [
    "Country Code",
    "Destination Country",
    cc::CUSTOMER_CODE,
    cc::CUSTOMER_NAME,
    cc::DECLARED_CHANNEL,
];

/// 客户主数据输出列
pub const MASTER_CUSTOMER_COLUMNS: [&str; 5] = [
    cc::FK_COUNTRY,
    cc::FK_CUSTOMER,
    cc::CUSTOMER_NAME_OUT,
    cc::FK_DIST_CHANNEL,
    cc::FK_DIST_TYPE,
];

// ==========================================
// ResolvedCustomer - 渠道解析后的客户
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCustomer {
    pub country: String,
    /// 源文件中的原始客户编码
    pub customer_code: String,
    pub customer_name: String,
    /// 规范化 (国家-客户编码) 主键
    pub key: String,
    /// 解析后的渠道（分类表中的原始写法；未命中分类表时为空）
    pub dist_channel: String,
    pub dist_type: String,
}

impl ResolvedCustomer {
    /// 转换为主数据行
    pub fn to_master_row(&self) -> Record {
        let pairs = [
            (cc::FK_COUNTRY, self.country.clone()),
            (cc::FK_CUSTOMER, self.customer_code.clone()),
            (cc::CUSTOMER_NAME_OUT, self.customer_name.clone()),
            (cc::FK_DIST_CHANNEL, self.dist_channel.clone()),
            (cc::FK_DIST_TYPE, self.dist_type.clone()),
        ];
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}
