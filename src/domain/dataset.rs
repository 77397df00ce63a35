// ==========================================
// 增量对账引擎 - 交易数据集描述
// ==========================================
// 职责: Demand / FillRate / Sales 三条管道的固定结构
//       (文件前缀 / 主键字段 / 主键组成 / 国家解析方式 / 度量列 / 输出列)
// ==========================================

use crate::domain::types::DatasetKind;

/// 交易数据集使用的列名
pub mod cols {
    // ===== 源文件列 =====
    pub const FISCAL_YEAR: &str = "Fiscal Year";
    pub const FISCAL_PERIOD: &str = "Fiscal Period";
    pub const GPP_DIVISION: &str = "GPP Division";
    pub const GPP_CATEGORY: &str = "GPP Category";
    pub const GPP_PORTFOLIO: &str = "GPP Portfolio";
    pub const COUNTRY_CODE: &str = "Country Code";
    pub const DESTINATION_COUNTRY: &str = "Destination Country";
    pub const DEMAND_GROUP: &str = "Demand Group";

    // ===== 派生列 =====
    pub const FK_DATE: &str = "fk_Date";
    pub const FK_YEAR_MONTH: &str = "fk_year_month";
    pub const FK_COUNTRY: &str = "fk_Country";
    pub const FK_CUSTOMER: &str = "fk_Sold_To_Customer_Code";
    pub const FK_SKU: &str = "fk_SKU";
    pub const CLASSIFICATION: &str = "clasification";

    // ===== 国家参考表列 =====
    pub const REF_COUNTRY: &str = "Country";
    pub const REF_COUNTRY_CODE_CONCAT: &str = "Country Code Concat";
}

/// 主键组成部分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPart {
    Period,
    Country,
    Customer,
    Classification,
}

impl KeyPart {
    /// 组成部分对应的派生列
    pub fn column(&self) -> &'static str {
        match self {
            KeyPart::Period => cols::FK_YEAR_MONTH,
            KeyPart::Country => cols::FK_COUNTRY,
            KeyPart::Customer => cols::FK_CUSTOMER,
            KeyPart::Classification => cols::CLASSIFICATION,
        }
    }
}

/// 国家解析方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryStrategy {
    /// 按 "Demand Group" 查表
    DemandGroup,
    /// 按 "Country Code" + "Destination Country" 拼接查表
    CodeConcat,
}

impl CountryStrategy {
    /// 国家参考文件中对应的工作表
    pub fn sheet_name(&self) -> &'static str {
        match self {
            CountryStrategy::DemandGroup => "Code Country Demand",
            CountryStrategy::CodeConcat => "Code Country Fillrate-Sales",
        }
    }

    /// 参考表的查找键列
    pub fn reference_key_column(&self) -> &'static str {
        match self {
            CountryStrategy::DemandGroup => cols::DEMAND_GROUP,
            CountryStrategy::CodeConcat => cols::REF_COUNTRY_CODE_CONCAT,
        }
    }

    /// 源文件中参与查找的列
    pub fn source_columns(&self) -> &'static [&'static str] {
        match self {
            CountryStrategy::DemandGroup => &[cols::DEMAND_GROUP],
            CountryStrategy::CodeConcat => &[cols::COUNTRY_CODE, cols::DESTINATION_COUNTRY],
        }
    }
}

// ==========================================
// DatasetSpec - 数据集描述
// ==========================================
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    pub kind: DatasetKind,
    pub file_prefix: &'static str,
    pub key_field: &'static str,
    pub key_parts: &'static [KeyPart],
    pub country: CountryStrategy,
    /// 源列别名 → 标准列
    pub aliases: &'static [(&'static str, &'static str)],
    pub measures: &'static [&'static str],
}

const DEMAND_MEASURES: &[&str] = &[
    "Demand History & Forecast-QTY",
    "Shipment History& Forecast-Qty",
    "Demand History & Forecast-GSV",
    "Shipment History&Forecast-GSV",
];

const FILL_RATE_MEASURES: &[&str] = &[
    "Fill Rate First Pass Order Qty",
    "Fill Rate First Pass Invoice Qty",
    "Fill Rate First Pass Order $",
    "Fill Rate First Pass Invoice $",
];

const SALES_MEASURES: &[&str] = &["Total Sales", "Total Cost", "Units Sold"];

const TRANSACTION_ALIASES: &[(&str, &str)] = &[
    ("Sold-To-Customer Code", cols::FK_CUSTOMER),
    ("Sold-To Customer Code", cols::FK_CUSTOMER),
    ("Country Material", cols::FK_SKU),
    ("Global Material", cols::FK_SKU),
];

impl DatasetSpec {
    pub fn for_kind(kind: DatasetKind) -> Self {
        match kind {
            DatasetKind::Demand => Self {
                kind,
                file_prefix: "demand",
                key_field: "fk_date_country_clasification",
                key_parts: &[KeyPart::Period, KeyPart::Country, KeyPart::Classification],
                country: CountryStrategy::DemandGroup,
                aliases: TRANSACTION_ALIASES,
                measures: DEMAND_MEASURES,
            },
            DatasetKind::FillRate => Self {
                kind,
                file_prefix: "fill_rate",
                key_field: "fk_date_country_customer_clasification",
                key_parts: &[
                    KeyPart::Period,
                    KeyPart::Country,
                    KeyPart::Customer,
                    KeyPart::Classification,
                ],
                country: CountryStrategy::CodeConcat,
                aliases: TRANSACTION_ALIASES,
                measures: FILL_RATE_MEASURES,
            },
            DatasetKind::Sales => Self {
                kind,
                file_prefix: "sales",
                key_field: "fk_date_country_customer_clasification",
                key_parts: &[
                    KeyPart::Period,
                    KeyPart::Country,
                    KeyPart::Customer,
                    KeyPart::Classification,
                ],
                country: CountryStrategy::CodeConcat,
                aliases: TRANSACTION_ALIASES,
                measures: SALES_MEASURES,
            },
        }
    }

    /// 是否包含客户维度
    pub fn has_customer(&self) -> bool {
        self.key_parts.contains(&KeyPart::Customer)
    }

    /// 文本列（按输出顺序）
    pub fn text_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![cols::FK_DATE, cols::FK_YEAR_MONTH, cols::FK_COUNTRY];
        if self.has_customer() {
            columns.push(cols::FK_CUSTOMER);
        }
        columns.push(cols::FK_SKU);
        columns.push(self.key_field);
        columns
    }

    /// 分区文件的完整输出列
    pub fn output_columns(&self) -> Vec<&'static str> {
        let mut columns = self.text_columns();
        columns.extend_from_slice(self.measures);
        columns
    }

    /// 源文件中必须存在的列（结构校验用）
    pub fn required_source_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![
            cols::FISCAL_YEAR,
            cols::FISCAL_PERIOD,
            cols::GPP_DIVISION,
            cols::GPP_CATEGORY,
            cols::GPP_PORTFOLIO,
        ];
        columns.extend_from_slice(self.country.source_columns());
        columns
    }

    /// 分区文件名: {prefix}_{YYYY-MM}.csv
    pub fn partition_file_name(&self, period: &str) -> String {
        format!("{}_{}.csv", self.file_prefix, period)
    }
}
