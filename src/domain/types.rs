// ==========================================
// 增量对账引擎 - 领域类型定义
// ==========================================
// 职责: 数据集种类 / 动力类型 / Bare 状态 / 审核状态 / GPP 来源
// 约定: 所有 "as_str" 输出即落盘值，不可随意修改
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 缺失值哨兵（主数据/审核文件中的统一空值）
pub const MISSING: &str = "-";

/// 判断一个单元格是否为空或哨兵
pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == MISSING || trimmed.eq_ignore_ascii_case("nan")
}

// ==========================================
// DatasetKind - 交易数据集种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetKind {
    Demand,
    FillRate,
    Sales,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Demand => "demand",
            DatasetKind::FillRate => "fill_rate",
            DatasetKind::Sales => "sales",
        }
    }

    pub fn all() -> [DatasetKind; 3] {
        [DatasetKind::Demand, DatasetKind::FillRate, DatasetKind::Sales]
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "demand" => Ok(DatasetKind::Demand),
            "fill_rate" | "fillrate" => Ok(DatasetKind::FillRate),
            "sales" => Ok(DatasetKind::Sales),
            other => Err(format!("未知数据集: {}", other)),
        }
    }
}

// ==========================================
// PowerType - 动力类型 (Corded / Cordless / Gas)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerType {
    Corded,
    Cordless,
    Gas,
}

impl PowerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerType::Corded => "CORDED",
            PowerType::Cordless => "CORDLESS",
            PowerType::Gas => "GAS",
        }
    }
}

impl fmt::Display for PowerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// BareStatus - 裸机状态（仅 Cordless 适用）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BareStatus {
    Bare,
    NonBare,
    BarePlusBatteries,
}

impl BareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BareStatus::Bare => "Bare",
            BareStatus::NonBare => "Non Bare",
            BareStatus::BarePlusBatteries => "Bare + Batteries",
        }
    }
}

impl fmt::Display for BareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// CheckStatus - 审核文件 check_sku 状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckStatus {
    // ===== 待审核 =====
    NewSku,
    NeedsReview,
    Pending,

    // ===== 已确认（可被 MasterUpsert 吸收）=====
    Verified,
    Ok,
}

/// 工作文件中"字段缺失待复核"的状态文本
pub const NEEDS_REVIEW_MARKER: &str = "SKU Existente - Revisión: Faltan datos en campos clave";

impl CheckStatus {
    /// 解析 check_sku 单元格（小写、去空格后比较）
    pub fn parse(value: &str) -> Self {
        let normalized: String = value
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        match normalized.as_str() {
            "verified" => CheckStatus::Verified,
            "ok" => CheckStatus::Ok,
            "newsku" => CheckStatus::NewSku,
            _ if normalized.starts_with("skuexistente-") => CheckStatus::NeedsReview,
            _ => CheckStatus::Pending,
        }
    }

    /// 是否可以写回主数据
    pub fn is_accepted(&self) -> bool {
        matches!(self, CheckStatus::Verified | CheckStatus::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::NewSku => "New sku",
            CheckStatus::NeedsReview => NEEDS_REVIEW_MARKER,
            CheckStatus::Pending => MISSING,
            CheckStatus::Verified => "Verified",
            CheckStatus::Ok => "ok",
        }
    }
}

// ==========================================
// GppSource - GPP 分类来源（写入 "¿como se asigno gpp?" 列）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GppSource {
    SkuBase,
    DeclaredPortfolio,
    SharedPsdList,
    CurrentMaster,
    Unresolved,
}

impl GppSource {
    pub fn label(&self) -> &'static str {
        match self {
            GppSource::SkuBase => "sku base",
            GppSource::DeclaredPortfolio => "por portafolio dado por SAP",
            GppSource::SharedPsdList => "sku esta en la base compartida por PSD",
            GppSource::CurrentMaster => "Es el gpp que esta actualmente en el master product",
            GppSource::Unresolved => "sin gpp asignado",
        }
    }

    /// 审核文件中的分段顺序（共享清单命中与未解析同属最后一段新 SKU）
    pub fn output_rank(&self) -> u8 {
        match self {
            GppSource::SkuBase => 0,
            GppSource::DeclaredPortfolio => 1,
            GppSource::SharedPsdList | GppSource::Unresolved => 2,
            GppSource::CurrentMaster => 3,
        }
    }
}

// ==========================================
// RunStatus - 管道运行状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    NoInput,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::NoInput => "NO_INPUT",
            RunStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(RunStatus::Success),
            "NO_INPUT" => Ok(RunStatus::NoInput),
            "FAILED" => Ok(RunStatus::Failed),
            other => Err(format!("未知运行状态: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status_parse() {
        assert_eq!(CheckStatus::parse(" Verified "), CheckStatus::Verified);
        assert_eq!(CheckStatus::parse("O K"), CheckStatus::Ok);
        assert_eq!(CheckStatus::parse("new sku"), CheckStatus::NewSku);
        assert_eq!(CheckStatus::parse(NEEDS_REVIEW_MARKER), CheckStatus::NeedsReview);
        assert_eq!(CheckStatus::parse("-"), CheckStatus::Pending);
        assert!(CheckStatus::parse("ok").is_accepted());
        assert!(!CheckStatus::parse("new sku").is_accepted());
    }

    #[test]
    fn test_dataset_kind_from_str() {
        assert_eq!("fill-rate".parse::<DatasetKind>(), Ok(DatasetKind::FillRate));
        assert_eq!("SALES".parse::<DatasetKind>(), Ok(DatasetKind::Sales));
        assert!("inventory".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(""));
        assert!(is_missing(" - "));
        assert!(is_missing("nan"));
        assert!(!is_missing("PWT"));
    }
}
