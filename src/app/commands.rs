// ==========================================
// 增量对账引擎 - 命令分发
// ==========================================
// 职责: 命令行参数 → 管道；每条命令对应一次完整运行
// ==========================================

use crate::app::state::AppState;
use crate::domain::run_log::RunLogEntry;
use crate::domain::types::DatasetKind;
use crate::importer::error::ImportResult;
use crate::importer::importer_trait::PipelineRunner;
use crate::importer::product_review_importer::ReviewOperation;
use std::fmt;
use std::str::FromStr;

/// 可执行的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    UpdateDataset(DatasetKind),
    UpdateCustomers,
    Review(ReviewOperation),
}

impl Command {
    /// 全部命令（帮助信息顺序）
    pub fn all() -> Vec<Command> {
        vec![
            Command::UpdateDataset(DatasetKind::Demand),
            Command::UpdateDataset(DatasetKind::FillRate),
            Command::UpdateDataset(DatasetKind::Sales),
            Command::UpdateCustomers,
            Command::Review(ReviewOperation::GenerateReview),
            Command::Review(ReviewOperation::ApplyReview),
            Command::Review(ReviewOperation::RefreshWorkfiles),
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::UpdateDataset(DatasetKind::Demand) => "update-demand",
            Command::UpdateDataset(DatasetKind::FillRate) => "update-fill-rate",
            Command::UpdateDataset(DatasetKind::Sales) => "update-sales",
            Command::UpdateCustomers => "update-customers",
            Command::Review(ReviewOperation::GenerateReview) => "generate-sku-review",
            Command::Review(ReviewOperation::ApplyReview) => "apply-sku-review",
            Command::Review(ReviewOperation::RefreshWorkfiles) => "refresh-workfiles",
        }
    }

    /// 命令帮助文本
    pub fn usage() -> String {
        let names: Vec<&str> = Self::all().iter().map(|c| c.as_str()).collect();
        format!("用法: retail-recon <命令>\n可用命令: {}", names.join(", "))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::all()
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| format!("未知命令: {}", s))
    }
}

/// 执行命令
///
/// # 返回
/// - Ok(RunLogEntry): 运行结果（Success / NoInput）
/// - Err: 致命错误，调用方应以非零状态退出
pub fn dispatch(state: &AppState, command: Command) -> ImportResult<RunLogEntry> {
    let runner: Box<dyn PipelineRunner> = match command {
        Command::UpdateDataset(kind) => Box::new(state.transaction_importer(kind)),
        Command::UpdateCustomers => Box::new(state.customer_importer()),
        Command::Review(operation) => Box::new(state.product_review_importer(operation)),
    };
    tracing::info!(command = %command, pipeline = runner.pipeline_name(), "执行命令");
    runner.run()
}
