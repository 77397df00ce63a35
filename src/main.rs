// ==========================================
// 增量对账引擎 - 命令行入口
// ==========================================
// 退出码: 致命错误 (参考文件缺失 / 存储失败) → 1；其余 → 0
// ==========================================

use anyhow::{anyhow, Context};
use retail_recon::app::{dispatch, get_default_db_path, AppState, Command};
use retail_recon::logging;

fn run() -> anyhow::Result<()> {
    let arg = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!(Command::usage()))?;
    let command: Command = arg
        .parse()
        .map_err(|e: String| anyhow!("{}\n{}", e, Command::usage()))?;

    tracing::info!("==================================================");
    tracing::info!("{} v{}", retail_recon::APP_NAME, retail_recon::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let entry = dispatch(&state, command).with_context(|| format!("命令 {} 执行失败", command))?;
    tracing::info!(
        run_id = %entry.run_id,
        status = entry.status.as_str(),
        final_rows = entry.final_rows,
        "命令执行完成"
    );
    Ok(())
}

fn main() {
    logging::init();

    if let Err(e) = run() {
        tracing::error!("{:#}", e);
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
