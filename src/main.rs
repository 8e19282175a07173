// ==========================================
// 表格导入系统 - 命令行主入口
// ==========================================

use clap::Parser;
use sheet_ingest::cli::{run, Cli};
use sheet_ingest::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日志系统
    logging::init(cli.log_json);

    tracing::info!("表格导入系统 {}", sheet_ingest::VERSION);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(error = %e, "命令执行失败");
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}
