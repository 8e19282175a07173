// ==========================================
// 表格导入系统 - 命令行
// ==========================================
// 子命令: upload / validate
// 输出: 报告以 JSON 打印到 stdout，日志走 stderr
// ==========================================

use crate::api::UploadApi;
use crate::domain::types::CoercionPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "SHEET_INGEST_DB_PATH";

#[derive(Debug, Parser)]
#[command(author, version, about = "Load spreadsheets into typed database tables", long_about = None)]
pub struct Cli {
    /// SQLite database path (defaults to $SHEET_INGEST_DB_PATH or the user data dir)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Directory for audit copies of uploaded files
    #[arg(long = "upload-dir", global = true)]
    pub upload_dir: Option<PathBuf>,

    /// Fail on cells that cannot be converted to the inferred column type
    #[arg(long, global = true)]
    pub strict: bool,

    /// Emit logs as JSON lines
    #[arg(long = "log-json", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a spreadsheet into a new table
    ///
    /// The configuration must already exist in the database. The CLI does not
    /// manage reference data; create industries, products, sub types and
    /// configurations through `sheet_ingest::repository::ReferenceRepository`.
    Upload(UploadArgs),
    /// Check that the first three headers are Product, ProductType, ProductSubType
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Spreadsheet file (.xlsx, .xlsm, .xls, .xlsb, .ods, .csv)
    pub file: PathBuf,
    /// Id of an existing configuration (created via ReferenceRepository) whose
    /// industry/product/sub type names are injected
    #[arg(short, long)]
    pub configuration: Uuid,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Spreadsheet file to check
    pub file: PathBuf,
}

/// 默认数据库路径
///
/// 优先级: 环境变量 SHEET_INGEST_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./sheet_ingest.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("sheet-ingest");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("sheet_ingest.db");
        }
    }
    path.to_string_lossy().to_string()
}

/// 执行命令，返回进程退出码
pub async fn run(cli: Cli) -> anyhow::Result<i32> {
    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    info!(db_path = %db_path, "使用数据库");

    let mut settings = UploadApi::load_settings(&db_path).await?;
    if let Some(dir) = cli.upload_dir {
        settings.upload_dir = dir;
    }
    if cli.strict {
        settings.coercion_policy = CoercionPolicy::Strict;
    }
    let api = UploadApi::with_settings(&db_path, settings)?;

    let (json, ok) = match cli.command {
        Commands::Upload(args) => {
            let report = api.upload_file(&args.file, args.configuration).await;
            (serde_json::to_string_pretty(&report)?, report.success)
        }
        Commands::Validate(args) => {
            let report = api.validate_file(&args.file).await;
            (serde_json::to_string_pretty(&report)?, report.is_valid)
        }
    };

    println!("{}", json);
    Ok(if ok { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload_command() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "sheet-ingest",
            "upload",
            "data.xlsx",
            "--configuration",
            &id.to_string(),
            "--db",
            "/tmp/x.db",
            "--strict",
        ])
        .unwrap();
        assert!(cli.strict);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        match cli.command {
            Commands::Upload(args) => {
                assert_eq!(args.file, PathBuf::from("data.xlsx"));
                assert_eq!(args.configuration, id);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_upload_help_points_to_reference_repository() {
        let mut command = Cli::command();
        let upload = command
            .find_subcommand_mut("upload")
            .expect("upload subcommand");
        let help = upload.render_long_help().to_string();
        assert!(help.contains("ReferenceRepository"), "{}", help);
    }

    #[test]
    fn test_upload_requires_configuration() {
        assert!(Cli::try_parse_from(["sheet-ingest", "upload", "data.xlsx"]).is_err());
    }
}
