// ==========================================
// 表格导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 输入 / 查找 / 持久化 / 解析 / 内部
// ==========================================

use crate::domain::types::InferredType;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 输入错误（无副作用即返回）=====
    #[error("未上传文件")]
    MissingFile,

    #[error("上传文件为空: {0}")]
    EmptyFile(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xls/.xlsb/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("工作簿无工作表")]
    NoWorksheet,

    #[error("工作表为空: {0}")]
    EmptySheet(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 查找错误（无副作用即返回）=====
    #[error("配置不存在: {0}")]
    ConfigurationNotFound(Uuid),

    #[error("参考数据查询失败: {0}")]
    LookupFailed(String),

    // ===== 单元格解析错误（宽松模式下本地恢复）=====
    #[error("单元格转换失败 (行 {row}, 列 {column}): 无法将 '{raw}' 转为 {target}")]
    CellCoercion {
        row: usize,
        column: String,
        target: InferredType,
        raw: String,
    },

    // ===== 游标访问错误 =====
    #[error("列不存在: {0}")]
    ColumnNotFound(String),

    #[error("列序号越界: {ordinal}（列数 {field_count}）")]
    OrdinalOutOfRange { ordinal: usize, field_count: usize },

    #[error("游标未定位到数据行")]
    NoCurrentRow,

    // ===== 持久化错误（可能已有部分副作用）=====
    #[error("审计文件写入失败: {0}")]
    AuditWriteError(String),

    #[error("目标表名非法: {0}")]
    InvalidTableName(String),

    #[error("目标表已存在: {0}")]
    TableAlreadyExists(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("批量落库超时: 已耗时 {elapsed_secs}s（上限 {limit_secs}s），已提交 {rows_loaded} 行")]
    LoadTimeout {
        elapsed_secs: u64,
        limit_secs: u64,
        rows_loaded: usize,
    },

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 错误分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Lookup,
    Persistence,
    Parse,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "InputError"),
            ErrorCategory::Lookup => write!(f, "LookupError"),
            ErrorCategory::Persistence => write!(f, "PersistenceError"),
            ErrorCategory::Parse => write!(f, "ParseError"),
            ErrorCategory::Internal => write!(f, "InternalError"),
        }
    }
}

impl ImportError {
    /// 错误所属分类
    pub fn category(&self) -> ErrorCategory {
        match self {
            ImportError::MissingFile
            | ImportError::EmptyFile(_)
            | ImportError::UnsupportedFormat(_)
            | ImportError::NoWorksheet
            | ImportError::EmptySheet(_)
            | ImportError::ExcelParseError(_)
            | ImportError::CsvParseError(_) => ErrorCategory::Input,

            ImportError::ConfigurationNotFound(_) | ImportError::LookupFailed(_) => {
                ErrorCategory::Lookup
            }

            ImportError::CellCoercion { .. } => ErrorCategory::Parse,

            ImportError::AuditWriteError(_)
            | ImportError::InvalidTableName(_)
            | ImportError::TableAlreadyExists(_)
            | ImportError::DatabaseConnectionError(_)
            | ImportError::DatabaseTransactionError(_)
            | ImportError::DatabaseQueryError(_)
            | ImportError::LoadTimeout { .. } => ErrorCategory::Persistence,

            ImportError::ColumnNotFound(_)
            | ImportError::OrdinalOutOfRange { .. }
            | ImportError::NoCurrentRow
            | ImportError::ConfigReadError { .. }
            | ImportError::InternalError(_)
            | ImportError::Other(_) => ErrorCategory::Internal,
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::AuditWriteError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("already exists") => {
                ImportError::TableAlreadyExists(msg)
            }
            _ => ImportError::DatabaseQueryError(err.to_string()),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
