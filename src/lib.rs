// ==========================================
// 表格导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + calamine
// 系统定位: 上传表格 → 推断列类型 → 动态建表 → 批量落库
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 参考数据访问
pub mod repository;

// 导入层 - 解析、推断、建表、落库
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 命令行
pub mod cli;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CoercionPolicy, DestinationType, EntityStatus, InferredType};

// 领域实体
pub use domain::{
    ColumnMetadata, ColumnReport, Configuration, ConfigurationHierarchy, ReferenceEntity,
    ReferenceKind, UploadReport, ValidationReport,
};

// 导入
pub use importer::{
    BulkLoader, ImportError, ImportResult, SheetCursor, SheetImporter, SheetImporterImpl,
    TableProvisioner, TypeInferenceEngine, WorkbookReader,
};

// API
pub use api::UploadApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "表格导入系统";
