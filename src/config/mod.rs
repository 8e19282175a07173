// ==========================================
// 表格导入系统 - 配置层
// ==========================================
// 职责: 导入参数管理，默认值 + config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod ingest_config_trait;
pub mod ingest_settings;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use ingest_config_trait::IngestConfigReader;
pub use ingest_settings::IngestSettings;
