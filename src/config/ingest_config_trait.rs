// ==========================================
// 表格导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::ingest_settings::IngestSettings;
use crate::domain::types::CoercionPolicy;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::PathBuf;

// ==========================================
// IngestConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
// 约定: 键不存在或值无法解析时返回默认值
#[async_trait]
pub trait IngestConfigReader: Send + Sync {
    /// 审计副本目录
    ///
    /// # 默认值
    /// - UploadedFiles
    async fn get_upload_dir(&self) -> ImportResult<PathBuf>;

    /// 表头行号（从 1 开始）
    ///
    /// # 默认值
    /// - 1
    async fn get_header_row(&self) -> ImportResult<usize>;

    /// 类型推断采样行数
    ///
    /// # 默认值
    /// - 100
    async fn get_sample_rows(&self) -> ImportResult<usize>;

    /// 主导类型占比阈值，取值 (0, 1]
    ///
    /// # 默认值
    /// - 0.8
    async fn get_dominance_ratio(&self) -> ImportResult<f64>;

    /// 落库批大小
    ///
    /// # 默认值
    /// - 1000
    async fn get_batch_size(&self) -> ImportResult<usize>;

    /// 落库超时（秒）
    ///
    /// # 默认值
    /// - 300
    async fn get_load_timeout_secs(&self) -> ImportResult<u64>;

    /// 单元格转换失败策略
    ///
    /// # 默认值
    /// - LENIENT
    async fn get_coercion_policy(&self) -> ImportResult<CoercionPolicy>;

    /// 是否独占建表（同名表已存在时失败）
    ///
    /// # 默认值
    /// - false
    async fn get_exclusive_create(&self) -> ImportResult<bool>;

    /// 一次读出全部导入参数
    async fn load_ingest_settings(&self) -> ImportResult<IngestSettings> {
        Ok(IngestSettings {
            upload_dir: self.get_upload_dir().await?,
            header_row: self.get_header_row().await?,
            sample_rows: self.get_sample_rows().await?,
            dominance_ratio: self.get_dominance_ratio().await?,
            batch_size: self.get_batch_size().await?,
            load_timeout_secs: self.get_load_timeout_secs().await?,
            coercion_policy: self.get_coercion_policy().await?,
            exclusive_create: self.get_exclusive_create().await?,
        })
    }
}
