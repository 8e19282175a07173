// ==========================================
// 表格上传API
// ==========================================
// 职责: 按数据库路径组装上传编排器，供命令行调用
// ==========================================

use crate::api::error::ApiResult;
use crate::config::{ConfigManager, IngestConfigReader, IngestSettings};
use crate::domain::report::{UploadReport, ValidationReport};
use crate::importer::{ReaderOptions, SheetImporter, SheetImporterImpl, WorkbookReader};
use crate::repository::ReferenceRepository;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// 上传API
pub struct UploadApi {
    importer: SheetImporterImpl<Arc<ReferenceRepository>>,
}

impl UploadApi {
    /// 从 config_kv 读取导入参数
    pub async fn load_settings(db_path: &str) -> ApiResult<IngestSettings> {
        let config = ConfigManager::new(db_path)?;
        Ok(config.load_ingest_settings().await?)
    }

    /// 创建新的 UploadApi 实例（参数取自 config_kv）
    pub async fn new(db_path: &str) -> ApiResult<Self> {
        let settings = Self::load_settings(db_path).await?;
        Self::with_settings(db_path, settings)
    }

    /// 使用显式参数创建
    pub fn with_settings(db_path: &str, settings: IngestSettings) -> ApiResult<Self> {
        let repository = Arc::new(ReferenceRepository::new(db_path)?);
        let reader = WorkbookReader::new(ReaderOptions::default());
        Ok(Self {
            importer: SheetImporterImpl::new(repository, reader, settings, db_path),
        })
    }

    pub fn settings(&self) -> &IngestSettings {
        self.importer.settings()
    }

    /// 上传内存中的文件内容
    pub async fn upload_bytes(
        &self,
        file_name: &str,
        content: Option<&[u8]>,
        configuration_id: Uuid,
    ) -> UploadReport {
        self.importer
            .upload(file_name, content, configuration_id)
            .await
    }

    /// 上传磁盘文件；文件无法读取时按“未上传文件”处理
    pub async fn upload_file(&self, path: &Path, configuration_id: Uuid) -> UploadReport {
        let content = read_optional(path).await;
        self.importer
            .upload(&file_name_of(path), content.as_deref(), configuration_id)
            .await
    }

    /// 校验磁盘文件的表头
    pub async fn validate_file(&self, path: &Path) -> ValidationReport {
        let content = read_optional(path).await;
        self.importer
            .validate_sheet(&file_name_of(path), content.as_deref())
            .await
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

async fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "文件读取失败");
            None
        }
    }
}
