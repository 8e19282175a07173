// ==========================================
// 表格导入系统 - 上传编排
// ==========================================
// 流程: 校验输入 → 查配置 → 写审计副本 → 解析 → 注入三级名称
//       → 构造游标 → 建表并批量落库 → 报告
// 红线:
// - 输入错误与查找错误在任何副作用之前返回
// - 写审计副本之后的任何失败都删除副本（表与已提交批次保留）
// - 所有失败都以 UploadReport 返回，不向调用方抛出
// ==========================================

use crate::config::IngestSettings;
use crate::db::open_sqlite_connection;
use crate::domain::reference::ConfigurationHierarchy;
use crate::domain::report::{HeaderInfo, UploadReport, ValidationReport};
use crate::importer::audit_store::AuditFileStore;
use crate::importer::bulk_loader::BulkLoader;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{SheetFormat, WorkbookReader};
use crate::importer::sheet_cursor::SheetCursor;
use crate::importer::type_inference::TypeInferenceEngine;
use crate::importer::worksheet::{CellValue, Worksheet};
use crate::repository::ConfigurationLookup;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// 注入到每行最前面的三列表头
pub const INJECTED_HEADERS: [&str; 3] = ["Industry", "Product", "ProductSubType"];

// 表头校验: 前三列可接受的写法（大小写不敏感）
const PRODUCT_HEADERS: &[&str] = &["Product"];
const PRODUCT_TYPE_HEADERS: &[&str] = &["ProductType", "Product Type"];
const PRODUCT_SUB_TYPE_HEADERS: &[&str] =
    &["ProductSubType", "Product SubType", "Product Sub Type"];

/// 目标表名: Upload_<配置 ID 32 位十六进制>_<UTC yyyyMMddHHmmss>
///
/// 同一配置在同一秒内的两次上传会得到同一表名
pub fn destination_table_name(configuration_id: Uuid, at: DateTime<Utc>) -> String {
    format!(
        "Upload_{}_{}",
        configuration_id.simple(),
        at.format("%Y%m%d%H%M%S")
    )
}

/// 在表头行之前插入三列，并为每个数据行填入三级名称
pub fn inject_hierarchy_columns(
    sheet: &mut Worksheet,
    header_row: usize,
    hierarchy: &ConfigurationHierarchy,
) -> ImportResult<()> {
    let dimension = sheet
        .dimension()
        .filter(|d| d.end_row >= header_row)
        .ok_or_else(|| ImportError::EmptySheet(sheet.name().to_string()))?;

    sheet.insert_columns(1, INJECTED_HEADERS.len());
    for (i, header) in INJECTED_HEADERS.iter().enumerate() {
        sheet.set(header_row, i + 1, CellValue::from(*header));
    }

    let names = hierarchy.names();
    for row in (header_row + 1)..=dimension.end_row {
        for (i, name) in names.iter().enumerate() {
            sheet.set(row, i + 1, CellValue::from(*name));
        }
    }
    Ok(())
}

fn header_matches(actual: &str, accepted: &[&str]) -> bool {
    let actual = actual.trim();
    accepted.iter().any(|a| a.eq_ignore_ascii_case(actual))
}

// ==========================================
// SheetImporter Trait
// ==========================================
// 实现者: SheetImporterImpl
#[async_trait]
pub trait SheetImporter: Send + Sync {
    /// 上传一个表格文件并落到新表
    ///
    /// # 参数
    /// - file_name: 客户端文件名（用于识别格式与命名审计副本）
    /// - content: 文件内容；None 表示未上传
    /// - configuration_id: 配置 ID
    ///
    /// # 返回
    /// - UploadReport: 成功时含目标表名、行数（不含表头）、列元数据
    async fn upload(
        &self,
        file_name: &str,
        content: Option<&[u8]>,
        configuration_id: Uuid,
    ) -> UploadReport;

    /// 校验前三列表头（无副作用）
    async fn validate_sheet(&self, file_name: &str, content: Option<&[u8]>) -> ValidationReport;
}

// ==========================================
// SheetImporterImpl
// ==========================================
pub struct SheetImporterImpl<L>
where
    L: ConfigurationLookup,
{
    // 配置查找
    lookup: L,

    // 导入组件
    reader: WorkbookReader,
    engine: TypeInferenceEngine,
    loader: BulkLoader,
    audit: AuditFileStore,

    settings: IngestSettings,
    db_path: String,
}

impl<L> SheetImporterImpl<L>
where
    L: ConfigurationLookup,
{
    /// 创建上传编排器
    ///
    /// # 参数
    /// - lookup: 配置查找
    /// - reader: 工作簿读取器（显式注入，替代进程级初始化）
    /// - settings: 导入参数
    /// - db_path: 目标数据库路径（每次上传单独打开连接）
    pub fn new(
        lookup: L,
        reader: WorkbookReader,
        settings: IngestSettings,
        db_path: impl Into<String>,
    ) -> Self {
        Self {
            lookup,
            reader,
            engine: TypeInferenceEngine::new(settings.inference_options()),
            loader: BulkLoader::new(settings.loader_options()),
            audit: AuditFileStore::new(settings.upload_dir.clone()),
            settings,
            db_path: db_path.into(),
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// 步骤 1: 输入校验（无副作用）
    fn check_input<'a>(file_name: &str, content: Option<&'a [u8]>) -> ImportResult<&'a [u8]> {
        let bytes = match content {
            Some(b) if !file_name.trim().is_empty() => b,
            _ => return Err(ImportError::MissingFile),
        };
        if bytes.is_empty() {
            return Err(ImportError::EmptyFile(file_name.to_string()));
        }
        SheetFormat::from_file_name(file_name)?;
        Ok(bytes)
    }

    /// 步骤 2: 查配置（无副作用）
    async fn resolve_hierarchy(&self, configuration_id: Uuid) -> ImportResult<ConfigurationHierarchy> {
        self.lookup
            .find_hierarchy(configuration_id)
            .await
            .map_err(|e| ImportError::LookupFailed(e.to_string()))?
            .ok_or(ImportError::ConfigurationNotFound(configuration_id))
    }

    /// 步骤 4-7: 从审计副本解析并落库
    fn load_from_copy(
        &self,
        audit_path: &Path,
        hierarchy: &ConfigurationHierarchy,
    ) -> ImportResult<UploadReport> {
        let header_row = self.settings.header_row;

        debug!("步骤 4: 解析审计副本");
        let mut sheet = self.reader.read_path(audit_path)?;

        debug!("步骤 5: 注入三级名称列");
        inject_hierarchy_columns(&mut sheet, header_row, hierarchy)?;

        debug!("步骤 6: 构造游标");
        let mut cursor = SheetCursor::new(
            sheet,
            header_row,
            true,
            &self.engine,
            self.settings.coercion_policy,
        )?;
        let row_count = cursor.data_row_count();

        debug!("步骤 7: 建表并批量落库");
        let table = destination_table_name(hierarchy.configuration_id, Utc::now());
        let mut conn = open_sqlite_connection(&self.db_path)
            .map_err(|e| ImportError::DatabaseConnectionError(e.to_string()))?;
        let summary = self.loader.load(&mut conn, &table, &mut cursor)?;

        Ok(UploadReport::succeeded(
            format!("成功导入 {} 行到表 {}", summary.rows_loaded, table),
            table,
            row_count,
            cursor.columns(),
        ))
    }

    async fn try_upload(
        &self,
        file_name: &str,
        content: Option<&[u8]>,
        configuration_id: Uuid,
    ) -> ImportResult<UploadReport> {
        debug!("步骤 1: 输入校验");
        let bytes = Self::check_input(file_name, content)?;

        debug!("步骤 2: 查询配置");
        let hierarchy = self.resolve_hierarchy(configuration_id).await?;

        debug!("步骤 3: 写审计副本");
        let audit_path = self.audit.save(file_name, bytes).await?;

        match self.load_from_copy(&audit_path, &hierarchy) {
            Ok(report) => Ok(report),
            Err(e) => {
                self.audit.discard(&audit_path).await;
                Err(e)
            }
        }
    }

    fn read_headers(&self, file_name: &str, bytes: &[u8]) -> ImportResult<Vec<HeaderInfo>> {
        let sheet = self.reader.read_bytes(file_name, bytes)?;
        let header_row = self.settings.header_row;
        let dimension = sheet
            .dimension()
            .filter(|d| d.end_row >= header_row)
            .ok_or_else(|| ImportError::EmptySheet(sheet.name().to_string()))?;

        Ok((1..=dimension.end_col)
            .map(|col| HeaderInfo {
                column_name: sheet.get(header_row, col).to_string().trim().to_string(),
                column_number: col,
            })
            .collect())
    }
}

#[async_trait]
impl<L> SheetImporter for SheetImporterImpl<L>
where
    L: ConfigurationLookup + Send + Sync,
{
    #[instrument(skip(self, content), fields(configuration_id = %configuration_id))]
    async fn upload(
        &self,
        file_name: &str,
        content: Option<&[u8]>,
        configuration_id: Uuid,
    ) -> UploadReport {
        info!(file_name = %file_name, "开始上传");

        match self.try_upload(file_name, content, configuration_id).await {
            Ok(report) => {
                info!(
                    table = report.destination_table.as_deref().unwrap_or_default(),
                    rows = report.row_count,
                    columns = report.columns.len(),
                    "上传完成"
                );
                report
            }
            Err(e) => {
                let category = e.category();
                error!(category = %category, error = %e, "上传失败");
                UploadReport::failed(format!("{}: {}", category, e), vec![e.to_string()])
            }
        }
    }

    #[instrument(skip(self, content))]
    async fn validate_sheet(&self, file_name: &str, content: Option<&[u8]>) -> ValidationReport {
        let bytes = match Self::check_input(file_name, content) {
            Ok(b) => b,
            Err(e) => return ValidationReport::rejected(e.category().to_string(), e.to_string()),
        };

        let columns = match self.read_headers(file_name, bytes) {
            Ok(c) => c,
            Err(e) => return ValidationReport::rejected(e.category().to_string(), e.to_string()),
        };

        let header_at = |i: usize| columns.get(i).map(|h| h.column_name.clone());
        let expectations: [(&[&str], &str); 3] = [
            (PRODUCT_HEADERS, "Product"),
            (PRODUCT_TYPE_HEADERS, "ProductType"),
            (PRODUCT_SUB_TYPE_HEADERS, "ProductSubType"),
        ];

        let mut errors = Vec::new();
        for (i, (accepted, expected)) in expectations.iter().enumerate() {
            let actual = header_at(i).unwrap_or_default();
            if !header_matches(&actual, accepted) {
                errors.push(format!(
                    "第 {} 列应为 '{}'，实际为 '{}'",
                    i + 1,
                    expected,
                    actual
                ));
            }
        }

        let is_valid = errors.is_empty();
        debug!(is_valid = is_valid, headers = columns.len(), "表头校验完成");

        ValidationReport {
            is_valid,
            message: if is_valid {
                "表头校验通过".to_string()
            } else {
                "表头校验失败".to_string()
            },
            errors,
            has_required_columns: is_valid,
            product_column: header_at(0),
            product_type_column: header_at(1),
            product_sub_type_column: header_at(2),
            columns,
        }
    }
}
