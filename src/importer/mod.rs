// ==========================================
// 表格导入系统 - 导入层
// ==========================================
// 职责: 把上传的表格文件落到一张新建的数据库表
// 支持: Excel (.xlsx/.xlsm/.xls/.xlsb/.ods), CSV
// ==========================================

// 模块声明
pub mod audit_store;
pub mod bulk_loader;
pub mod coercion;
pub mod column_namer;
pub mod error;
pub mod file_parser;
pub mod sheet_cursor;
pub mod sheet_importer;
pub mod table_provisioner;
pub mod type_inference;
pub mod worksheet;

// 重导出核心类型
pub use audit_store::AuditFileStore;
pub use bulk_loader::{BulkLoader, LoadSummary, LoaderOptions};
pub use coercion::FieldValue;
pub use column_namer::{sanitize_column_name, unique_column_names, ColumnNamer};
pub use error::{ErrorCategory, ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, ReaderOptions, SheetFormat, WorkbookReader};
pub use sheet_cursor::SheetCursor;
pub use sheet_importer::{destination_table_name, SheetImporterImpl};
pub use table_provisioner::{create_table_sql, validate_table_name, TableProvisioner};
pub use type_inference::{InferenceOptions, TypeInferenceEngine};
pub use worksheet::{CellValue, Worksheet};

// 重导出 Trait 接口
pub use file_parser::SheetParser;
pub use sheet_importer::SheetImporter;
