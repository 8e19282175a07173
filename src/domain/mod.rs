// ==========================================
// 表格导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、报告结构
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod column;
pub mod reference;
pub mod report;
pub mod types;

// 重导出核心类型
pub use column::{ColumnMetadata, ColumnSchemaRow};
pub use reference::{Configuration, ConfigurationHierarchy, ReferenceEntity, ReferenceKind};
pub use report::{ColumnReport, HeaderInfo, UploadReport, ValidationReport};
pub use types::{CoercionPolicy, DestinationType, EntityStatus, InferredType};
