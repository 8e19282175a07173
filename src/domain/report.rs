// ==========================================
// 表格导入系统 - 导入/校验报告
// ==========================================
// 红线: 任何失败都以结构化报告返回，不向调用方抛出
// ==========================================

use crate::domain::column::ColumnMetadata;
use crate::domain::types::{DestinationType, InferredType};
use serde::{Deserialize, Serialize};

// ==========================================
// ColumnReport - 报告中的列信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnReport {
    pub name: String,
    pub inferred_type: InferredType,
    pub destination_type: DestinationType,
    pub source_ordinal: usize,
}

impl From<&ColumnMetadata> for ColumnReport {
    fn from(column: &ColumnMetadata) -> Self {
        Self {
            name: column.unique_name.clone(),
            inferred_type: column.inferred_type,
            destination_type: column.destination_type,
            source_ordinal: column.source_ordinal,
        }
    }
}

// ==========================================
// UploadReport - 单次上传结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReport {
    pub success: bool,
    pub message: String,
    pub destination_table: Option<String>,
    pub row_count: usize, // 不含表头
    pub columns: Vec<ColumnReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl UploadReport {
    pub fn succeeded(
        message: impl Into<String>,
        destination_table: String,
        row_count: usize,
        columns: &[ColumnMetadata],
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            destination_table: Some(destination_table),
            row_count,
            columns: columns.iter().map(ColumnReport::from).collect(),
            errors: None,
        }
    }

    pub fn failed(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            destination_table: None,
            row_count: 0,
            columns: Vec::new(),
            errors: Some(errors),
        }
    }
}

// ==========================================
// ValidationReport - 表头结构校验结果（无副作用）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub column_name: String,
    pub column_number: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub message: String,
    pub errors: Vec<String>,
    pub columns: Vec<HeaderInfo>,
    pub has_required_columns: bool,
    pub product_column: Option<String>,
    pub product_type_column: Option<String>,
    pub product_sub_type_column: Option<String>,
}

impl ValidationReport {
    pub fn rejected(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
            errors: vec![error.into()],
            ..Default::default()
        }
    }
}
