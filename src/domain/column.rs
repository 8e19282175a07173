// ==========================================
// 表格导入系统 - 列元数据
// ==========================================
// 用途: 游标构造时生成，建表与批量落库共用
// ==========================================

use crate::domain::types::{DestinationType, InferredType};
use serde::{Deserialize, Serialize};

// ==========================================
// ColumnMetadata - 列元数据
// ==========================================
// 不变量:
// - unique_name 在同一游标内唯一
// - source_ordinal 为源工作表物理列号（从 1 开始），一一对应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub original_name: String,             // 表头原文
    pub unique_name: String,               // 清洗去重后的列名
    pub source_ordinal: usize,             // 源列号（1-based）
    pub inferred_type: InferredType,       // 推断类型
    pub destination_type: DestinationType, // 目标列类型
}

impl ColumnMetadata {
    pub fn new(
        original_name: impl Into<String>,
        unique_name: impl Into<String>,
        source_ordinal: usize,
        inferred_type: InferredType,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            unique_name: unique_name.into(),
            source_ordinal,
            inferred_type,
            destination_type: inferred_type.destination_type(),
        }
    }
}

// ==========================================
// ColumnSchemaRow - 诊断用 schema 视图行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchemaRow {
    pub column_name: String,
    pub original_name: String,
    pub ordinal: usize,       // 游标内序号（0-based）
    pub column_number: usize, // 源列号（1-based）
    pub inferred_type: InferredType,
    pub destination_type: DestinationType,
}
