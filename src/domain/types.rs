// ==========================================
// 表格导入系统 - 领域类型定义
// ==========================================
// 职责: 推断类型 / 目标列类型 / 转换策略 / 实体状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 推断类型 (Inferred Type)
// ==========================================
// 封闭枚举: 每个标签对应唯一的目标列类型与唯一的转换函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InferredType {
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Guid,
    String,
}

impl InferredType {
    /// 推断类型 → 目标列类型（单一查表）
    pub fn destination_type(self) -> DestinationType {
        match self {
            InferredType::Integer => DestinationType::Int32,
            InferredType::Decimal => DestinationType::Numeric,
            InferredType::Boolean => DestinationType::Bit,
            InferredType::DateTime => DestinationType::Timestamp,
            InferredType::Guid => DestinationType::Uuid,
            InferredType::String => DestinationType::Text,
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferredType::Integer => write!(f, "Integer"),
            InferredType::Decimal => write!(f, "Decimal"),
            InferredType::Boolean => write!(f, "Boolean"),
            InferredType::DateTime => write!(f, "DateTime"),
            InferredType::Guid => write!(f, "Guid"),
            InferredType::String => write!(f, "String"),
        }
    }
}

// ==========================================
// 目标列类型 (Destination Type)
// ==========================================
// DDL 中使用的列类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DestinationType {
    Int32,     // 32 位整数
    Numeric,   // 定点数, 2 位小数
    Bit,       // 布尔
    Timestamp, // 时间戳
    Uuid,      // 128 位唯一标识
    Text,      // 大文本
}

impl DestinationType {
    /// DDL 类型声明
    pub fn sql_type(self) -> &'static str {
        match self {
            DestinationType::Int32 => "INT",
            DestinationType::Numeric => "NUMERIC(18,2)",
            DestinationType::Bit => "BOOLEAN",
            DestinationType::Timestamp => "TIMESTAMP",
            DestinationType::Uuid => "UUID",
            DestinationType::Text => "TEXT",
        }
    }
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type())
    }
}

// ==========================================
// 单元格转换失败策略 (Coercion Policy)
// ==========================================
// Lenient: 转换失败时返回单元格原始文本（默认）
// Strict:  转换失败时读取报错
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoercionPolicy {
    #[default]
    Lenient,
    Strict,
}

impl CoercionPolicy {
    /// 从配置字符串解析（大小写不敏感）
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "LENIENT" => Some(CoercionPolicy::Lenient),
            "STRICT" => Some(CoercionPolicy::Strict),
            _ => None,
        }
    }
}

impl fmt::Display for CoercionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoercionPolicy::Lenient => write!(f, "LENIENT"),
            CoercionPolicy::Strict => write!(f, "STRICT"),
        }
    }
}

// ==========================================
// 实体状态 (Entity Status)
// ==========================================
// 软删除: 状态置为 DELETED，读路径按状态过滤，不解除归属关系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    Active,
    Deleted,
}

impl EntityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityStatus::Active => "ACTIVE",
            EntityStatus::Deleted => "DELETED",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "DELETED" => EntityStatus::Deleted,
            _ => EntityStatus::Active,
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
