// ==========================================
// 表格导入系统 - 参考数据领域模型
// ==========================================
// 行业 → 产品 → 产品子类型，配置同时引用三者
// 用途: 上传时查出三级名称注入到每一行
// ==========================================

use crate::domain::types::EntityStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 名称最大长度
pub const MAX_NAME_LEN: usize = 200;
/// 描述最大长度
pub const MAX_DESCRIPTION_LEN: usize = 500;

// ==========================================
// ReferenceKind - 三级参考数据
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceKind {
    Industry,
    Product,
    ProductSubType,
}

impl ReferenceKind {
    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::Industry => "industry",
            ReferenceKind::Product => "product",
            ReferenceKind::ProductSubType => "product_subtype",
        }
    }

    /// 上级类型（行业无上级）
    pub fn parent(self) -> Option<ReferenceKind> {
        match self {
            ReferenceKind::Industry => None,
            ReferenceKind::Product => Some(ReferenceKind::Industry),
            ReferenceKind::ProductSubType => Some(ReferenceKind::Product),
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Industry => write!(f, "Industry"),
            ReferenceKind::Product => write!(f, "Product"),
            ReferenceKind::ProductSubType => write!(f, "ProductSubType"),
        }
    }
}

// ==========================================
// ReferenceEntity - 行业/产品/子类型通用实体
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntity {
    pub id: Uuid,
    pub kind: ReferenceKind,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>, // 产品 → 行业, 子类型 → 产品
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ==========================================
// Configuration - 配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub id: Uuid,
    pub name: String,
    pub industry_id: Uuid,
    pub product_id: Uuid,
    pub product_sub_type_id: Uuid,
    pub settings: Option<String>, // JSON
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ==========================================
// ConfigurationHierarchy - 配置解析后的三级名称（只读）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationHierarchy {
    pub configuration_id: Uuid,
    pub industry_name: String,
    pub product_name: String,
    pub sub_type_name: String,
}

impl ConfigurationHierarchy {
    /// 按注入列顺序返回名称
    pub fn names(&self) -> [&str; 3] {
        [
            self.industry_name.as_str(),
            self.product_name.as_str(),
            self.sub_type_name.as_str(),
        ]
    }
}
