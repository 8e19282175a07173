// ==========================================
// 表格导入系统 - 参考数据仓储
// ==========================================
// 职责: 管理 industry / product / product_subtype / configuration 表
// 软删除: status 置为 DELETED，不解除归属关系；读路径按 include_deleted 过滤
// 红线: 已删除记录不可再删除，未删除记录不可恢复
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::reference::{
    Configuration, ConfigurationHierarchy, ReferenceEntity, ReferenceKind, MAX_DESCRIPTION_LEN,
    MAX_NAME_LEN,
};
use crate::domain::types::EntityStatus;
use crate::repository::configuration_lookup::ConfigurationLookup;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

// ==========================================
// 字段校验
// ==========================================

/// 名称: 去除首尾空白后非空且不超过 200 字符
pub fn validate_name(raw: &str) -> RepositoryResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(RepositoryError::FieldValueError {
            field: "name".to_string(),
            message: "名称不能为空".to_string(),
        });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(RepositoryError::FieldValueError {
            field: "name".to_string(),
            message: format!("名称不能超过 {} 字符", MAX_NAME_LEN),
        });
    }
    Ok(name.to_string())
}

/// 描述: 可空；空白视为无描述；不超过 500 字符
pub fn validate_description(raw: Option<&str>) -> RepositoryResult<Option<String>> {
    let Some(description) = raw.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(RepositoryError::FieldValueError {
            field: "description".to_string(),
            message: format!("描述不能超过 {} 字符", MAX_DESCRIPTION_LEN),
        });
    }
    Ok(Some(description.to_string()))
}

fn validate_settings(raw: Option<&str>) -> RepositoryResult<Option<String>> {
    let Some(settings) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    serde_json::from_str::<serde_json::Value>(settings).map_err(|e| {
        RepositoryError::FieldValueError {
            field: "settings".to_string(),
            message: format!("不是合法 JSON: {}", e),
        }
    })?;
    Ok(Some(settings.to_string()))
}

fn ensure_transition(current: EntityStatus, target: EntityStatus) -> RepositoryResult<()> {
    if current == target {
        return Err(RepositoryError::InvalidStateTransition {
            from: current.to_string(),
            to: target.to_string(),
        });
    }
    Ok(())
}

fn not_found(entity: impl ToString, id: Uuid) -> RepositoryError {
    RepositoryError::NotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    }
}

// ===== 行映射 =====

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| {
        Uuid::parse_str(&r)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn parent_column(kind: ReferenceKind) -> Option<&'static str> {
    match kind {
        ReferenceKind::Industry => None,
        ReferenceKind::Product => Some("industry_id"),
        ReferenceKind::ProductSubType => Some("product_id"),
    }
}

fn reference_select(kind: ReferenceKind) -> String {
    format!(
        "SELECT id, name, description, {} AS parent_id, status, created_at, updated_at FROM {}",
        parent_column(kind).unwrap_or("NULL"),
        kind.table()
    )
}

fn map_reference(kind: ReferenceKind, row: &Row<'_>) -> rusqlite::Result<ReferenceEntity> {
    Ok(ReferenceEntity {
        id: uuid_at(row, 0)?,
        kind,
        name: row.get(1)?,
        description: row.get(2)?,
        parent_id: optional_uuid_at(row, 3)?,
        status: EntityStatus::parse(&row.get::<_, String>(4)?),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const CONFIGURATION_SELECT: &str = "SELECT id, name, industry_id, product_id, product_subtype_id, \
     settings, status, created_at, updated_at FROM configuration";

fn map_configuration(row: &Row<'_>) -> rusqlite::Result<Configuration> {
    Ok(Configuration {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        industry_id: uuid_at(row, 2)?,
        product_id: uuid_at(row, 3)?,
        product_sub_type_id: uuid_at(row, 4)?,
        settings: row.get(5)?,
        status: EntityStatus::parse(&row.get::<_, String>(6)?),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

// ==========================================
// ReferenceRepository
// ==========================================
pub struct ReferenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReferenceRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 确保表存在（如果不存在则创建）
    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS industry (
              id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              description TEXT,
              status TEXT NOT NULL DEFAULT 'ACTIVE',
              created_at TEXT NOT NULL,
              updated_at TEXT
            );

            CREATE TABLE IF NOT EXISTS product (
              id TEXT PRIMARY KEY,
              industry_id TEXT NOT NULL,
              name TEXT NOT NULL,
              description TEXT,
              status TEXT NOT NULL DEFAULT 'ACTIVE',
              created_at TEXT NOT NULL,
              updated_at TEXT,
              FOREIGN KEY (industry_id) REFERENCES industry(id)
            );

            CREATE TABLE IF NOT EXISTS product_subtype (
              id TEXT PRIMARY KEY,
              product_id TEXT NOT NULL,
              name TEXT NOT NULL,
              description TEXT,
              status TEXT NOT NULL DEFAULT 'ACTIVE',
              created_at TEXT NOT NULL,
              updated_at TEXT,
              FOREIGN KEY (product_id) REFERENCES product(id)
            );

            CREATE TABLE IF NOT EXISTS configuration (
              id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              industry_id TEXT NOT NULL,
              product_id TEXT NOT NULL,
              product_subtype_id TEXT NOT NULL,
              settings TEXT,
              status TEXT NOT NULL DEFAULT 'ACTIVE',
              created_at TEXT NOT NULL,
              updated_at TEXT,
              FOREIGN KEY (industry_id) REFERENCES industry(id),
              FOREIGN KEY (product_id) REFERENCES product(id),
              FOREIGN KEY (product_subtype_id) REFERENCES product_subtype(id)
            );

            CREATE INDEX IF NOT EXISTS idx_product_industry ON product(industry_id);
            CREATE INDEX IF NOT EXISTS idx_product_subtype_product ON product_subtype(product_id);
            "#,
        )?;
        Ok(())
    }

    // ==========================================
    // 行业 / 产品 / 子类型
    // ==========================================

    fn load_reference(
        conn: &Connection,
        kind: ReferenceKind,
        id: Uuid,
    ) -> RepositoryResult<Option<ReferenceEntity>> {
        let sql = format!("{} WHERE id = ?1", reference_select(kind));
        let entity = conn
            .query_row(&sql, params![id.to_string()], |row| map_reference(kind, row))
            .optional()?;
        Ok(entity)
    }

    // 引用的记录必须存在且未删除
    fn require_active(
        conn: &Connection,
        kind: ReferenceKind,
        id: Uuid,
    ) -> RepositoryResult<ReferenceEntity> {
        let entity = Self::load_reference(conn, kind, id)?.ok_or_else(|| not_found(kind, id))?;
        if entity.status != EntityStatus::Active {
            return Err(RepositoryError::ValidationError(format!(
                "{} {} 已删除",
                kind, id
            )));
        }
        Ok(entity)
    }

    /// 新建行业/产品/子类型
    ///
    /// # 参数
    /// - parent_id: 产品必须指向行业，子类型必须指向产品，行业必须为 None
    pub fn create_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
        description: Option<&str>,
        parent_id: Option<Uuid>,
    ) -> RepositoryResult<ReferenceEntity> {
        let name = validate_name(name)?;
        let description = validate_description(description)?;
        let conn = self.get_conn()?;

        match (kind.parent(), parent_id) {
            (Some(parent_kind), Some(pid)) => {
                Self::require_active(&conn, parent_kind, pid)?;
            }
            (Some(parent_kind), None) => {
                return Err(RepositoryError::FieldValueError {
                    field: "parent_id".to_string(),
                    message: format!("{} 必须指定所属 {}", kind, parent_kind),
                });
            }
            (None, Some(_)) => {
                return Err(RepositoryError::FieldValueError {
                    field: "parent_id".to_string(),
                    message: format!("{} 没有上级", kind),
                });
            }
            (None, None) => {}
        }

        let entity = ReferenceEntity {
            id: Uuid::new_v4(),
            kind,
            name,
            description,
            parent_id,
            status: EntityStatus::Active,
            created_at: Utc::now(),
            updated_at: None,
        };

        match parent_column(kind) {
            Some(column) => {
                conn.execute(
                    &format!(
                        "INSERT INTO {} (id, {}, name, description, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        kind.table(),
                        column
                    ),
                    params![
                        entity.id.to_string(),
                        entity.parent_id.map(|p| p.to_string()),
                        entity.name,
                        entity.description,
                        entity.status.as_str(),
                        entity.created_at,
                    ],
                )?;
            }
            None => {
                conn.execute(
                    &format!(
                        "INSERT INTO {} (id, name, description, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                        kind.table()
                    ),
                    params![
                        entity.id.to_string(),
                        entity.name,
                        entity.description,
                        entity.status.as_str(),
                        entity.created_at,
                    ],
                )?;
            }
        }

        info!(kind = %kind, id = %entity.id, name = %entity.name, "参考数据已创建");
        Ok(entity)
    }

    /// 按 ID 查询（含已删除记录，状态见 status）
    pub fn get_reference(
        &self,
        kind: ReferenceKind,
        id: Uuid,
    ) -> RepositoryResult<Option<ReferenceEntity>> {
        let conn = self.get_conn()?;
        Self::load_reference(&conn, kind, id)
    }

    /// 列表（按名称排序）
    pub fn list_references(
        &self,
        kind: ReferenceKind,
        include_deleted: bool,
    ) -> RepositoryResult<Vec<ReferenceEntity>> {
        let conn = self.get_conn()?;
        let filter = if include_deleted {
            ""
        } else {
            " WHERE status = 'ACTIVE'"
        };
        let sql = format!("{}{} ORDER BY name, created_at", reference_select(kind), filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| map_reference(kind, row))?;
        let entities = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entities)
    }

    /// 修改名称与描述；已删除记录不可修改
    pub fn update_reference(
        &self,
        kind: ReferenceKind,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> RepositoryResult<ReferenceEntity> {
        let name = validate_name(name)?;
        let description = validate_description(description)?;
        let conn = self.get_conn()?;

        let mut entity = Self::require_active(&conn, kind, id)?;
        let now = Utc::now();
        conn.execute(
            &format!(
                "UPDATE {} SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                kind.table()
            ),
            params![name, description, now, id.to_string()],
        )?;

        entity.name = name;
        entity.description = description;
        entity.updated_at = Some(now);
        debug!(kind = %kind, id = %id, "参考数据已更新");
        Ok(entity)
    }

    /// 软删除
    pub fn soft_delete_reference(&self, kind: ReferenceKind, id: Uuid) -> RepositoryResult<()> {
        self.set_reference_status(kind, id, EntityStatus::Deleted)
    }

    /// 恢复已删除记录
    pub fn restore_reference(&self, kind: ReferenceKind, id: Uuid) -> RepositoryResult<()> {
        self.set_reference_status(kind, id, EntityStatus::Active)
    }

    fn set_reference_status(
        &self,
        kind: ReferenceKind,
        id: Uuid,
        target: EntityStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let entity = Self::load_reference(&conn, kind, id)?.ok_or_else(|| not_found(kind, id))?;
        ensure_transition(entity.status, target)?;
        Self::write_status(&conn, kind.table(), id, target)?;
        info!(kind = %kind, id = %id, status = %target, "参考数据状态已变更");
        Ok(())
    }

    fn write_status(
        conn: &Connection,
        table: &str,
        id: Uuid,
        status: EntityStatus,
    ) -> RepositoryResult<()> {
        let now: DateTime<Utc> = Utc::now();
        conn.execute(
            &format!("UPDATE {} SET status = ?1, updated_at = ?2 WHERE id = ?3", table),
            params![status.as_str(), now, id.to_string()],
        )?;
        Ok(())
    }

    // ==========================================
    // 配置
    // ==========================================

    fn load_configuration(conn: &Connection, id: Uuid) -> RepositoryResult<Option<Configuration>> {
        let sql = format!("{} WHERE id = ?1", CONFIGURATION_SELECT);
        let configuration = conn
            .query_row(&sql, params![id.to_string()], map_configuration)
            .optional()?;
        Ok(configuration)
    }

    /// 新建配置
    ///
    /// 三个引用必须存在、未删除，且构成同一条 行业 → 产品 → 子类型 链
    pub fn create_configuration(
        &self,
        name: &str,
        industry_id: Uuid,
        product_id: Uuid,
        product_sub_type_id: Uuid,
        settings: Option<&str>,
    ) -> RepositoryResult<Configuration> {
        let name = validate_name(name)?;
        let settings = validate_settings(settings)?;
        let conn = self.get_conn()?;

        Self::require_active(&conn, ReferenceKind::Industry, industry_id)?;
        let product = Self::require_active(&conn, ReferenceKind::Product, product_id)?;
        let sub_type = Self::require_active(&conn, ReferenceKind::ProductSubType, product_sub_type_id)?;
        if product.parent_id != Some(industry_id) {
            return Err(RepositoryError::ValidationError(format!(
                "产品 {} 不属于行业 {}",
                product_id, industry_id
            )));
        }
        if sub_type.parent_id != Some(product_id) {
            return Err(RepositoryError::ValidationError(format!(
                "子类型 {} 不属于产品 {}",
                product_sub_type_id, product_id
            )));
        }

        let configuration = Configuration {
            id: Uuid::new_v4(),
            name,
            industry_id,
            product_id,
            product_sub_type_id,
            settings,
            status: EntityStatus::Active,
            created_at: Utc::now(),
            updated_at: None,
        };

        conn.execute(
            r#"
            INSERT INTO configuration (
                id, name, industry_id, product_id, product_subtype_id, settings, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                configuration.id.to_string(),
                configuration.name,
                configuration.industry_id.to_string(),
                configuration.product_id.to_string(),
                configuration.product_sub_type_id.to_string(),
                configuration.settings,
                configuration.status.as_str(),
                configuration.created_at,
            ],
        )?;

        info!(id = %configuration.id, name = %configuration.name, "配置已创建");
        Ok(configuration)
    }

    pub fn get_configuration(&self, id: Uuid) -> RepositoryResult<Option<Configuration>> {
        let conn = self.get_conn()?;
        Self::load_configuration(&conn, id)
    }

    pub fn list_configurations(&self, include_deleted: bool) -> RepositoryResult<Vec<Configuration>> {
        let conn = self.get_conn()?;
        let filter = if include_deleted {
            ""
        } else {
            " WHERE status = 'ACTIVE'"
        };
        let sql = format!("{}{} ORDER BY name, created_at", CONFIGURATION_SELECT, filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_configuration)?;
        let configurations = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(configurations)
    }

    /// 修改名称与 settings；已删除配置不可修改
    pub fn update_configuration(
        &self,
        id: Uuid,
        name: &str,
        settings: Option<&str>,
    ) -> RepositoryResult<Configuration> {
        let name = validate_name(name)?;
        let settings = validate_settings(settings)?;
        let conn = self.get_conn()?;

        let mut configuration =
            Self::load_configuration(&conn, id)?.ok_or_else(|| not_found("Configuration", id))?;
        if configuration.status != EntityStatus::Active {
            return Err(RepositoryError::ValidationError(format!("配置 {} 已删除", id)));
        }

        let now = Utc::now();
        conn.execute(
            "UPDATE configuration SET name = ?1, settings = ?2, updated_at = ?3 WHERE id = ?4",
            params![name, settings, now, id.to_string()],
        )?;

        configuration.name = name;
        configuration.settings = settings;
        configuration.updated_at = Some(now);
        Ok(configuration)
    }

    pub fn soft_delete_configuration(&self, id: Uuid) -> RepositoryResult<()> {
        self.set_configuration_status(id, EntityStatus::Deleted)
    }

    pub fn restore_configuration(&self, id: Uuid) -> RepositoryResult<()> {
        self.set_configuration_status(id, EntityStatus::Active)
    }

    fn set_configuration_status(&self, id: Uuid, target: EntityStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let configuration =
            Self::load_configuration(&conn, id)?.ok_or_else(|| not_found("Configuration", id))?;
        ensure_transition(configuration.status, target)?;
        Self::write_status(&conn, "configuration", id, target)?;
        info!(id = %id, status = %target, "配置状态已变更");
        Ok(())
    }

    /// 查询配置的三级名称（仅未删除配置）
    pub fn find_configuration_hierarchy(
        &self,
        configuration_id: Uuid,
    ) -> RepositoryResult<Option<ConfigurationHierarchy>> {
        let conn = self.get_conn()?;
        let hierarchy = conn
            .query_row(
                r#"
                SELECT i.name, p.name, s.name
                FROM configuration c
                JOIN industry i ON i.id = c.industry_id
                JOIN product p ON p.id = c.product_id
                JOIN product_subtype s ON s.id = c.product_subtype_id
                WHERE c.id = ?1 AND c.status = 'ACTIVE'
                "#,
                params![configuration_id.to_string()],
                |row| {
                    Ok(ConfigurationHierarchy {
                        configuration_id,
                        industry_name: row.get(0)?,
                        product_name: row.get(1)?,
                        sub_type_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(hierarchy)
    }
}

#[async_trait]
impl ConfigurationLookup for ReferenceRepository {
    async fn find_hierarchy(
        &self,
        configuration_id: Uuid,
    ) -> RepositoryResult<Option<ConfigurationHierarchy>> {
        self.find_configuration_hierarchy(configuration_id)
    }
}
