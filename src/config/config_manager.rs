// ==========================================
// 表格导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)，导入参数只读 global scope
// ==========================================

use crate::config::ingest_config_trait::IngestConfigReader;
use crate::config::ingest_settings::{DEFAULT_HEADER_ROW, DEFAULT_UPLOAD_DIR};
use crate::db::open_sqlite_connection;
use crate::domain::types::CoercionPolicy;
use crate::importer::bulk_loader::{DEFAULT_BATCH_SIZE, DEFAULT_LOAD_TIMEOUT_SECS};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::type_inference::{DEFAULT_DOMINANCE_RATIO, DEFAULT_SAMPLE_ROWS};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ImportError::DatabaseConnectionError(e.to_string()))?;
        let manager = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        manager.ensure_table()?;
        Ok(manager)
    }

    fn lock(&self) -> ImportResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))
    }

    /// 确保 config_kv 表存在
    pub fn ensure_table(&self) -> ImportResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
                scope_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;
        Ok(())
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ImportResult<String> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&json!(config_map))
            .map_err(|e| ImportError::InternalError(e.to_string()))
    }

    /// 读取并解析配置；不存在、无法解析或不满足约束时返回默认值
    fn get_parsed_or_default<T, F>(&self, key: &str, default: T, accept: F) -> ImportResult<T>
    where
        T: FromStr + Copy,
        F: Fn(&T) -> bool,
    {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(value) if accept(&value) => Ok(value),
            _ => {
                warn!(config_key = key, value = %raw, "配置值无效，使用默认值");
                Ok(default)
            }
        }
    }
}

#[async_trait]
impl IngestConfigReader for ConfigManager {
    async fn get_upload_dir(&self) -> ImportResult<PathBuf> {
        let value = self.get_global_config_value(config_keys::UPLOAD_DIR)?;
        Ok(match value {
            Some(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
            _ => PathBuf::from(DEFAULT_UPLOAD_DIR),
        })
    }

    async fn get_header_row(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(config_keys::HEADER_ROW, DEFAULT_HEADER_ROW, |v| *v >= 1)
    }

    async fn get_sample_rows(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(config_keys::SAMPLE_ROWS, DEFAULT_SAMPLE_ROWS, |v| *v >= 1)
    }

    async fn get_dominance_ratio(&self) -> ImportResult<f64> {
        self.get_parsed_or_default(
            config_keys::DOMINANCE_RATIO,
            DEFAULT_DOMINANCE_RATIO,
            |v| *v > 0.0 && *v <= 1.0,
        )
    }

    async fn get_batch_size(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(config_keys::BATCH_SIZE, DEFAULT_BATCH_SIZE, |v| *v >= 1)
    }

    async fn get_load_timeout_secs(&self) -> ImportResult<u64> {
        self.get_parsed_or_default(
            config_keys::LOAD_TIMEOUT_SECS,
            DEFAULT_LOAD_TIMEOUT_SECS,
            |_| true,
        )
    }

    async fn get_coercion_policy(&self) -> ImportResult<CoercionPolicy> {
        let Some(raw) = self.get_global_config_value(config_keys::COERCION_POLICY)? else {
            return Ok(CoercionPolicy::default());
        };
        Ok(CoercionPolicy::parse(&raw).unwrap_or_else(|| {
            warn!(config_key = config_keys::COERCION_POLICY, value = %raw, "配置值无效，使用默认值");
            CoercionPolicy::default()
        }))
    }

    async fn get_exclusive_create(&self) -> ImportResult<bool> {
        self.get_parsed_or_default(config_keys::EXCLUSIVE_CREATE, false, |_| true)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 审计副本
    pub const UPLOAD_DIR: &str = "ingest_upload_dir";

    // 表头与类型推断
    pub const HEADER_ROW: &str = "ingest_header_row";
    pub const SAMPLE_ROWS: &str = "ingest_sample_rows";
    pub const DOMINANCE_RATIO: &str = "ingest_dominance_ratio";
    pub const COERCION_POLICY: &str = "ingest_coercion_policy"; // LENIENT / STRICT

    // 落库
    pub const BATCH_SIZE: &str = "ingest_batch_size";
    pub const LOAD_TIMEOUT_SECS: &str = "ingest_load_timeout_secs";
    pub const EXCLUSIVE_CREATE: &str = "ingest_exclusive_create";
}
