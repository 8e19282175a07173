// ==========================================
// 表格导入系统 - 目标表建表
// ==========================================
// 默认: CREATE TABLE IF NOT EXISTS（幂等，重复执行无副作用）
// 独占模式: 普通 CREATE TABLE，同名表已存在时报错
// 表结构: 自增代理主键 "Id" + 每列一个可空字段
// ==========================================

use crate::domain::column::ColumnMetadata;
use crate::importer::error::{ImportError, ImportResult};
use rusqlite::Connection;
use tracing::debug;

/// 表名最大长度
pub const MAX_TABLE_NAME_LEN: usize = 128;

/// 代理主键列名
pub const SURROGATE_KEY_COLUMN: &str = "Id";

/// 校验目标表名: 非空、长度上限、仅 ASCII 字母数字与下划线
pub fn validate_table_name(name: &str) -> ImportResult<()> {
    if name.is_empty() {
        return Err(ImportError::InvalidTableName("表名为空".to_string()));
    }
    if name.len() > MAX_TABLE_NAME_LEN {
        return Err(ImportError::InvalidTableName(format!(
            "{}（超过 {} 字符）",
            name, MAX_TABLE_NAME_LEN
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ImportError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

/// 双引号转义标识符
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// 生成建表 DDL
pub fn create_table_sql(table: &str, columns: &[ColumnMetadata], exclusive: bool) -> String {
    let mut definitions = Vec::with_capacity(columns.len() + 1);
    definitions.push(format!(
        "    {} INTEGER PRIMARY KEY AUTOINCREMENT",
        quote_identifier(SURROGATE_KEY_COLUMN)
    ));
    for column in columns {
        definitions.push(format!(
            "    {} {} NULL",
            quote_identifier(&column.unique_name),
            column.destination_type.sql_type()
        ));
    }

    let create = if exclusive {
        "CREATE TABLE"
    } else {
        "CREATE TABLE IF NOT EXISTS"
    };

    format!(
        "{} {} (\n{}\n)",
        create,
        quote_identifier(table),
        definitions.join(",\n")
    )
}

// ==========================================
// TableProvisioner
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct TableProvisioner {
    exclusive: bool,
}

impl TableProvisioner {
    pub fn new(exclusive: bool) -> Self {
        Self { exclusive }
    }

    /// 生成经过表名校验的 DDL
    pub fn ddl(&self, table: &str, columns: &[ColumnMetadata]) -> ImportResult<String> {
        validate_table_name(table)?;
        Ok(create_table_sql(table, columns, self.exclusive))
    }

    /// 执行建表
    ///
    /// # 返回
    /// - Err(TableAlreadyExists): 独占模式下同名表已存在
    pub fn provision(
        &self,
        conn: &Connection,
        table: &str,
        columns: &[ColumnMetadata],
    ) -> ImportResult<()> {
        let sql = self.ddl(table, columns)?;
        debug!(table = %table, exclusive = self.exclusive, "执行建表 DDL");
        conn.execute_batch(&sql).map_err(|e| match ImportError::from(e) {
            ImportError::TableAlreadyExists(_) => ImportError::TableAlreadyExists(table.to_string()),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::InferredType;

    fn columns() -> Vec<ColumnMetadata> {
        vec![
            ColumnMetadata::new("Industry", "Industry", 1, InferredType::String),
            ColumnMetadata::new("Qty", "Qty", 2, InferredType::Integer),
            ColumnMetadata::new("Price", "Price", 3, InferredType::Decimal),
            ColumnMetadata::new("When", "When", 4, InferredType::DateTime),
        ]
    }

    fn table_count(conn: &Connection, name: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("Upload_abc_20240101000000").is_ok());
        assert!(matches!(
            validate_table_name(""),
            Err(ImportError::InvalidTableName(_))
        ));
        assert!(validate_table_name("drop table;").is_err());
        assert!(validate_table_name("材料").is_err());
        assert!(validate_table_name(&"a".repeat(129)).is_err());
        assert!(validate_table_name(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn test_ddl_shape() {
        let sql = create_table_sql("T1", &columns(), false);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"T1\""));
        assert!(sql.contains("\"Id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("\"Qty\" INT NULL"));
        assert!(sql.contains("\"Price\" NUMERIC(18,2) NULL"));
        assert!(sql.contains("\"When\" TIMESTAMP NULL"));

        let exclusive = create_table_sql("T1", &columns(), true);
        assert!(exclusive.starts_with("CREATE TABLE \"T1\""));
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_provision_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let provisioner = TableProvisioner::default();
        provisioner.provision(&conn, "T1", &columns()).unwrap();
        provisioner.provision(&conn, "T1", &columns()).unwrap();
        assert_eq!(table_count(&conn, "T1"), 1);
    }

    #[test]
    fn test_exclusive_provision_rejects_existing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let provisioner = TableProvisioner::new(true);
        provisioner.provision(&conn, "T1", &columns()).unwrap();
        let err = provisioner.provision(&conn, "T1", &columns()).unwrap_err();
        assert!(matches!(err, ImportError::TableAlreadyExists(name) if name == "T1"));
    }
}
