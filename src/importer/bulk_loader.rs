// ==========================================
// 表格导入系统 - 批量落库
// ==========================================
// 流程: 建表 → 按批读取游标 → 每批一个事务提交
// 注意: 建表与落库不是一个工作单元；中途失败时
//       表与已提交批次保留
// ==========================================

use crate::domain::column::ColumnMetadata;
use crate::importer::coercion::FieldValue;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sheet_cursor::SheetCursor;
use crate::importer::table_provisioner::{quote_identifier, TableProvisioner};
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// 默认批大小
pub const DEFAULT_BATCH_SIZE: usize = 1000;
/// 默认落库超时（秒）
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 300;
/// SQLite busy_timeout 以 i32 毫秒表示，超出部分截断
pub const MAX_BUSY_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

/// 连接层 busy_timeout: 落库超时截断到 SQLite 可表示的上限
pub fn busy_timeout_for(timeout: Duration) -> Duration {
    timeout.min(MAX_BUSY_TIMEOUT)
}

// ==========================================
// LoaderOptions
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    pub batch_size: usize,
    pub timeout: Duration,
    pub exclusive_create: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
            exclusive_create: false,
        }
    }
}

// ==========================================
// LoadSummary - 单次落库统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub table: String,
    pub rows_loaded: usize,
    pub batches_committed: usize,
    pub elapsed_ms: u64,
}

/// 按列名映射的 INSERT 语句
pub fn insert_sql(table: &str, columns: &[ColumnMetadata]) -> String {
    let names: Vec<String> = columns
        .iter()
        .map(|c| quote_identifier(&c.unique_name))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

// ==========================================
// BulkLoader
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct BulkLoader {
    options: LoaderOptions,
}

impl BulkLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// 建表并将游标剩余行全部写入目标表
    ///
    /// # 参数
    /// - conn: 独占的数据库连接
    /// - table: 目标表名
    /// - cursor: 行游标（从当前位置继续读取）
    ///
    /// # 返回
    /// - Ok(LoadSummary): 写入行数、批次数、耗时
    /// - Err: 建表失败、转换失败（严格模式）、写入失败或超时；已提交批次不回滚
    pub fn load(
        &self,
        conn: &mut Connection,
        table: &str,
        cursor: &mut SheetCursor,
    ) -> ImportResult<LoadSummary> {
        let started = Instant::now();
        conn.busy_timeout(busy_timeout_for(self.options.timeout))
            .map_err(|e| ImportError::DatabaseConnectionError(e.to_string()))?;

        TableProvisioner::new(self.options.exclusive_create).provision(
            conn,
            table,
            cursor.columns(),
        )?;

        let sql = insert_sql(table, cursor.columns());
        let batch_size = self.options.batch_size.max(1);
        let mut batch: Vec<Vec<FieldValue>> = Vec::with_capacity(batch_size);
        let mut rows_loaded = 0usize;
        let mut batches_committed = 0usize;

        while cursor.advance() {
            batch.push(cursor.get_values()?);
            if batch.len() >= batch_size {
                self.check_elapsed(started, rows_loaded, batches_committed)?;
                rows_loaded += self.commit_batch(conn, &sql, &batch, rows_loaded)?;
                batches_committed += 1;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.check_elapsed(started, rows_loaded, batches_committed)?;
            rows_loaded += self.commit_batch(conn, &sql, &batch, rows_loaded)?;
            batches_committed += 1;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            table = %table,
            rows = rows_loaded,
            batches = batches_committed,
            elapsed_ms = elapsed_ms,
            "批量落库完成"
        );

        Ok(LoadSummary {
            table: table.to_string(),
            rows_loaded,
            batches_committed,
            elapsed_ms,
        })
    }

    // 批次之间检查总耗时；首批不检查
    fn check_elapsed(
        &self,
        started: Instant,
        rows_loaded: usize,
        batches_committed: usize,
    ) -> ImportResult<()> {
        if batches_committed == 0 {
            return Ok(());
        }
        let elapsed = started.elapsed();
        if elapsed > self.options.timeout {
            error!(
                elapsed_ms = elapsed.as_millis() as u64,
                rows_loaded = rows_loaded,
                "批量落库超时"
            );
            return Err(ImportError::LoadTimeout {
                elapsed_secs: elapsed.as_secs(),
                limit_secs: self.options.timeout.as_secs(),
                rows_loaded,
            });
        }
        Ok(())
    }

    fn commit_batch(
        &self,
        conn: &mut Connection,
        sql: &str,
        batch: &[Vec<FieldValue>],
        rows_before: usize,
    ) -> ImportResult<usize> {
        let tx = conn
            .transaction()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;
        {
            let mut stmt = tx.prepare_cached(sql)?;
            for row in batch {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        debug!(
            rows = batch.len(),
            total = rows_before + batch.len(),
            "批次已提交"
        );
        Ok(batch.len())
    }
}
