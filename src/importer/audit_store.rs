// ==========================================
// 表格导入系统 - 上传文件审计副本
// ==========================================
// 文件名: <ticks>_<原文件名（空格替换为下划线）>
// ticks: 自 0001-01-01 起的 100 纳秒计数，保证同目录内按时间排序
// 副本在解析前落盘；后续任一步失败时删除
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// 0001-01-01 到 1970-01-01 的 ticks 数
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// 当前时间的 ticks
pub fn current_ticks() -> i64 {
    let now = Utc::now();
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1_000);
    UNIX_EPOCH_TICKS + nanos / 100
}

/// 审计副本文件名中的原文件名部分
pub fn sanitize_file_name(original: &str) -> String {
    // 只保留最后一段，丢弃客户端带来的目录
    let base = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(original);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

// ==========================================
// AuditFileStore
// ==========================================
#[derive(Debug, Clone)]
pub struct AuditFileStore {
    dir: PathBuf,
}

impl AuditFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 写入审计副本，返回副本路径
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> ImportResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ImportError::AuditWriteError(format!("{}: {}", self.dir.display(), e))
        })?;

        let file_name = format!("{}_{}", current_ticks(), sanitize_file_name(original_name));
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ImportError::AuditWriteError(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), bytes = bytes.len(), "审计副本已写入");
        Ok(path)
    }

    /// 删除审计副本；失败只记录警告
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "审计副本已删除"),
            Err(e) => warn!(path = %path.display(), error = %e, "审计副本删除失败"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("My Sales Q1.xlsx"), "My_Sales_Q1.xlsx");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("a:b?.csv"), "ab.csv");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[test]
    fn test_ticks_are_after_unix_epoch() {
        assert!(current_ticks() > UNIX_EPOCH_TICKS);
    }

    #[tokio::test]
    async fn test_save_and_discard() {
        let dir = TempDir::new().unwrap();
        let store = AuditFileStore::new(dir.path().join("UploadedFiles"));

        let path = store.save("data file.csv", b"a,b\n1,2\n").await.unwrap();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.ends_with("_data_file.csv"));
        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n1,2\n");

        store.discard(&path).await;
        assert!(!path.exists());

        // 重复删除不报错
        store.discard(&path).await;
    }
}
