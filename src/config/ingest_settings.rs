// ==========================================
// 表格导入系统 - 导入参数
// ==========================================
// 默认值即参考行为；config_kv 中的同名键可覆写
// ==========================================

use crate::domain::types::CoercionPolicy;
use crate::importer::bulk_loader::{LoaderOptions, DEFAULT_BATCH_SIZE, DEFAULT_LOAD_TIMEOUT_SECS};
use crate::importer::type_inference::{
    InferenceOptions, DEFAULT_DOMINANCE_RATIO, DEFAULT_SAMPLE_ROWS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 默认审计副本目录
pub const DEFAULT_UPLOAD_DIR: &str = "UploadedFiles";
/// 默认表头行
pub const DEFAULT_HEADER_ROW: usize = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestSettings {
    pub upload_dir: PathBuf,
    pub header_row: usize,
    pub sample_rows: usize,
    pub dominance_ratio: f64,
    pub batch_size: usize,
    pub load_timeout_secs: u64,
    pub coercion_policy: CoercionPolicy,
    pub exclusive_create: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            header_row: DEFAULT_HEADER_ROW,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            dominance_ratio: DEFAULT_DOMINANCE_RATIO,
            batch_size: DEFAULT_BATCH_SIZE,
            load_timeout_secs: DEFAULT_LOAD_TIMEOUT_SECS,
            coercion_policy: CoercionPolicy::Lenient,
            exclusive_create: false,
        }
    }
}

impl IngestSettings {
    pub fn inference_options(&self) -> InferenceOptions {
        InferenceOptions {
            sample_rows: self.sample_rows,
            dominance_ratio: self.dominance_ratio,
        }
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            batch_size: self.batch_size,
            timeout: Duration::from_secs(self.load_timeout_secs),
            exclusive_create: self.exclusive_create,
        }
    }
}
