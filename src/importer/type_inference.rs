// ==========================================
// 表格导入系统 - 列类型推断
// ==========================================
// 规则:
// - 取前 N 行（默认 100）非空值逐个分类并计数
// - 占比最高的类型达到阈值（默认 80%）才采用，否则退回 String
// - 无样本 → String
// 序列日期启发式: 浮点数落在 [20000, 60000) 视为日期
// ==========================================

use crate::domain::types::InferredType;
use crate::importer::worksheet::{CellValue, Worksheet};
use uuid::Uuid;

/// 序列日期窗口下界（含）
pub const SERIAL_DATE_MIN: f64 = 20_000.0;
/// 序列日期窗口上界（不含）
pub const SERIAL_DATE_MAX: f64 = 60_000.0;

/// 默认采样行数
pub const DEFAULT_SAMPLE_ROWS: usize = 100;
/// 默认主导类型占比阈值
pub const DEFAULT_DOMINANCE_RATIO: f64 = 0.8;

/// 浮点数是否落在序列日期窗口内
pub fn looks_like_serial_date(value: f64) -> bool {
    (SERIAL_DATE_MIN..SERIAL_DATE_MAX).contains(&value)
}

/// 单个样本值分类；空单元格返回 None
pub fn classify_cell(cell: &CellValue) -> Option<InferredType> {
    let detected = match cell {
        CellValue::Empty => return None,
        CellValue::DateTime(_) => InferredType::DateTime,
        CellValue::Float(v) if looks_like_serial_date(*v) => InferredType::DateTime,
        CellValue::Float(_) => InferredType::Decimal,
        CellValue::Int(_) => InferredType::Integer,
        CellValue::Bool(_) => InferredType::Boolean,
        CellValue::String(s) if is_hyphenated_uuid(s) => InferredType::Guid,
        CellValue::String(_) | CellValue::Error(_) => InferredType::String,
    };
    Some(detected)
}

fn is_hyphenated_uuid(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.len() == 36 && Uuid::parse_str(trimmed).is_ok()
}

// ==========================================
// InferenceOptions - 推断参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceOptions {
    pub sample_rows: usize,
    pub dominance_ratio: f64,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            sample_rows: DEFAULT_SAMPLE_ROWS,
            dominance_ratio: DEFAULT_DOMINANCE_RATIO,
        }
    }
}

// ==========================================
// TypeInferenceEngine
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct TypeInferenceEngine {
    options: InferenceOptions,
}

impl TypeInferenceEngine {
    pub fn new(options: InferenceOptions) -> Self {
        Self { options }
    }

    /// 根据样本值推断列类型
    ///
    /// 调用方负责截取采样行；空值不计入分母
    pub fn infer<'a, I>(&self, samples: I) -> InferredType
    where
        I: IntoIterator<Item = &'a CellValue>,
    {
        // 按首次出现顺序计数，保证平票时结果确定
        let mut tally: Vec<(InferredType, usize)> = Vec::new();
        let mut total = 0usize;

        for cell in samples {
            let Some(detected) = classify_cell(cell) else {
                continue;
            };
            total += 1;
            match tally.iter_mut().find(|(t, _)| *t == detected) {
                Some((_, count)) => *count += 1,
                None => tally.push((detected, 1)),
            }
        }

        if total == 0 {
            return InferredType::String;
        }

        let mut dominant = tally[0];
        for entry in tally.iter().skip(1) {
            if entry.1 > dominant.1 {
                dominant = *entry;
            }
        }

        let share = dominant.1 as f64 / total as f64;
        if share + f64::EPSILON < self.options.dominance_ratio {
            return InferredType::String;
        }

        dominant.0
    }

    /// 对工作表某一列采样推断
    ///
    /// # 参数
    /// - first_data_row: 第一行数据行号（表头下一行）
    /// - last_row: 最后一个已填充行号
    pub fn infer_sheet_column(
        &self,
        sheet: &Worksheet,
        column: usize,
        first_data_row: usize,
        last_row: usize,
    ) -> InferredType {
        if first_data_row > last_row {
            return InferredType::String;
        }
        // sample_rows 为 0 时按 1 行处理；大值不溢出
        let span = self.options.sample_rows.max(1) - 1;
        let sample_end = last_row.min(first_data_row.saturating_add(span));
        self.infer((first_data_row..=sample_end).map(|row| sheet.get(row, column)))
    }
}
