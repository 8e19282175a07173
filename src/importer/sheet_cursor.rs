// ==========================================
// 表格导入系统 - 工作表行游标
// ==========================================
// 职责: 将工作表暴露为只进的行读取器，供批量落库逐行取值
// 构造: 表头行 → 列元数据（清洗去重 + 类型推断）
// 读取: 按序号取值，非空单元格按推断类型转换
// 红线: 只进，不可回退
// ==========================================

use crate::domain::column::{ColumnMetadata, ColumnSchemaRow};
use crate::domain::types::{CoercionPolicy, InferredType};
use crate::importer::coercion::{coerce_cell, FieldValue};
use crate::importer::column_namer::ColumnNamer;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::table_provisioner::SURROGATE_KEY_COLUMN;
use crate::importer::type_inference::TypeInferenceEngine;
use crate::importer::worksheet::Worksheet;
use std::collections::HashMap;
use tracing::{debug, warn};

// ==========================================
// SheetCursor
// ==========================================
pub struct SheetCursor {
    sheet: Worksheet,
    header_row: usize,
    last_row: usize,
    columns: Vec<ColumnMetadata>,
    ordinals: HashMap<String, usize>, // 列名 → 游标序号
    policy: CoercionPolicy,
    current_row: Option<usize>,
    exhausted: bool,
}

impl SheetCursor {
    /// 构造游标
    ///
    /// # 参数
    /// - sheet: 已加载的工作表（游标接管所有权）
    /// - header_row: 表头行号（从 1 开始）
    /// - detect_types: false 时所有列按 String 处理
    /// - engine: 类型推断引擎
    /// - policy: 单元格转换失败策略
    ///
    /// # 返回
    /// - Err(EmptySheet): 工作表无已填充区域或表头行超出区域
    pub fn new(
        sheet: Worksheet,
        header_row: usize,
        detect_types: bool,
        engine: &TypeInferenceEngine,
        policy: CoercionPolicy,
    ) -> ImportResult<Self> {
        if header_row == 0 {
            return Err(ImportError::InternalError(
                "表头行号必须从 1 开始".to_string(),
            ));
        }

        let dimension = sheet
            .dimension()
            .filter(|d| d.end_row >= header_row)
            .ok_or_else(|| ImportError::EmptySheet(sheet.name().to_string()))?;

        let first_data_row = header_row + 1;
        // 代理主键列名由建表占用
        let mut namer = ColumnNamer::reserving(&[SURROGATE_KEY_COLUMN]);
        let mut columns = Vec::with_capacity(dimension.end_col);
        let mut ordinals = HashMap::with_capacity(dimension.end_col);

        for col in 1..=dimension.end_col {
            let original = sheet.get(header_row, col).to_string();
            let unique = namer.assign(&original, col);
            let inferred = if detect_types {
                engine.infer_sheet_column(&sheet, col, first_data_row, dimension.end_row)
            } else {
                InferredType::String
            };
            ordinals.insert(unique.clone(), columns.len());
            columns.push(ColumnMetadata::new(original, unique, col, inferred));
        }

        debug!(
            sheet = %sheet.name(),
            columns = columns.len(),
            data_rows = dimension.end_row.saturating_sub(header_row),
            "游标构造完成"
        );

        Ok(Self {
            sheet,
            header_row,
            last_row: dimension.end_row,
            columns,
            ordinals,
            policy,
            current_row: None,
            exhausted: false,
        })
    }

    // ===== 结构信息 =====

    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    /// 数据行数（不含表头）
    pub fn data_row_count(&self) -> usize {
        self.last_row.saturating_sub(self.header_row)
    }

    /// 当前行号（工作表行号）；未开始或已结束时为 None
    pub fn current_row(&self) -> Option<usize> {
        self.current_row
    }

    pub fn get_name(&self, ordinal: usize) -> ImportResult<&str> {
        Ok(&self.column(ordinal)?.unique_name)
    }

    pub fn get_field_type(&self, ordinal: usize) -> ImportResult<InferredType> {
        Ok(self.column(ordinal)?.inferred_type)
    }

    /// 列名 → 序号
    pub fn get_ordinal(&self, name: &str) -> ImportResult<usize> {
        self.ordinals
            .get(name)
            .copied()
            .ok_or_else(|| ImportError::ColumnNotFound(name.to_string()))
    }

    /// 诊断用 schema 视图
    pub fn schema_rows(&self) -> Vec<ColumnSchemaRow> {
        self.columns
            .iter()
            .enumerate()
            .map(|(ordinal, c)| ColumnSchemaRow {
                column_name: c.unique_name.clone(),
                original_name: c.original_name.clone(),
                ordinal,
                column_number: c.source_ordinal,
                inferred_type: c.inferred_type,
                destination_type: c.destination_type,
            })
            .collect()
    }

    // ===== 行移动 =====

    /// 移到下一数据行；越过最后一行返回 false
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        let next = self.current_row.map_or(self.header_row + 1, |r| r + 1);
        if next > self.last_row {
            self.exhausted = true;
            self.current_row = None;
            return false;
        }
        self.current_row = Some(next);
        true
    }

    // ===== 取值 =====

    pub fn is_null(&self, ordinal: usize) -> ImportResult<bool> {
        let column = self.column(ordinal)?;
        let row = self.require_row()?;
        Ok(self.sheet.get(row, column.source_ordinal).is_empty())
    }

    /// 按序号取当前行的字段值
    pub fn get_value(&self, ordinal: usize) -> ImportResult<FieldValue> {
        let column = self.column(ordinal)?;
        let row = self.require_row()?;
        let cell = self.sheet.get(row, column.source_ordinal);

        if let Some(value) = coerce_cell(cell, column.inferred_type) {
            return Ok(value);
        }

        match self.policy {
            CoercionPolicy::Lenient => {
                warn!(
                    row = row,
                    column = %column.unique_name,
                    target = %column.inferred_type,
                    raw = %cell,
                    "单元格转换失败，回退为原文"
                );
                Ok(FieldValue::Text(cell.to_string()))
            }
            CoercionPolicy::Strict => Err(ImportError::CellCoercion {
                row,
                column: column.unique_name.clone(),
                target: column.inferred_type,
                raw: cell.to_string(),
            }),
        }
    }

    /// 当前行全部字段值（按序号顺序）
    pub fn get_values(&self) -> ImportResult<Vec<FieldValue>> {
        (0..self.columns.len()).map(|i| self.get_value(i)).collect()
    }

    fn column(&self, ordinal: usize) -> ImportResult<&ColumnMetadata> {
        self.columns
            .get(ordinal)
            .ok_or(ImportError::OrdinalOutOfRange {
                ordinal,
                field_count: self.columns.len(),
            })
    }

    fn require_row(&self) -> ImportResult<usize> {
        self.current_row.ok_or(ImportError::NoCurrentRow)
    }
}
