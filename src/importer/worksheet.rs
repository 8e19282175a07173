// ==========================================
// 表格导入系统 - 内存工作表
// ==========================================
// 坐标: 行/列均从 1 开始（与表格软件一致）
// 用途: 解析结果的可变载体，支持整列插入以注入三级名称
// ==========================================

use chrono::NaiveDateTime;
use std::fmt;

/// 日期时间文本格式（写库与原文回退共用）
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// CellValue - 单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    String(String),
    Error(String), // #DIV/0! 等公式错误
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Bool(v) => write!(f, "{}", v),
            CellValue::DateTime(v) => write!(f, "{}", v.format(DATETIME_FORMAT)),
            CellValue::String(v) => f.write_str(v),
            CellValue::Error(v) => f.write_str(v),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

// ==========================================
// Dimension - 已填充区域的右下角
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub end_row: usize,
    pub end_col: usize,
}

// ==========================================
// Worksheet - 工作表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    cells: Vec<Vec<CellValue>>, // 内部 0-based 存储
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: Vec::new(),
        }
    }

    /// 由行数据构造（第一行即第 1 行）
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            cells: rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 读取单元格；越界返回空单元格
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        if row == 0 || col == 0 {
            return &EMPTY_CELL;
        }
        self.cells
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .unwrap_or(&EMPTY_CELL)
    }

    /// 写入单元格；按需扩展
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if row == 0 || col == 0 {
            return;
        }
        if self.cells.len() < row {
            self.cells.resize_with(row, Vec::new);
        }
        let cells = &mut self.cells[row - 1];
        if cells.len() < col {
            cells.resize(col, CellValue::Empty);
        }
        cells[col - 1] = value;
    }

    /// 已填充区域；无任何非空单元格时为 None
    pub fn dimension(&self) -> Option<Dimension> {
        let mut end_row = 0;
        let mut end_col = 0;
        for (r, cells) in self.cells.iter().enumerate() {
            if let Some(c) = cells.iter().rposition(|cell| !cell.is_empty()) {
                end_row = r + 1;
                end_col = end_col.max(c + 1);
            }
        }
        if end_row == 0 {
            None
        } else {
            Some(Dimension { end_row, end_col })
        }
    }

    /// 在第 `at` 列前插入 `count` 个空列（所有行右移）
    pub fn insert_columns(&mut self, at: usize, count: usize) {
        if at == 0 || count == 0 {
            return;
        }
        for cells in self.cells.iter_mut() {
            if cells.len() < at - 1 {
                // 该行在插入点左侧没有数据，右移无影响
                continue;
            }
            let tail = cells.split_off(at - 1);
            cells.extend(std::iter::repeat(CellValue::Empty).take(count));
            cells.extend(tail);
        }
    }
}
