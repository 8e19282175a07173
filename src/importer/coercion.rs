// ==========================================
// 表格导入系统 - 单元格类型转换
// ==========================================
// 每个推断类型对应一个转换函数，经 coercer_for 单次查表选出
// 转换失败返回 None，由游标按 CoercionPolicy 决定回退原文或报错
// ==========================================

use crate::domain::types::InferredType;
use crate::importer::type_inference::looks_like_serial_date;
use crate::importer::worksheet::{CellValue, DATETIME_FORMAT};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// NUMERIC(18,2) 的小数位
pub const DECIMAL_SCALE: u32 = 2;

// ==========================================
// FieldValue - 游标读出的字段值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i32),
    Decimal(Decimal),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Guid(Uuid),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Decimal(v) => write!(f, "{}", v),
            FieldValue::Boolean(v) => write!(f, "{}", v),
            FieldValue::DateTime(v) => write!(f, "{}", v.format(DATETIME_FORMAT)),
            FieldValue::Guid(v) => write!(f, "{}", v.hyphenated()),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

// 直接作为 SQLite 参数绑定
impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let output = match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            FieldValue::Decimal(v) => ToSqlOutput::Owned(Value::Text(v.to_string())),
            FieldValue::Boolean(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            FieldValue::DateTime(v) => {
                ToSqlOutput::Owned(Value::Text(v.format(DATETIME_FORMAT).to_string()))
            }
            FieldValue::Guid(v) => ToSqlOutput::Owned(Value::Text(v.hyphenated().to_string())),
            FieldValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
        };
        Ok(output)
    }
}

// ==========================================
// 转换函数表
// ==========================================

/// 转换函数签名: 非空单元格 → 目标类型值；失败返回 None
pub type CoerceFn = fn(&CellValue) -> Option<FieldValue>;

/// 推断类型 → 转换函数
pub fn coercer_for(target: InferredType) -> CoerceFn {
    match target {
        InferredType::Integer => to_integer,
        InferredType::Decimal => to_decimal,
        InferredType::Boolean => to_boolean,
        InferredType::DateTime => to_datetime,
        InferredType::Guid => to_guid,
        InferredType::String => to_text,
    }
}

/// 转换单元格；空单元格恒为 Null
pub fn coerce_cell(cell: &CellValue, target: InferredType) -> Option<FieldValue> {
    if cell.is_empty() {
        return Some(FieldValue::Null);
    }
    coercer_for(target)(cell)
}

fn to_integer(cell: &CellValue) -> Option<FieldValue> {
    let value = match cell {
        CellValue::Int(v) => i32::try_from(*v).ok()?,
        CellValue::Float(v) if v.fract() == 0.0 => float_to_i32(*v)?,
        CellValue::Bool(v) => i32::from(*v),
        CellValue::String(s) => s.trim().parse::<i32>().ok()?,
        _ => return None,
    };
    Some(FieldValue::Integer(value))
}

fn float_to_i32(value: f64) -> Option<i32> {
    if value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Some(value as i32)
    } else {
        None
    }
}

fn to_decimal(cell: &CellValue) -> Option<FieldValue> {
    let value = match cell {
        CellValue::Int(v) => Decimal::from(*v),
        CellValue::Float(v) => Decimal::try_from(*v).ok()?,
        CellValue::String(s) => {
            let trimmed = s.trim();
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .ok()?
        }
        _ => return None,
    };
    Some(FieldValue::Decimal(value.round_dp(DECIMAL_SCALE)))
}

fn to_boolean(cell: &CellValue) -> Option<FieldValue> {
    let value = match cell {
        CellValue::Bool(v) => *v,
        CellValue::Int(v) => *v != 0,
        CellValue::Float(v) => *v != 0.0,
        CellValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.eq_ignore_ascii_case("true") {
                true
            } else if trimmed.eq_ignore_ascii_case("false") {
                false
            } else {
                return None;
            }
        }
        _ => return None,
    };
    Some(FieldValue::Boolean(value))
}

fn to_datetime(cell: &CellValue) -> Option<FieldValue> {
    let value = match cell {
        CellValue::DateTime(v) => *v,
        CellValue::Float(v) if looks_like_serial_date(*v) => serial_to_datetime(*v)?,
        CellValue::Int(v) if looks_like_serial_date(*v as f64) => serial_to_datetime(*v as f64)?,
        CellValue::String(s) => parse_datetime_text(s.trim())?,
        _ => return None,
    };
    Some(FieldValue::DateTime(value))
}

fn to_guid(cell: &CellValue) -> Option<FieldValue> {
    match cell {
        CellValue::String(s) => Uuid::parse_str(s.trim()).ok().map(FieldValue::Guid),
        _ => None,
    }
}

fn to_text(cell: &CellValue) -> Option<FieldValue> {
    Some(FieldValue::Text(cell.to_string()))
}

/// 序列日期（1899-12-30 起的天数，小数部分为一天内时间）→ 日期时间
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

const DATETIME_TEXT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_TEXT_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

fn parse_datetime_text(raw: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_TEXT_FORMATS {
        if let Ok(v) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(v);
        }
    }
    for format in DATE_TEXT_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
