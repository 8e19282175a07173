// ==========================================
// 表格导入系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xls/.xlsb/.ods) / CSV (.csv)
// 只读取第一个工作表
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::worksheet::{CellValue, Worksheet};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;

// ==========================================
// SheetFormat - 按扩展名识别的文件格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Excel,
    Csv,
}

impl SheetFormat {
    /// 根据文件名扩展名识别格式（大小写不敏感）
    pub fn from_file_name(file_name: &str) -> ImportResult<Self> {
        let ext = Path::new(file_name.trim())
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SheetFormat::Excel),
            "csv" => Ok(SheetFormat::Csv),
            _ => Err(ImportError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

// ==========================================
// ReaderOptions - 解析参数（显式传入，无进程级全局状态）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    pub trim_text: bool,   // 文本单元格去首尾空白
    pub csv_delimiter: u8, // CSV 分隔符
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            trim_text: true,
            csv_delimiter: b',',
        }
    }
}

// ==========================================
// SheetParser Trait
// ==========================================
// 用途: 把文件解析为内存工作表
// 实现者: ExcelParser, CsvParser
pub trait SheetParser: Send + Sync {
    /// 从磁盘文件解析
    fn parse_path(&self, path: &Path) -> ImportResult<Worksheet>;

    /// 从内存字节解析
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Worksheet>;
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser {
    options: ReaderOptions,
}

impl ExcelParser {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options }
    }

    fn first_sheet<RS: Read + Seek>(&self, workbook: &mut Sheets<RS>) -> ImportResult<Worksheet> {
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names.first().cloned().ok_or(ImportError::NoWorksheet)?;

        let range = workbook.worksheet_range(&sheet_name)?;
        debug!(sheet = %sheet_name, size = ?range.get_size(), "读取第一个工作表");

        Ok(self.range_to_worksheet(sheet_name, &range))
    }

    /// calamine 的 Range 从第一个非空单元格开始，这里还原为绝对坐标
    fn range_to_worksheet(&self, name: String, range: &Range<Data>) -> Worksheet {
        let mut sheet = Worksheet::new(name);
        let (start_row, start_col) = match range.start() {
            Some((r, c)) => (r as usize, c as usize),
            None => return sheet,
        };

        for (r, row) in range.rows().enumerate() {
            for (c, data) in row.iter().enumerate() {
                let cell = cell_from_data(data, self.options.trim_text);
                if !cell.is_empty() {
                    sheet.set(start_row + r + 1, start_col + c + 1, cell);
                }
            }
        }
        sheet
    }
}

impl SheetParser for ExcelParser {
    fn parse_path(&self, path: &Path) -> ImportResult<Worksheet> {
        let mut workbook = open_workbook_auto(path)?;
        self.first_sheet(&mut workbook)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Worksheet> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        self.first_sheet(&mut workbook)
    }
}

/// calamine 单元格 → CellValue
fn cell_from_data(data: &Data, trim_text: bool) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(v) => CellValue::Int(*v),
        Data::Float(v) => CellValue::Float(*v),
        Data::Bool(v) => CellValue::Bool(*v),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::DateTime(value),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_iso_datetime(s) {
            Some(value) => CellValue::DateTime(value),
            None => text_cell(s, trim_text),
        },
        Data::DurationIso(s) => text_cell(s, trim_text),
        Data::String(s) => text_cell(s, trim_text),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}

fn parse_iso_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn text_cell(raw: &str, trim_text: bool) -> CellValue {
    let value = if trim_text { raw.trim() } else { raw };
    if value.is_empty() {
        CellValue::Empty
    } else {
        CellValue::String(value.to_string())
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser {
    options: ReaderOptions,
}

impl CsvParser {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options }
    }

    fn read_records<R: Read>(&self, name: &str, source: R) -> ImportResult<Worksheet> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头行由游标按行号处理
            .flexible(true) // 允许行长度不一致
            .delimiter(self.options.csv_delimiter)
            .from_reader(source);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<CellValue> = record
                .iter()
                .map(|field| parse_csv_field(field, self.options.trim_text))
                .collect();
            rows.push(row);
        }

        Ok(Worksheet::from_rows(name, rows))
    }
}

impl SheetParser for CsvParser {
    fn parse_path(&self, path: &Path) -> ImportResult<Worksheet> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Sheet1")
            .to_string();
        let file = std::fs::File::open(path)
            .map_err(|e| ImportError::CsvParseError(format!("{}: {}", path.display(), e)))?;
        self.read_records(&name, file)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Worksheet> {
        self.read_records("Sheet1", bytes)
    }
}

/// CSV 字段是纯文本，这里还原出表格软件会给出的原生类型
pub fn parse_csv_field(raw: &str, trim_text: bool) -> CellValue {
    let value = if trim_text { raw.trim() } else { raw };
    if value.trim().is_empty() {
        return CellValue::Empty;
    }
    let trimmed = value.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return CellValue::Int(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        if v.is_finite() {
            return CellValue::Float(v);
        }
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return CellValue::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return CellValue::Bool(false);
    }
    CellValue::String(value.to_string())
}

// ==========================================
// WorkbookReader - 通用入口（根据扩展名自动选择）
// ==========================================
pub struct WorkbookReader {
    options: ReaderOptions,
}

impl WorkbookReader {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options }
    }

    fn parser_for(&self, format: SheetFormat) -> Box<dyn SheetParser> {
        match format {
            SheetFormat::Excel => Box::new(ExcelParser::new(self.options)),
            SheetFormat::Csv => Box::new(CsvParser::new(self.options)),
        }
    }

    /// 读取磁盘文件的第一个工作表
    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> ImportResult<Worksheet> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let format = SheetFormat::from_file_name(file_name)?;
        self.parser_for(format).parse_path(path)
    }

    /// 读取内存中的文件内容（file_name 仅用于识别格式）
    pub fn read_bytes(&self, file_name: &str, bytes: &[u8]) -> ImportResult<Worksheet> {
        let format = SheetFormat::from_file_name(file_name)?;
        self.parser_for(format).parse_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_sheet_format_from_file_name() {
        assert_eq!(
            SheetFormat::from_file_name("Sales.XLSX").unwrap(),
            SheetFormat::Excel
        );
        assert_eq!(
            SheetFormat::from_file_name("data.csv").unwrap(),
            SheetFormat::Csv
        );
        assert!(matches!(
            SheetFormat::from_file_name("notes.txt"),
            Err(ImportError::UnsupportedFormat(_))
        ));
        assert!(SheetFormat::from_file_name("no_extension").is_err());
    }

    #[test]
    fn test_parse_csv_field_types() {
        assert_eq!(parse_csv_field("42", true), CellValue::Int(42));
        assert_eq!(parse_csv_field(" 4.5 ", true), CellValue::Float(4.5));
        assert_eq!(parse_csv_field("TRUE", true), CellValue::Bool(true));
        assert_eq!(parse_csv_field("   ", true), CellValue::Empty);
        assert_eq!(
            parse_csv_field(" abc ", true),
            CellValue::String("abc".to_string())
        );
        assert_eq!(
            parse_csv_field("NaN", true),
            CellValue::String("NaN".to_string())
        );
    }

    #[test]
    fn test_csv_parser_reads_file_with_positions() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "Name,Qty,Price").unwrap();
        writeln!(temp_file, "bolt,10,1.25").unwrap();
        writeln!(temp_file, ",,").unwrap();
        writeln!(temp_file, "nut,5,0.5").unwrap();

        let reader = WorkbookReader::new(ReaderOptions::default());
        let sheet = reader.read_path(temp_file.path()).unwrap();

        assert_eq!(sheet.get(1, 1), &CellValue::String("Name".to_string()));
        assert_eq!(sheet.get(2, 2), &CellValue::Int(10));
        assert_eq!(sheet.get(2, 3), &CellValue::Float(1.25));
        assert!(sheet.get(3, 1).is_empty());
        assert_eq!(sheet.dimension().map(|d| (d.end_row, d.end_col)), Some((4, 3)));
    }

    #[test]
    fn test_read_bytes_csv_and_rejects_unknown_extension() {
        let reader = WorkbookReader::new(ReaderOptions::default());
        let sheet = reader.read_bytes("upload.csv", b"A;B\n1;2\n").unwrap();
        // 默认分隔符为逗号，整行落入第一列
        assert_eq!(sheet.get(1, 1), &CellValue::String("A;B".to_string()));

        let semicolon = WorkbookReader::new(ReaderOptions {
            csv_delimiter: b';',
            ..ReaderOptions::default()
        });
        let sheet = semicolon.read_bytes("upload.csv", b"A;B\n1;2\n").unwrap();
        assert_eq!(sheet.get(2, 2), &CellValue::Int(2));

        assert!(reader.read_bytes("upload.pdf", b"%PDF").is_err());
    }

    #[test]
    fn test_excel_parser_keeps_absolute_positions_and_cell_kinds() {
        // 表头在 B2，A 列与第 1 行为空
        let bytes = include_bytes!("../../tests/fixtures/sales_offset.xlsx");
        let reader = WorkbookReader::new(ReaderOptions::default());
        let sheet = reader.read_bytes("sales_offset.xlsx", bytes).unwrap();

        assert_eq!(sheet.name(), "Sales");
        assert!(sheet.get(1, 2).is_empty());
        assert!(sheet.get(2, 1).is_empty());
        assert_eq!(sheet.get(2, 2), &CellValue::String("Code".to_string()));
        assert_eq!(sheet.get(3, 3), &CellValue::Float(5.0));
        assert_eq!(sheet.get(4, 4), &CellValue::Float(2.5));
        assert_eq!(
            sheet.get(3, 5),
            &CellValue::DateTime(
                chrono::NaiveDate::from_ymd_opt(2023, 3, 15)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            )
        );
        assert_eq!(sheet.get(4, 6), &CellValue::Bool(false));
        assert_eq!(sheet.dimension().map(|d| (d.end_row, d.end_col)), Some((5, 6)));
    }

    #[test]
    fn test_excel_parser_rejects_garbage_bytes() {
        let reader = WorkbookReader::new(ReaderOptions::default());
        let result = reader.read_bytes("broken.xlsx", b"definitely not a zip archive");
        assert!(matches!(result, Err(ImportError::ExcelParseError(_))));
    }
}
