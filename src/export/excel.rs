//! Excel生成
//!
//! rust_xlsxwriter で results / failures / totals の3シートを作る。

use super::{kind_label, FAILURES_HEADERS, RESULTS_HEADERS};
use crate::error::{HinbanAiError, Result};
use crate::pipeline::TaskReport;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::Path;

const COLUMN_WIDTH: f64 = 18.0;

fn excel_err(e: XlsxError) -> HinbanAiError {
    HinbanAiError::Excel(e.to_string())
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA))
}

fn write_header(worksheet: &mut Worksheet, headers: &[&str], format: &Format) -> std::result::Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, format)?;
        worksheet.set_column_width(col as u16, COLUMN_WIDTH)?;
    }
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// 照合タスクの結果をExcelに出力
pub fn generate_excel(report: &TaskReport, output_path: &Path) -> Result<()> {
    let buffer = generate_excel_buffer(report).map_err(excel_err)?;
    std::fs::write(output_path, buffer)?;
    Ok(())
}

/// Excelをバッファに生成
pub fn generate_excel_buffer(report: &TaskReport) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = header_format();

    let sheet = workbook.add_worksheet();
    sheet.set_name("results")?;
    write_header(sheet, RESULTS_HEADERS, &header)?;
    for (i, record) in report.results.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, &record.source)?;
        sheet.write_number(row, 1, record.page as f64)?;
        sheet.write_string(row, 2, &record.token)?;
        sheet.write_string(row, 3, kind_label(record.kind))?;
        sheet.write_string(row, 4, record.matched_part_number.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 5, record.stock.as_deref().unwrap_or(""))?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name("failures")?;
    write_header(sheet, FAILURES_HEADERS, &header)?;
    for (i, record) in report.failures.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, &record.source)?;
        sheet.write_number(row, 1, record.page as f64)?;
        sheet.write_string(row, 2, &record.token)?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name("totals")?;
    write_header(sheet, &["item", "count"], &header)?;
    let totals = [
        ("pages", report.pages),
        ("tokens", report.totals.tokens),
        ("hit_hinban", report.totals.hit_part_number),
        ("hit_spec", report.totals.hit_spec),
        ("fail", report.totals.fail),
    ];
    for (i, (label, count)) in totals.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, *label)?;
        sheet.write_number(row, 1, *count as f64)?;
    }

    workbook.save_to_buffer()
}
