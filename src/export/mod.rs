//! 結果出力
//!
//! - results.csv / failure.csv（照合タスク）
//! - logs/extract_*.csv / logs/match_*.csv（セマンティック照合）
//! - Excelブック（results / failures / totals シート）

pub mod excel;

use crate::cli::ExportFormat;
use crate::error::Result;
use crate::pipeline::TaskReport;
use hinban_ai_common::{ExtractionMethod, MatchKind, MatchRecord, SemanticExtraction, SemanticMatchResult};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const RESULTS_FILE_NAME: &str = "results.csv";
pub const FAILURES_FILE_NAME: &str = "failure.csv";
pub const EXCEL_FILE_NAME: &str = "results.xlsx";

pub const RESULTS_HEADERS: &[&str] = &["pdf_name", "page", "token", "matched_type", "matched_hinban", "zaiku"];
pub const FAILURES_HEADERS: &[&str] = &["pdf_name", "page", "token"];
pub const EXTRACT_LOG_HEADERS: &[&str] = &["hinban", "normalized"];
pub const MATCH_LOG_HEADERS: &[&str] = &[
    "input_hinban",
    "normalized",
    "match_status",
    "score",
    "matched_hinban",
    "zaiku",
    "method",
];

const UTF8_BOM: &str = "\u{feff}";

/// ログファイル名用のタイムスタンプ
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// CSV用の種別表記
pub fn kind_label(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::PartNumber => "hinban",
        MatchKind::Spec => "spec",
        MatchKind::None => "none",
    }
}

/// RFC 4180 に従ってフィールドをクォート
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// CSVを書き出す（行区切りはCRLF）
pub fn write_csv<I>(path: &Path, headers: &[&str], rows: I, with_bom: bool) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    if with_bom {
        out.write_all(UTF8_BOM.as_bytes())?;
    }

    let header_line: Vec<String> = headers.iter().map(|h| csv_field(h)).collect();
    write!(out, "{}\r\n", header_line.join(","))?;
    for row in rows {
        let line: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        write!(out, "{}\r\n", line.join(","))?;
    }
    out.flush()?;
    Ok(())
}

fn result_row(record: &MatchRecord) -> Vec<String> {
    vec![
        record.source.clone(),
        record.page.to_string(),
        record.token.clone(),
        kind_label(record.kind).to_string(),
        record.matched_part_number.clone().unwrap_or_default(),
        record.stock.clone().unwrap_or_default(),
    ]
}

fn failure_row(record: &MatchRecord) -> Vec<String> {
    vec![record.source.clone(), record.page.to_string(), record.token.clone()]
}

pub fn write_results_csv(path: &Path, records: &[MatchRecord]) -> Result<()> {
    write_csv(path, RESULTS_HEADERS, records.iter().map(result_row), false)
}

pub fn write_failures_csv(path: &Path, records: &[MatchRecord]) -> Result<()> {
    write_csv(path, FAILURES_HEADERS, records.iter().map(failure_row), false)
}

/// 照合タスクの結果を出力し、書き出したファイルを返す
pub fn export_report(report: &TaskReport, format: &ExportFormat, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    if matches!(format, ExportFormat::Csv | ExportFormat::Both) {
        let results_path = output_dir.join(RESULTS_FILE_NAME);
        write_results_csv(&results_path, &report.results)?;
        written.push(results_path);

        let failures_path = output_dir.join(FAILURES_FILE_NAME);
        write_failures_csv(&failures_path, &report.failures)?;
        written.push(failures_path);
    }

    if matches!(format, ExportFormat::Excel | ExportFormat::Both) {
        let excel_path = output_dir.join(EXCEL_FILE_NAME);
        excel::generate_excel(report, &excel_path)?;
        written.push(excel_path);
    }

    Ok(written)
}

/// 抽出ログ `extract_{method}_{timestamp}.csv`
pub fn write_extract_log(dir: &Path, extraction: &SemanticExtraction, timestamp: &str) -> Result<PathBuf> {
    let path = dir.join(format!("extract_{}_{}.csv", extraction.method, timestamp));
    let rows = extraction
        .items
        .iter()
        .map(|c| vec![c.raw_text.clone(), c.normalized_text.clone()]);
    write_csv(&path, EXTRACT_LOG_HEADERS, rows, true)?;
    Ok(path)
}

/// 照合ログ `match_{method}_{timestamp}.csv`
pub fn write_match_log(
    dir: &Path,
    method: ExtractionMethod,
    results: &[SemanticMatchResult],
    timestamp: &str,
) -> Result<PathBuf> {
    let path = dir.join(format!("match_{}_{}.csv", method, timestamp));
    let rows = results.iter().map(|r| {
        vec![
            r.input_text.clone(),
            r.normalized_text.clone(),
            r.status.to_string(),
            format!("{}", r.score),
            r.matched_part_number.clone().unwrap_or_default(),
            r.stock.clone().unwrap_or_default(),
            method.to_string(),
        ]
    });
    write_csv(&path, MATCH_LOG_HEADERS, rows, true)?;
    Ok(path)
}
