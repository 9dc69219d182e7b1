//! 品番DBの読み込み
//!
//! CSV（UTF-8、BOM可）と Excel（先頭シート）に対応。どちらも1行目がヘッダー。

use crate::error::{HinbanAiError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use hinban_ai_common::ReferenceIndex;
use std::path::Path;

const EXCEL_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// 品番DBを読み込んでインデックスを作る
pub fn load_reference(path: &Path) -> Result<ReferenceIndex> {
    if !path.is_file() {
        return Err(HinbanAiError::FileNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let index = if EXCEL_EXTENSIONS.contains(&ext.as_str()) {
        load_excel(path)?
    } else {
        ReferenceIndex::from_csv(path)?
    };

    tracing::info!(path = %path.display(), rows = index.len(), "reference loaded");
    Ok(index)
}

fn load_excel(path: &Path) -> Result<ReferenceIndex> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| HinbanAiError::Excel(format!("{}: {}", path.display(), e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| HinbanAiError::Excel(format!("シートがありません: {}", path.display())))?
        .map_err(|e| HinbanAiError::Excel(format!("{}: {}", path.display(), e)))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(cell_text).collect())
        .unwrap_or_default();

    let body = rows
        .map(|row| row.iter().map(cell_text).collect::<Vec<String>>())
        .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()));

    Ok(ReferenceIndex::from_table(&headers, body)?)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::Float(12.0)), "12");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String("AB100".into())), "AB100");
    }

    #[test]
    fn test_load_reference_missing() {
        let result = load_reference(Path::new("/nonexistent/db.csv"));
        assert!(matches!(result, Err(HinbanAiError::FileNotFound(_))));
    }
}
