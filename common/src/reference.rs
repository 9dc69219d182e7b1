//! 品番参照テーブル（DB CSV）モジュール
//!
//! 品番・規格（kidou）・在庫（zaiku）の表を読み込み、照合用に2つの索引を作る:
//! - 品番完全一致マップ（正規化品番 → 行）
//! - 規格テキストから抽出したトークン → 行リストの転置索引

use crate::error::{Error, Result};
use crate::normalize::normalize_text;
use crate::tokenizer::extract_tokens;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// 品番列
pub const PART_NUMBER_COLUMN: &str = "hinban";
/// 規格列
pub const SPEC_TEXT_COLUMN: &str = "kidou";
/// 在庫列（任意。表記揺れの "zaiko" も受け付ける）
pub const STOCK_COLUMNS: &[&str] = &["zaiku", "zaiko"];

/// 参照テーブルの1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRow {
    /// 正規化済み品番（空の場合あり）
    pub part_number: String,
    /// 正規化済み規格テキスト
    pub spec_text: String,
    /// 在庫（列がない・空欄ならNone）
    pub stock: Option<String>,
}

/// 品番参照インデックス
///
/// 構築後は読み取り専用。再読込が必要な場合は新しいインデックスを作って差し替える。
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    /// 全行（読み込み順）
    rows: Vec<ReferenceRow>,
    /// 正規化品番 → rowsの添字（重複時は後勝ち）
    exact_map: HashMap<String, usize>,
    /// 品番キーの初出順
    part_order: Vec<String>,
    /// 規格トークン → rowsの添字リスト（読み込み順）
    spec_index: HashMap<String, Vec<usize>>,
}

impl ReferenceIndex {
    /// CSVファイルから読み込み
    pub fn from_csv(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_csv_str(&content)
    }

    /// CSV文字列から読み込み（1行目はヘッダー）
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut records = parse_csv(content).into_iter();
        let headers = records
            .next()
            .ok_or_else(|| Error::Schema(missing_columns_message()))?;
        Self::from_table(&headers, records)
    }

    /// 列名付きの表から構築する
    ///
    /// # Arguments
    /// * `headers` - 列名（前後空白・大文字小文字は無視）
    /// * `rows` - 各行のセル（不足セルは空欄扱い）
    ///
    /// # Errors
    /// 品番列・規格列のどちらかがない場合は `Error::Schema`
    pub fn from_table<H, I>(headers: &[H], rows: I) -> Result<Self>
    where
        H: AsRef<str>,
        I: IntoIterator<Item = Vec<String>>,
    {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.as_ref().trim().eq_ignore_ascii_case(name))
        };

        let (part_col, spec_col) = match (position(PART_NUMBER_COLUMN), position(SPEC_TEXT_COLUMN)) {
            (Some(p), Some(s)) => (p, s),
            _ => return Err(Error::Schema(missing_columns_message())),
        };
        let stock_col = STOCK_COLUMNS.iter().find_map(|name| position(name));

        let mut index = Self::default();
        for cells in rows {
            let cell = |i: usize| cells.get(i).map(String::as_str).unwrap_or("");
            let stock = stock_col
                .map(|i| cell(i).trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            index.push_row(ReferenceRow {
                part_number: normalize_text(cell(part_col)),
                spec_text: normalize_text(cell(spec_col)),
                stock,
            });
        }

        tracing::debug!(
            rows = index.rows.len(),
            part_numbers = index.exact_map.len(),
            spec_tokens = index.spec_index.len(),
            "reference index built"
        );

        Ok(index)
    }

    fn push_row(&mut self, row: ReferenceRow) {
        let idx = self.rows.len();

        if !row.part_number.is_empty() {
            match self.exact_map.insert(row.part_number.clone(), idx) {
                Some(_) => tracing::warn!(part_number = %row.part_number, "duplicate part number, last row wins"),
                None => self.part_order.push(row.part_number.clone()),
            }
        }

        for token in extract_tokens(&row.spec_text) {
            self.spec_index.entry(token).or_default().push(idx);
        }

        self.rows.push(row);
    }

    /// トークンを照合する
    ///
    /// 品番完全一致と規格トークン一致を独立に引く。両方が同時に非空になりうる。
    ///
    /// # Returns
    /// (品番一致行, 規格一致行)
    pub fn match_token(&self, token: &str) -> (Vec<&ReferenceRow>, Vec<&ReferenceRow>) {
        let normalized = normalize_text(token);
        let part_matches = self.get(&normalized).into_iter().collect();
        let spec_matches = self.spec_rows(&normalized).collect();
        (part_matches, spec_matches)
    }

    /// 手動再照合: 候補品番を重複なしの昇順で返す
    pub fn retry(&self, token: &str) -> Vec<String> {
        let normalized = normalize_text(token);
        let mut candidates = BTreeSet::new();

        if let Some(row) = self.get(&normalized) {
            candidates.insert(row.part_number.clone());
        }
        for row in self.spec_rows(&normalized) {
            if !row.part_number.is_empty() {
                candidates.insert(row.part_number.clone());
            }
        }

        candidates.into_iter().collect()
    }

    /// 正規化済み品番で完全一致の行を取得
    pub fn get(&self, part_number: &str) -> Option<&ReferenceRow> {
        self.exact_map.get(part_number).map(|&i| &self.rows[i])
    }

    fn spec_rows<'a>(&'a self, token: &str) -> impl Iterator<Item = &'a ReferenceRow> + 'a {
        self.spec_index
            .get(token)
            .into_iter()
            .flatten()
            .map(move |&i| &self.rows[i])
    }

    /// 品番を持つ行をインデックス順（品番の初出順、値は後勝ち）で返す
    pub fn part_rows(&self) -> impl Iterator<Item = &ReferenceRow> + '_ {
        self.part_order
            .iter()
            .filter_map(move |key| self.get(key))
    }

    /// 全行（読み込み順）
    pub fn rows(&self) -> &[ReferenceRow] {
        &self.rows
    }

    /// 行数
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn missing_columns_message() -> String {
    format!(
        "CSVに '{}' と '{}' 列が必要です。ファイルを確認してください。",
        PART_NUMBER_COLUMN, SPEC_TEXT_COLUMN
    )
}

/// CSVをパース（ダブルクォート・"" エスケープ・クォート内改行対応）
///
/// 空行は読み飛ばす。
fn parse_csv(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    // 最後の行（末尾改行なし）
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }

    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.iter().all(|f| f.trim().is_empty());
    if !blank {
        records.push(record);
    }
}
