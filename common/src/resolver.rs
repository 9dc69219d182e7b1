//! ページ単位の照合
//!
//! ページから抽出したトークンを参照インデックスで分類し、照合レコードを作る。
//! 集計カウンタは呼び出し側が所有し、レコード生成と同時に更新する。

use crate::reference::{ReferenceIndex, ReferenceRow};
use serde::{Deserialize, Serialize};

/// 照合種別（並び順は品番 → 規格 → 不一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// 品番完全一致
    PartNumber,
    /// 規格テキスト内のトークン一致
    Spec,
    /// どちらにも一致しない
    None,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::PartNumber => "part_number",
            MatchKind::Spec => "spec",
            MatchKind::None => "none",
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 照合レコード（文書・ページ・トークンごと）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// 文書名（PDFファイル名など）
    pub source: String,
    /// ページ番号（1始まり）
    pub page: usize,
    pub token: String,
    pub kind: MatchKind,
    /// 一致した品番（不一致ならNone）
    pub matched_part_number: Option<String>,
    pub stock: Option<String>,
}

impl MatchRecord {
    fn matched(source: &str, page: usize, token: &str, kind: MatchKind, row: &ReferenceRow) -> Self {
        Self {
            source: source.to_string(),
            page,
            token: token.to_string(),
            kind,
            matched_part_number: Some(row.part_number.clone()),
            stock: row.stock.clone(),
        }
    }

    fn unmatched(source: &str, page: usize, token: &str) -> Self {
        Self {
            source: source.to_string(),
            page,
            token: token.to_string(),
            kind: MatchKind::None,
            matched_part_number: None,
            stock: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.kind != MatchKind::None
    }
}

/// 照合の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTotals {
    /// 処理したトークン数
    pub tokens: usize,
    /// 品番一致レコード数
    pub hit_part_number: usize,
    /// 規格一致レコード数
    pub hit_spec: usize,
    /// 不一致トークン数
    pub fail: usize,
}

impl MatchTotals {
    /// 別文書の集計を加算
    pub fn merge(&mut self, other: &MatchTotals) {
        self.tokens += other.tokens;
        self.hit_part_number += other.hit_part_number;
        self.hit_spec += other.hit_spec;
        self.fail += other.fail;
    }
}

/// 1ページ分のトークンを照合する
///
/// トークンごとに、品番一致1件ごとに1レコード、規格一致1件ごとに1レコードを作る。
/// どちらもなければ不一致レコードを1件だけ作る。
///
/// # Arguments
/// * `source` - 文書名
/// * `page` - ページ番号（1始まり）
/// * `tokens` - `extract_tokens` の結果
/// * `index` - 参照インデックス
/// * `totals` - 呼び出し側の集計（レコード生成と同時に更新される）
pub fn resolve_page(
    source: &str,
    page: usize,
    tokens: &[String],
    index: &ReferenceIndex,
    totals: &mut MatchTotals,
) -> Vec<MatchRecord> {
    let mut records = Vec::new();
    totals.tokens += tokens.len();

    for token in tokens {
        let (part_matches, spec_matches) = index.match_token(token);

        for row in &part_matches {
            records.push(MatchRecord::matched(source, page, token, MatchKind::PartNumber, row));
            totals.hit_part_number += 1;
        }
        for row in &spec_matches {
            records.push(MatchRecord::matched(source, page, token, MatchKind::Spec, row));
            totals.hit_spec += 1;
        }

        if part_matches.is_empty() && spec_matches.is_empty() {
            records.push(MatchRecord::unmatched(source, page, token));
            totals.fail += 1;
        }
    }

    records
}

/// 文書単位の照合アキュムレータ
///
/// 文書ごとに1つ作り、ページを順に流し込む。文書間で共有しない。
#[derive(Debug, Clone, Default)]
pub struct MatchAccumulator {
    records: Vec<MatchRecord>,
    totals: MatchTotals,
    pages: usize,
}

impl MatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1ページ分を照合して蓄積し、このページのレコード数を返す
    pub fn resolve_page(
        &mut self,
        source: &str,
        page: usize,
        tokens: &[String],
        index: &ReferenceIndex,
    ) -> usize {
        let records = resolve_page(source, page, tokens, index, &mut self.totals);
        let count = records.len();
        self.records.extend(records);
        self.pages += 1;
        count
    }

    /// 他の文書の結果を取り込む
    pub fn merge(&mut self, other: MatchAccumulator) {
        self.records.extend(other.records);
        self.totals.merge(&other.totals);
        self.pages += other.pages;
    }

    pub fn totals(&self) -> &MatchTotals {
        &self.totals
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    /// (文書名, ページ, 種別) で安定ソートしたレコードと集計を返す
    pub fn finish(mut self) -> (Vec<MatchRecord>, MatchTotals) {
        self.records
            .sort_by(|a, b| (&a.source, a.page, a.kind).cmp(&(&b.source, b.page, b.kind)));
        (self.records, self.totals)
    }
}
