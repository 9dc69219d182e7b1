//! セマンティック候補の照合
//!
//! 候補ごとに 完全一致 → 部分一致 → 規格キーワード再照合 → あいまい一致 の順に試し、
//! 最初に成立した段階で確定する。強い一致があるのに弱い一致へ格下げされることはない。

use crate::normalize::normalize_candidate;
use crate::reference::{ReferenceIndex, ReferenceRow};
use crate::semantic::SemanticCandidate;
use serde::{Deserialize, Serialize};

/// あいまい一致の既定閾値
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.82;

const SUBSTR_SCORE: f64 = 0.9;
const KIDOU_SCORE: f64 = 0.88;

/// 照合ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    Exact,
    Substr,
    Kidou,
    Fuzzy,
    None,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Exact => "EXACT",
            MatchStatus::Substr => "SUBSTR",
            MatchStatus::Kidou => "KIDOU",
            MatchStatus::Fuzzy => "FUZZY",
            MatchStatus::None => "NONE",
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 候補1件の照合結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMatchResult {
    pub input_text: String,
    pub normalized_text: String,
    pub status: MatchStatus,
    /// 0.0〜1.0
    pub score: f64,
    pub matched_part_number: Option<String>,
    pub stock: Option<String>,
}

impl SemanticMatchResult {
    fn new(candidate: &SemanticCandidate, status: MatchStatus, score: f64, row: Option<&ReferenceRow>) -> Self {
        Self {
            input_text: candidate.raw_text.clone(),
            normalized_text: candidate.normalized_text.clone(),
            status,
            score,
            matched_part_number: row.map(|r| r.part_number.clone()),
            stock: row.and_then(|r| r.stock.clone()),
        }
    }
}

/// 候補を4段階で照合する
///
/// 1. EXACT: 正規化表記が品番と完全一致（1.0）
/// 2. SUBSTR: 正規化表記と品番のどちらかが他方を含む。インデックス順で最初の行（0.9）
/// 3. KIDOU: `ReferenceIndex::retry` の先頭（辞書順最小）（0.88）
/// 4. FUZZY: 全品番との類似度の最大値が `threshold` 以上（類似度を小数3桁に丸めた値）
///
/// どれも成立しなければ NONE（0.0）。正規化表記が空の候補は結果に含めない。
pub fn resolve_semantic(
    candidates: &[SemanticCandidate],
    index: &ReferenceIndex,
    threshold: f64,
) -> Vec<SemanticMatchResult> {
    candidates
        .iter()
        .filter_map(|c| {
            let normalized = normalize_candidate(&c.normalized_text);
            if normalized.is_empty() {
                return None;
            }
            let candidate = SemanticCandidate {
                raw_text: c.raw_text.trim().to_string(),
                normalized_text: normalized,
            };
            Some(resolve_candidate(&candidate, index, threshold))
        })
        .collect()
}

fn resolve_candidate(candidate: &SemanticCandidate, index: &ReferenceIndex, threshold: f64) -> SemanticMatchResult {
    let normalized = candidate.normalized_text.as_str();

    if let Some(row) = index.get(normalized) {
        return SemanticMatchResult::new(candidate, MatchStatus::Exact, 1.0, Some(row));
    }

    let substring_row = index.part_rows().find(|row| {
        row.part_number.contains(normalized)
            || (!row.part_number.is_empty() && normalized.contains(row.part_number.as_str()))
    });
    if let Some(row) = substring_row {
        return SemanticMatchResult::new(candidate, MatchStatus::Substr, SUBSTR_SCORE, Some(row));
    }

    if let Some(part_number) = index.retry(normalized).into_iter().next() {
        let stock = index.get(&part_number).and_then(|r| r.stock.clone());
        return SemanticMatchResult {
            matched_part_number: Some(part_number),
            stock,
            ..SemanticMatchResult::new(candidate, MatchStatus::Kidou, KIDOU_SCORE, None)
        };
    }

    let mut best: Option<(&ReferenceRow, f64)> = None;
    for row in index.part_rows() {
        let ratio = similarity(normalized, &row.part_number);
        if best.map_or(ratio > 0.0, |(_, b)| ratio > b) {
            best = Some((row, ratio));
        }
    }
    if let Some((row, ratio)) = best {
        if ratio >= threshold {
            let score = (ratio * 1000.0).round() / 1000.0;
            return SemanticMatchResult::new(candidate, MatchStatus::Fuzzy, score, Some(row));
        }
    }

    SemanticMatchResult::new(candidate, MatchStatus::None, 0.0, None)
}

/// 類似度を計算（編集距離ベース、0.0〜1.0）
///
/// `(長い方の文字数 - 編集距離) / 長い方の文字数`
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let distance = levenshtein_distance(a, b);
    let max_len = a.chars().count().max(b.chars().count());

    (max_len - distance) as f64 / max_len as f64
}

/// レーベンシュタイン距離を計算（2行DP）
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, &ac) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_chars.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}
