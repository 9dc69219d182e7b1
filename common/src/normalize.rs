//! テキスト正規化
//!
//! OCR・テキストレイヤー・CSVのどこから来た文字列も、
//! 照合前に同じ形へ揃える。

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static::lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// ハイフンに寄せるダッシュ類（en dash, em dash, minus sign）
const DASH_VARIANTS: [char; 3] = ['\u{2013}', '\u{2014}', '\u{2212}'];

/// 照合用にテキストを正規化する
///
/// NFKC（全角→半角など）→ 大文字化 → ダッシュ類を `-` に統一 →
/// 連続空白を1つに → 前後の空白を除去。
///
/// 全ての入力に対して失敗せず、`normalize_text(normalize_text(x)) == normalize_text(x)`。
///
/// # Examples
/// ```
/// use hinban_ai_common::normalize_text;
///
/// assert_eq!(normalize_text("ｍｎ−450x  test"), "MN-450X TEST");
/// assert_eq!(normalize_text(""), "");
/// ```
pub fn normalize_text(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    // 大文字化で合成形が崩れる文字があるため、NFKCを再適用する
    let folded: String = value.nfkc().collect::<String>().to_uppercase().nfkc().collect();
    let dashed: String = folded
        .chars()
        .map(|c| if DASH_VARIANTS.contains(&c) { '-' } else { c })
        .collect();

    WHITESPACE_RE.replace_all(&dashed, " ").trim().to_string()
}

/// セマンティック候補の正規化（空白は全て除去）
///
/// OCRで分断された品番（"NNF41030 LE9"）を1つのキーにまとめる。
pub fn normalize_candidate(value: &str) -> String {
    let text: String = value.nfkc().collect();
    let compact = WHITESPACE_RE.replace_all(&text, "");
    compact.to_uppercase()
}
