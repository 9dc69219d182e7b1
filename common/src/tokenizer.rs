//! 品番候補トークンの抽出

use crate::normalize::normalize_text;
use regex::Regex;
use std::collections::BTreeSet;

/// カタログ上のノイズ語（トークンから除外）
pub const BLACKLIST: &[&str] = &["SCALE", "DATE", "MM", "ISO", "PAGE", "COPY", "SAMPLE", "MODEL"];

lazy_static::lazy_static! {
    // 先頭は英数字、以降は英数字か - _ / で合計4文字以上
    static ref TOKEN_RE: Regex = Regex::new(r"[A-Z0-9][A-Z0-9\-_/]{3,}").unwrap();
}

/// テキストから品番らしいトークンを抽出する
///
/// 正規化後のテキストを走査し、数字を1つ以上含みノイズ語でないものを残す。
/// 重複は除去され、辞書順で返る。
///
/// # Examples
/// ```
/// use hinban_ai_common::extract_tokens;
///
/// let tokens = extract_tokens("ｍｎ−450x test SCALE ZX_9900");
/// assert_eq!(tokens, vec!["MN-450X".to_string(), "ZX_9900".to_string()]);
/// ```
pub fn extract_tokens(text: &str) -> Vec<String> {
    let normalized = normalize_text(text);
    let mut candidates = BTreeSet::new();

    for m in TOKEN_RE.find_iter(&normalized) {
        let token = m.as_str();
        if token.chars().any(|c| c.is_ascii_digit()) && !BLACKLIST.contains(&token) {
            candidates.insert(token.to_string());
        }
    }

    candidates.into_iter().collect()
}
