//! セマンティック品番候補
//!
//! LLMの関数呼び出し結果のパースと、正規表現によるフォールバック抽出。
//! LLMの呼び出し自体は行わない（CLI側の `semantic` モジュールが担当）。

use crate::error::{Error, Result};
use crate::normalize::normalize_candidate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static::lazy_static! {
    // 英字1〜5 + 数字2〜6 + 任意の英数字
    static ref FALLBACK_RE: Regex = Regex::new(r"[A-Z]{1,5}\d{2,6}[A-Z0-9]*").unwrap();
}

/// 品番候補
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticCandidate {
    /// 抽出元の表記
    pub raw_text: String,
    /// 正規化後（重複除去のキー）
    pub normalized_text: String,
}

/// 候補の抽出方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// LLMの関数呼び出し
    Llm,
    /// 正規表現フォールバック
    RegexFallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Llm => "llm",
            ExtractionMethod::RegexFallback => "regex_fallback",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 抽出結果（どの経路で得たかを必ず持つ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticExtraction {
    pub method: ExtractionMethod,
    pub items: Vec<SemanticCandidate>,
}

impl SemanticExtraction {
    /// 正規表現フォールバックで抽出
    pub fn fallback(text: &str) -> Self {
        Self {
            method: ExtractionMethod::RegexFallback,
            items: regex_fallback(text),
        }
    }
}

/// 関数呼び出し引数の1要素
#[derive(Debug, Deserialize)]
struct ToolItem {
    #[serde(default)]
    hinban: serde_json::Value,
    #[serde(default)]
    normalized: Option<serde_json::Value>,
}

/// スカラー値を文字列にする（null・配列・オブジェクトはNone）
fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// (表記, 正規化済み表記) の列から重複を除いた候補を作る
///
/// 正規化済み表記がない場合は表記から正規化する。正規化後が空のものは捨てる。
/// 最初に現れたものを残し、出現順を保つ。
pub fn unique_candidates<I>(items: I) -> Vec<SemanticCandidate>
where
    I: IntoIterator<Item = (String, Option<String>)>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for (raw, normalized) in items {
        let raw = raw.trim().to_string();
        let normalized = normalize_candidate(normalized.as_deref().unwrap_or(&raw));
        if normalized.is_empty() {
            continue;
        }
        if seen.insert(normalized.clone()) {
            unique.push(SemanticCandidate {
                raw_text: raw,
                normalized_text: normalized,
            });
        }
    }

    unique
}

/// `emit_items` 関数の引数をパースする
///
/// 期待する形: `{"items": [{"hinban": "...", "normalized": "..."}]}`
///
/// # Returns
/// * `Ok(Vec)` - 重複除去済みの候補（`items` がなければ空）
/// * `Err(Error::Parse)` - JSONとして読めない、トップレベルがオブジェクトでない、
///   または `items` が配列でない
pub fn parse_tool_arguments(arguments: &str) -> Result<Vec<SemanticCandidate>> {
    let value: serde_json::Value = serde_json::from_str(arguments.trim())
        .map_err(|e| Error::Parse(format!("関数引数のJSONパースエラー: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::Parse("関数引数がJSONオブジェクトではありません".into()))?;

    let items = match object.get("items") {
        None => return Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => items,
        Some(_) => return Err(Error::Parse("関数引数 'items' が配列ではありません".into())),
    };

    let pairs = items.iter().filter_map(|item| {
        match serde_json::from_value::<ToolItem>(item.clone()) {
            Ok(parsed) => {
                let raw = scalar_text(&parsed.hinban).unwrap_or_default();
                let normalized = parsed.normalized.as_ref().and_then(scalar_text);
                Some((raw, normalized))
            }
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed tool item");
                None
            }
        }
    });

    Ok(unique_candidates(pairs))
}

/// 正規表現で品番候補を抽出する（LLMが使えない場合のフォールバック）
///
/// 同じ入力には常に同じ結果を返す。
pub fn regex_fallback(text: &str) -> Vec<SemanticCandidate> {
    let upper: String = text.to_uppercase().nfkc().collect();
    let pairs = FALLBACK_RE
        .find_iter(&upper)
        .map(|m| (m.as_str().to_string(), None));
    unique_candidates(pairs)
}
