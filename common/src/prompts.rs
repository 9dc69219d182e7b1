//! プロンプト生成モジュール
//!
//! セマンティック抽出でLLMに渡すプロンプトと関数定義:
//! - SYSTEM_PROMPT: システムメッセージ
//! - build_extract_prompt: ページテキストを埋め込んだユーザープロンプト
//! - TOOL_NAME / tool_parameters: 強制呼び出しする関数 `emit_items` の定義

use serde_json::{json, Value};

/// プロンプトに埋め込むテキストの既定上限（文字数）
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 8000;

/// 強制呼び出しする関数名
pub const TOOL_NAME: &str = "emit_items";

/// 関数の説明
pub const TOOL_DESCRIPTION: &str = "抽出した品番候補を配列として返す。";

/// システムメッセージ
pub const SYSTEM_PROMPT: &str =
    "あなたはOCR後の照明カタログから品番を抽出する日本語テキスト解析エンジンです。";

const EXTRACT_INSTRUCTIONS: &str = r#"以下のOCRテキストから照明カタログの品番/型番になり得る候補を抽出してください。

## 品番の定義
- 品番は2〜3文字以上のアルファベットで始まります
- その後に3〜5桁の数字が続きます

## 例
- 該当: XNDN1500SLK
- 該当: AB12345
- 非該当: 2025-10-07（数字のみ）
- 非該当: ABC（数字がない）

## タスク
- 品番に見える文字列を抽出し、関数 `emit_items` を呼び出して返してください
- normalized には NFKC（全角→半角）、空白除去、英大文字化を施した値を入れてください
- 例: "NNF41030 LE9" -> {"hinban": "NNF41030 LE9", "normalized": "NNF41030LE9"}
- 普通の単語・数字のみの並び・意味のない短い文字列は除外してください
- OCRで分断された品番は結合してください（例: "NNF 41030" -> "NNF41030"）
- 出力は関数呼び出しのみとし、説明文は出力しないでください"#;

/// 抽出用ユーザープロンプトを生成
///
/// # Arguments
/// * `text` - ページテキスト（文書全体を連結したもの）
/// * `max_chars` - 埋め込む最大文字数（超過分は切り捨て）
pub fn build_extract_prompt(text: &str, max_chars: usize) -> String {
    let truncated = truncate_chars(text, max_chars);
    format!("{}\n\nOCRテキスト:\n```\n{}\n```", EXTRACT_INSTRUCTIONS, truncated)
}

/// `emit_items` の引数スキーマ（JSON Schema）
pub fn tool_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "hinban": { "type": "string" },
                        "normalized": { "type": "string" }
                    },
                    "required": ["hinban", "normalized"]
                }
            }
        },
        "required": ["items"]
    })
}

/// 文字単位で先頭 `max_chars` 文字を取り出す
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
