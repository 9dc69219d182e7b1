//! セマンティック照合
//!
//! 1. 文書テキストをLLMに渡し、関数 `emit_items` で品番候補を受け取る
//! 2. 失敗したら正規表現抽出にフォールバック（エラーは上げない）
//! 3. 候補を品番DBと4段階で照合する

use crate::error::{HinbanAiError, Result};
use crate::export;
use crate::extract::{self, ExtractOptions};
use crate::llm::{LlmClient, ToolRequest};
use crate::reference_source::load_reference;
use hinban_ai_common::prompts::{
    build_extract_prompt, tool_parameters, DEFAULT_MAX_PROMPT_CHARS, SYSTEM_PROMPT, TOOL_DESCRIPTION,
    TOOL_NAME,
};
use hinban_ai_common::{
    parse_tool_arguments, resolve_semantic, ExtractionMethod, SemanticCandidate, SemanticExtraction,
    SemanticMatchResult, DEFAULT_FUZZY_THRESHOLD,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 関数引数をログに出す最大文字数
const ARGUMENT_LOG_CHARS: usize = 400;

/// 再試行ポリシー
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大試行回数
    pub max_attempts: u32,
    /// 指数バックオフの底
    pub backoff_base: f64,
    /// バックオフの単位（待ち時間 = 単位 × 底^試行回数）
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: 1.5,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// `attempt` 回目（1始まり）が失敗した後の待ち時間
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff_unit.mul_f64(self.backoff_base.powi(attempt as i32))
    }
}

/// 抽出設定
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// プロンプトに入れる最大文字数
    pub max_prompt_chars: usize,
    /// 1回の呼び出しのタイムアウト
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

/// LLMで品番候補を抽出する
///
/// 関数呼び出しがない・引数が読めない・候補が空・再試行不能なエラー・タイムアウト・
/// 再試行の上限到達のいずれでも正規表現抽出に切り替える。エラーは返さない。
pub async fn extract_semantic(text: &str, client: &dyn LlmClient, config: &ExtractConfig) -> SemanticExtraction {
    if text.trim().is_empty() {
        tracing::info!("text is empty, skipping LLM extraction");
        return SemanticExtraction::fallback(text);
    }

    let request = ToolRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt: build_extract_prompt(text, config.max_prompt_chars),
        tool_name: TOOL_NAME.to_string(),
        tool_description: TOOL_DESCRIPTION.to_string(),
        parameters: tool_parameters(),
    };

    let max_attempts = config.retry.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        let outcome = tokio::time::timeout(config.timeout, client.complete_with_tool(&request)).await;

        let call = match outcome {
            Err(_) => {
                tracing::warn!(attempt, timeout = ?config.timeout, "LLM call timed out, using regex fallback");
                return SemanticExtraction::fallback(text);
            }
            Ok(Err(e)) if e.is_transient() && attempt < max_attempts => {
                let delay = config.retry.delay(attempt);
                tracing::warn!(attempt, status = ?e.status(), delay = ?delay, "transient LLM error, retrying");
                tokio::time::sleep(delay).await;
                continue;
            }
            Ok(Err(e)) => {
                tracing::warn!(attempt, error = %e, "LLM call failed, using regex fallback");
                return SemanticExtraction::fallback(text);
            }
            Ok(Ok(None)) => {
                tracing::warn!("model did not call the function, using regex fallback");
                return SemanticExtraction::fallback(text);
            }
            Ok(Ok(Some(call))) => call,
        };

        let preview: String = call.arguments.chars().take(ARGUMENT_LOG_CHARS).collect();
        tracing::debug!(arguments = %preview.replace('\n', " "), "tool call arguments");

        return match parse_tool_arguments(&call.arguments) {
            Ok(items) if !items.is_empty() => SemanticExtraction {
                method: ExtractionMethod::Llm,
                items,
            },
            Ok(_) => {
                tracing::info!("model returned no usable part numbers, using regex fallback");
                SemanticExtraction::fallback(text)
            }
            Err(e) => {
                tracing::warn!(error = %e, "tool arguments unusable, using regex fallback");
                SemanticExtraction::fallback(text)
            }
        };
    }

    tracing::warn!(max_attempts, "LLM retries exhausted, using regex fallback");
    SemanticExtraction::fallback(text)
}

/// セマンティック照合の設定
#[derive(Debug, Clone)]
pub struct SemanticOptions {
    pub extract: ExtractOptions,
    pub llm: ExtractConfig,
    pub fuzzy_threshold: f64,
    /// CSVログの保存先（Noneなら保存しない）
    pub log_dir: Option<PathBuf>,
}

impl Default for SemanticOptions {
    fn default() -> Self {
        Self {
            extract: ExtractOptions::default(),
            llm: ExtractConfig::default(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            log_dir: None,
        }
    }
}

/// セマンティック照合の結果
#[derive(Debug, Clone, Serialize)]
pub struct SemanticReport {
    pub method: ExtractionMethod,
    pub items: Vec<SemanticCandidate>,
    pub results: Vec<SemanticMatchResult>,
    /// 保存したCSVログ
    pub saved: Vec<PathBuf>,
}

/// 文書1件をセマンティック照合する
///
/// # Errors
/// * `FileNotFound` - 文書または品番DBがない
/// * `Extraction` / `Ocr` - テキスト抽出の失敗
/// * `Common(Schema)` - 品番DBの列不足
pub async fn process_semantic(
    document: &Path,
    db: &Path,
    client: &dyn LlmClient,
    options: &SemanticOptions,
) -> Result<SemanticReport> {
    if !document.is_file() {
        return Err(HinbanAiError::FileNotFound(document.display().to_string()));
    }
    if !db.is_file() {
        return Err(HinbanAiError::FileNotFound(db.display().to_string()));
    }

    let index = load_reference(db)?;

    let pages = extract::extract_text_pages(document, &options.extract)?;
    let text = pages.join("\n");
    tracing::info!(document = %document.display(), pages = pages.len(), chars = text.chars().count(), "text extracted");

    println!("🧠 品番候補を抽出中...");
    let extraction = extract_semantic(&text, client, &options.llm).await;
    print_extraction(&extraction);

    let results = resolve_semantic(&extraction.items, &index, options.fuzzy_threshold);
    print_matches(&results);

    let mut saved = Vec::new();
    if let Some(dir) = &options.log_dir {
        let timestamp = export::timestamp_now();
        saved.push(export::write_extract_log(dir, &extraction, &timestamp)?);
        saved.push(export::write_match_log(dir, extraction.method, &results, &timestamp)?);
        for path in &saved {
            println!("💾 保存しました: {}", path.display());
        }
    }

    Ok(SemanticReport {
        method: extraction.method,
        items: extraction.items,
        results,
        saved,
    })
}

fn print_extraction(extraction: &SemanticExtraction) {
    let title = match extraction.method {
        ExtractionMethod::Llm => "🧠 LLM抽出結果 (Function Call)",
        ExtractionMethod::RegexFallback => "🧪 正規表現抽出（フォールバック）",
    };
    println!("\n=== {} ===", title);
    if extraction.items.is_empty() {
        println!("⚠️ 抽出結果が空です。");
    }
    for (i, item) in extraction.items.iter().enumerate() {
        println!("{:02}. {}  →  {}", i + 1, item.raw_text, item.normalized_text);
    }
    println!("{}", "=".repeat(60));
}

fn print_matches(results: &[SemanticMatchResult]) {
    println!("\n=== 🔎 照合結果 ===");
    for r in results {
        println!(
            "{:<6} | {:<20} -> {:<20} | 在庫={:<10} | score={:.3}",
            r.status.as_str(),
            r.input_text,
            r.matched_part_number.as_deref().unwrap_or("-"),
            r.stock.as_deref().unwrap_or("-"),
            r.score
        );
    }
}
