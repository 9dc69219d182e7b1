//! 手動再照合
//!
//! 不一致だったトークンを品番DBで引き直し、候補品番を表示する。
//! トークン指定がなければ対話モード（failure.csv から未一致トークンを読み込める）。

use crate::error::{HinbanAiError, Result};
use crate::export::FAILURES_FILE_NAME;
use dialoguer::Input;
use hinban_ai_common::ReferenceIndex;
use std::collections::HashSet;
use std::path::Path;

/// トークン1件の再照合結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome {
    pub token: String,
    pub candidates: Vec<String>,
}

/// トークン群を再照合
pub fn retry_tokens(index: &ReferenceIndex, tokens: &[String]) -> Vec<RetryOutcome> {
    tokens
        .iter()
        .map(|token| RetryOutcome {
            token: token.clone(),
            candidates: index.retry(token),
        })
        .collect()
}

/// 結果を表示
pub fn print_outcome(outcome: &RetryOutcome, stock_of: impl Fn(&str) -> Option<String>) {
    if outcome.candidates.is_empty() {
        println!("  {} → 候補なし", outcome.token);
        return;
    }
    println!("  {} → {}件", outcome.token, outcome.candidates.len());
    for (i, part_number) in outcome.candidates.iter().enumerate() {
        let stock = stock_of(part_number).unwrap_or_else(|| "-".into());
        println!("    {}. {} (在庫={})", i + 1, part_number, stock);
    }
}

/// failure.csv から未一致トークンを重複なしで読み込む
///
/// `path` がフォルダなら中の failure.csv を読む。
pub fn load_failed_tokens(path: &Path) -> Result<Vec<String>> {
    let csv_path = if path.is_dir() {
        path.join(FAILURES_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    if !csv_path.is_file() {
        return Err(HinbanAiError::FileNotFound(csv_path.display().to_string()));
    }

    let content = std::fs::read_to_string(&csv_path)?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let mut lines = content.lines();

    let has_token_column = lines
        .next()
        .and_then(|header| header.rsplit(',').next())
        .is_some_and(|last| last.trim() == "token");
    if !has_token_column {
        return Err(HinbanAiError::Config(format!("'token' 列がありません: {}", csv_path.display())));
    }

    // token は最終列で、カンマ・引用符を含まない（文書名側はクォートされうる）
    let mut seen = HashSet::new();
    let tokens = lines
        .filter_map(|line| line.rsplit(',').next())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect();

    Ok(tokens)
}

/// 対話アクション
pub enum RetryAction {
    /// トークンを照合
    Lookup(String),
    /// 次の未一致トークンへ
    Next,
    /// 残りの未一致トークンをまとめて照合
    All,
    /// 終了
    Quit,
}

fn parse_action(input: &str) -> RetryAction {
    match input.trim() {
        "" | "n" => RetryAction::Next,
        "a" | "A" => RetryAction::All,
        "q" | "Q" => RetryAction::Quit,
        token => RetryAction::Lookup(token.to_string()),
    }
}

/// 対話式で再照合
pub fn run_interactive_retry(index: &ReferenceIndex, pending: Vec<String>) -> Result<()> {
    let stock_of = |part: &str| index.get(part).and_then(|r| r.stock.clone());
    let mut pending = pending.into_iter();

    println!("🔁 再照合モード（品番DB: {}行）", index.len());
    println!("---");
    println!("操作: [トークン入力]照合 [Enter/n]次の未一致 [a]残り全部 [q]終了");
    println!("---\n");

    loop {
        let input: String = Input::new()
            .with_prompt("トークン")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| HinbanAiError::CliExecution(e.to_string()))?;

        match parse_action(&input) {
            RetryAction::Lookup(token) => {
                for outcome in retry_tokens(index, &[token]) {
                    print_outcome(&outcome, stock_of);
                }
            }
            RetryAction::Next => match pending.next() {
                Some(token) => {
                    for outcome in retry_tokens(index, &[token]) {
                        print_outcome(&outcome, stock_of);
                    }
                }
                None => println!("  未一致トークンはもうありません"),
            },
            RetryAction::All => {
                let rest: Vec<String> = pending.by_ref().collect();
                if rest.is_empty() {
                    println!("  未一致トークンはもうありません");
                }
                for outcome in retry_tokens(index, &rest) {
                    print_outcome(&outcome, stock_of);
                }
            }
            RetryAction::Quit => break,
        }
        println!();
    }

    println!("終了します");
    Ok(())
}
