//! hinban-ai: カタログPDF品番照合ツール
//!
//! 照合ロジックは `hinban_ai_common`、このクレートは入出力まわり
//! （テキスト抽出・LLM呼び出し・CSV/Excel出力・CLI）を担当する。

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod reference_source;
pub mod retry;
pub mod scanner;
pub mod semantic;
