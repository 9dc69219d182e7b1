//! Hinban AI Common Library
//!
//! 品番照合のコアロジック（CLIと将来のフロントエンドで共有）:
//! - 正規化・トークン抽出
//! - 品番CSV（参照テーブル）のインデックス化
//! - ページ単位の照合と、セマンティック候補の4段階照合

pub mod error;
pub mod normalize;
pub mod tokenizer;
pub mod reference;
pub mod resolver;
pub mod semantic;
pub mod semantic_match;
pub mod prompts;

pub use error::{Error, Result};
pub use normalize::{normalize_candidate, normalize_text};
pub use tokenizer::{extract_tokens, BLACKLIST};
pub use reference::{ReferenceIndex, ReferenceRow};
pub use resolver::{resolve_page, MatchAccumulator, MatchKind, MatchRecord, MatchTotals};
pub use semantic::{
    parse_tool_arguments, regex_fallback, unique_candidates, ExtractionMethod, SemanticCandidate,
    SemanticExtraction,
};
pub use semantic_match::{
    resolve_semantic, similarity, MatchStatus, SemanticMatchResult, DEFAULT_FUZZY_THRESHOLD,
};
pub use prompts::{
    build_extract_prompt, tool_parameters, DEFAULT_MAX_PROMPT_CHARS, SYSTEM_PROMPT, TOOL_DESCRIPTION,
    TOOL_NAME,
};
