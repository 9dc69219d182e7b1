//! 照合タスク
//!
//! 文書ごとにテキストを抽出し、ページ単位でトークン照合する。
//! 文書はrayonで並列に処理し、集計は文書ごとのアキュムレータを最後に合算する。

use crate::error::Result;
use crate::extract::{self, ExtractOptions, TextCache};
use hinban_ai_common::{extract_tokens, MatchAccumulator, MatchRecord, MatchTotals, ReferenceIndex};
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 進捗
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    /// 処理済みページ数
    pub processed: usize,
    /// 総ページ数（見込み）
    pub total: usize,
    /// 0〜100
    pub percent: u8,
}

impl TaskProgress {
    pub fn new(processed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            (processed * 100 / total).min(100) as u8
        };
        Self { processed, total, percent }
    }
}

/// タスク結果
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskReport {
    /// 一致レコード（文書名・ページ・種別順）
    pub results: Vec<MatchRecord>,
    /// 不一致レコード（文書名・ページ順）
    pub failures: Vec<MatchRecord>,
    pub totals: MatchTotals,
    /// 処理したページ数
    pub pages: usize,
}

/// 文書群を照合する
///
/// どれか1文書でも抽出に失敗したらタスク全体を失敗とし、部分結果は返さない。
///
/// # Arguments
/// * `index` - 参照インデックス
/// * `documents` - 文書パス
/// * `options` - 抽出オプション
/// * `cache` - ページテキストキャッシュ（保存は呼び出し側）
/// * `progress` - ページ処理ごとに呼ばれる
pub fn process_documents<F>(
    index: &ReferenceIndex,
    documents: &[PathBuf],
    options: &ExtractOptions,
    cache: Option<&Mutex<TextCache>>,
    progress: F,
) -> Result<TaskReport>
where
    F: Fn(TaskProgress) + Sync,
{
    let total: usize = documents
        .par_iter()
        .map(|path| extract::count_pages(path).unwrap_or(1).max(1))
        .sum();
    let processed = AtomicUsize::new(0);

    let accumulators = documents
        .par_iter()
        .map(|path| {
            let source = extract::file_name_of(path);
            let pages = match cache {
                Some(cache) => extract::extract_text_pages_cached(path, options, cache),
                None => extract::extract_text_pages(path, options),
            }
            .inspect_err(|e| tracing::error!(document = %source, error = %e, "extraction failed"))?;

            let mut accumulator = MatchAccumulator::new();
            for (i, text) in pages.iter().enumerate() {
                let tokens = extract_tokens(text);
                let records = accumulator.resolve_page(&source, i + 1, &tokens, index);
                tracing::debug!(document = %source, page = i + 1, tokens = tokens.len(), records, "page resolved");

                let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
                progress(TaskProgress::new(done, total));
            }
            Ok(accumulator)
        })
        .collect::<Result<Vec<MatchAccumulator>>>()?;

    let mut merged = MatchAccumulator::new();
    for accumulator in accumulators {
        merged.merge(accumulator);
    }
    let pages = merged.pages();
    let (records, totals) = merged.finish();
    let (results, failures): (Vec<MatchRecord>, Vec<MatchRecord>) =
        records.into_iter().partition(|r| r.is_matched());

    tracing::info!(
        documents = documents.len(),
        pages,
        tokens = totals.tokens,
        hit_part_number = totals.hit_part_number,
        hit_spec = totals.hit_spec,
        fail = totals.fail,
        "task finished"
    );

    Ok(TaskReport {
        results,
        failures,
        totals,
        pages,
    })
}
