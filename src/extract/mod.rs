//! 文書テキスト抽出モジュール
//!
//! - PDF: lopdf でテキストレイヤーを読み、文字数が少ないページがあれば文書全体をOCRに回す
//! - テキスト（.txt）: 抽出済みテキスト。ページはフォームフィード（\x0c）区切り

pub mod cache;
pub mod ocr;

pub use cache::{cache_key, compute_file_hash, TextCache};
pub use ocr::{CommandOcr, OcrEngine};

use crate::config::DEFAULT_MIN_TEXT_CHARS;
use crate::error::{HinbanAiError, Result};
use lopdf::Document;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// ページ区切り文字
pub const PAGE_SEPARATOR: char = '\x0c';

/// 抽出オプション
#[derive(Clone)]
pub struct ExtractOptions {
    /// テキストレイヤーの1ページあたり最小文字数（未満ならOCR）
    pub min_text_chars: usize,
    /// テキストレイヤーを使わずOCRする
    pub force_ocr: bool,
    /// OCRエンジン（未設定ならテキストレイヤーのみ）
    pub ocr: Option<Arc<dyn OcrEngine>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            force_ocr: false,
            ocr: None,
        }
    }
}

impl std::fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("min_text_chars", &self.min_text_chars)
            .field("force_ocr", &self.force_ocr)
            .field("ocr", &self.ocr.as_ref().map(|o| o.name().to_string()))
            .finish()
    }
}

/// 文書の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    /// 拡張子から判定（対応外ならNone）
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" => Some(DocumentKind::Text),
            _ => None,
        }
    }
}

/// 文書からページごとのテキストを抽出
///
/// # Errors
/// * `FileNotFound` - ファイルが存在しない
/// * `Extraction` - 読み込めない・対応外の形式
/// * `Ocr` - OCRコマンドの失敗
pub fn extract_text_pages(path: &Path, options: &ExtractOptions) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(HinbanAiError::FileNotFound(path.display().to_string()));
    }

    match DocumentKind::from_path(path) {
        Some(DocumentKind::Text) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| HinbanAiError::Extraction(format!("{}: {}", path.display(), e)))?;
            Ok(split_pages(&content))
        }
        Some(DocumentKind::Pdf) => extract_pdf_pages(path, options),
        None => Err(HinbanAiError::Extraction(format!(
            "対応していない形式です: {}",
            path.display()
        ))),
    }
}

/// キャッシュ付きで抽出
///
/// キャッシュは呼び出し側が保存する。
pub fn extract_text_pages_cached(
    path: &Path,
    options: &ExtractOptions,
    cache: &Mutex<TextCache>,
) -> Result<Vec<String>> {
    let key = cache_key(&compute_file_hash(path)?, options.force_ocr);

    if let Ok(guard) = cache.lock() {
        if let Some(pages) = guard.get(&key) {
            tracing::debug!(path = %path.display(), "page text cache hit");
            return Ok(pages.to_vec());
        }
    }

    let pages = extract_text_pages(path, options)?;

    let file_name = file_name_of(path);
    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if let Ok(mut guard) = cache.lock() {
        guard.insert(key, file_name, file_size, pages.clone());
    }

    Ok(pages)
}

/// 文書のページ数（進捗表示用）
pub fn count_pages(path: &Path) -> Result<usize> {
    match DocumentKind::from_path(path) {
        Some(DocumentKind::Pdf) => {
            let document = load_pdf(path)?;
            Ok(document.get_pages().len())
        }
        Some(DocumentKind::Text) => {
            let content = std::fs::read_to_string(path)?;
            Ok(split_pages(&content).len())
        }
        None => Err(HinbanAiError::Extraction(format!(
            "対応していない形式です: {}",
            path.display()
        ))),
    }
}

/// フォームフィード区切りのテキストをページに分割
///
/// 末尾の区切り（pdftotext等が最終ページの後に付ける）で空ページは作らない。
pub fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split(PAGE_SEPARATOR).map(str::to_string).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// ファイル名（表示・レコード用）
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_pdf(path: &Path) -> Result<Document> {
    Document::load(path)
        .map_err(|e| HinbanAiError::Extraction(format!("PDFの読み込みに失敗しました {}: {}", path.display(), e)))
}

fn extract_pdf_pages(path: &Path, options: &ExtractOptions) -> Result<Vec<String>> {
    if options.force_ocr {
        let ocr = options.ocr.as_ref().ok_or_else(|| {
            HinbanAiError::Ocr("OCRコマンドが設定されていません (config: ocr_command)".into())
        })?;
        return ocr.recognize(path);
    }

    let document = load_pdf(path)?;
    let pages: Vec<String> = document
        .get_pages()
        .keys()
        .map(|&page_number| match document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(page = page_number, error = %e, "text layer unreadable");
                String::new()
            }
        })
        .collect();

    if !is_sparse(&pages, options.min_text_chars) {
        return Ok(pages);
    }

    match &options.ocr {
        Some(ocr) => {
            tracing::info!(path = %path.display(), engine = ocr.name(), "text layer is sparse, falling back to OCR");
            ocr.recognize(path)
        }
        None => {
            tracing::warn!(path = %path.display(), "text layer is sparse and no OCR command is configured");
            Ok(pages)
        }
    }
}

/// テキストレイヤーが不十分か（ページがない、または最小文字数未満のページがある）
fn is_sparse(pages: &[String], min_text_chars: usize) -> bool {
    pages.is_empty() || pages.iter().any(|p| p.trim().chars().count() < min_text_chars)
}
