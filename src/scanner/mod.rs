use crate::error::{HinbanAiError, Result};
use crate::extract::DocumentKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// フォルダ内の文書（PDF・テキスト）をファイル名順で列挙
///
/// # Arguments
/// * `folder` - 対象フォルダ
/// * `recursive` - サブフォルダも対象にする
pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(HinbanAiError::FolderNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut documents: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_hidden(e.path()))
        .filter(|e| DocumentKind::from_path(e.path()).is_some())
        .map(|e| e.into_path())
        .collect();

    documents.sort();
    Ok(documents)
}

/// 入力（ファイル・フォルダ混在）から文書リストを作る
///
/// フォルダは `scan_folder` で展開し、重複は除く。
pub fn collect_documents(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();

    for input in inputs {
        if input.is_dir() {
            documents.extend(scan_folder(input, recursive)?);
        } else if input.is_file() {
            if DocumentKind::from_path(input).is_none() {
                return Err(HinbanAiError::Extraction(format!(
                    "対応していない形式です: {}",
                    input.display()
                )));
            }
            documents.push(input.clone());
        } else {
            return Err(HinbanAiError::FileNotFound(input.display().to_string()));
        }
    }

    let mut seen = std::collections::HashSet::new();
    documents.retain(|p| seen.insert(p.clone()));
    Ok(documents)
}

// キャッシュ等の隠しファイル
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
