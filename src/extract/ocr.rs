//! OCR連携モジュール
//!
//! OCR自体は外部コマンドに任せる。コマンドにはPDFパスを末尾引数として渡し、
//! 標準出力のテキストをフォームフィード（\x0c）でページに分割する。

use crate::error::{HinbanAiError, Result};
use std::path::Path;
use std::process::Command;

/// OCRエンジン
///
/// 文書ごとに並列に呼ばれるため `Send + Sync` が必要。
pub trait OcrEngine: Send + Sync {
    /// 文書全体をOCRし、ページごとのテキストを返す
    fn recognize(&self, path: &Path) -> Result<Vec<String>>;

    /// ログ表示用の名前
    fn name(&self) -> &str;
}

/// 外部コマンドによるOCR
#[derive(Debug, Clone)]
pub struct CommandOcr {
    program: String,
    args: Vec<String>,
}

impl CommandOcr {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// 設定の `ocr_command`（先頭がプログラム名）から作る
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self::new(program.clone(), args.iter().cloned()))
    }
}

impl OcrEngine for CommandOcr {
    fn recognize(&self, path: &Path) -> Result<Vec<String>> {
        tracing::debug!(program = %self.program, path = %path.display(), "running OCR command");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| HinbanAiError::Ocr(format!("{} の起動に失敗: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HinbanAiError::Ocr(format!(
                "{} が失敗しました ({}): {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(super::split_pages(&stdout))
    }

    fn name(&self) -> &str {
        &self.program
    }
}
