//! LLMクライアント
//!
//! 品番抽出は「関数呼び出しを1回強制する」形でしか使わないため、
//! クライアントが公開する操作は `complete_with_tool` の1つだけ。

pub mod mock;
pub mod openai;

pub use mock::{MockLlmClient, MockReply};
pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// 再試行対象のHTTPステータス
pub const TRANSIENT_STATUS: &[u16] = &[429, 500, 502, 503, 504];

/// LLM呼び出しエラー
#[derive(Error, Debug)]
pub enum LlmError {
    /// 2xx以外の応答
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// 接続・送受信エラー
    #[error("通信エラー: {0}")]
    Communication(String),

    /// レスポンスの形式が不正
    #[error("不正なレスポンス: {0}")]
    InvalidResponse(String),

    #[error("タイムアウトしました")]
    Timeout,
}

impl LlmError {
    /// 再試行で回復しうるエラーか
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Status { status, .. } => TRANSIENT_STATUS.contains(status),
            _ => false,
        }
    }

    /// HTTPステータス（あれば）
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 関数呼び出しリクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub system: String,
    pub prompt: String,
    pub tool_name: String,
    pub tool_description: String,
    /// 引数のJSON Schema
    pub parameters: Value,
}

/// モデルが返した関数呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    /// 引数（JSON文字列のまま）
    pub arguments: String,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 関数呼び出しを強制して1回問い合わせる
    ///
    /// # Returns
    /// * `Ok(Some)` - 関数呼び出しがあった
    /// * `Ok(None)` - モデルが関数を呼ばなかった
    async fn complete_with_tool(&self, request: &ToolRequest) -> Result<Option<ToolCall>, LlmError>;
}
