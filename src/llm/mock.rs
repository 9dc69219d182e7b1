//! テスト用のLLMクライアント
//!
//! ネットワークに出ず、あらかじめ積んだ応答を順に返す。
//! CLI本体からは使わない。ライブラリ利用側のテストでも使えるよう公開している。
//!
//! ```
//! use hinban_ai_rust::llm::{MockLlmClient, MockReply};
//! use hinban_ai_rust::semantic::{extract_semantic, ExtractConfig};
//! use hinban_ai_common::ExtractionMethod;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mock = MockLlmClient::with_script([MockReply::ToolCall(
//!     r#"{"items": [{"hinban": "XN100", "normalized": "XN100"}]}"#.into(),
//! )]);
//! let extraction = extract_semantic("型番 XN100", &mock, &ExtractConfig::default()).await;
//! assert_eq!(extraction.method, ExtractionMethod::Llm);
//! assert_eq!(mock.call_count(), 1);
//! # });
//! ```

use super::{LlmClient, LlmError, ToolCall, ToolRequest};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 1回分の応答
#[derive(Debug, Clone)]
pub enum MockReply {
    /// `emit_items` をこの引数で呼んだ
    ToolCall(String),
    /// 関数を呼ばなかった
    NoToolCall,
    /// HTTPエラー
    Status(u16),
    /// 応答せずに待ち続ける（タイムアウト確認用）
    Hang,
}

/// 応答を台本どおりに返すモック
#[derive(Debug, Clone)]
pub struct MockLlmClient {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    default_reply: MockReply,
    requests: Arc<Mutex<Vec<ToolRequest>>>,
}

impl MockLlmClient {
    /// 台本が尽きたら `default_reply` を返し続ける
    pub fn new(default_reply: MockReply) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            default_reply,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 台本を指定して作る
    pub fn with_script<I: IntoIterator<Item = MockReply>>(replies: I) -> Self {
        let client = Self::new(MockReply::NoToolCall);
        client.push_replies(replies);
        client
    }

    /// 台本に応答を追加
    pub fn push_replies<I: IntoIterator<Item = MockReply>>(&self, replies: I) {
        if let Ok(mut queue) = self.replies.lock() {
            queue.extend(replies);
        }
    }

    /// 呼び出し回数
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// 最後に受け取ったリクエスト
    pub fn last_request(&self) -> Option<ToolRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }

    fn next_reply(&self) -> MockReply {
        self.replies
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new(MockReply::NoToolCall)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete_with_tool(&self, request: &ToolRequest) -> Result<Option<ToolCall>, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.next_reply() {
            MockReply::ToolCall(arguments) => Ok(Some(ToolCall {
                name: request.tool_name.clone(),
                arguments,
            })),
            MockReply::NoToolCall => Ok(None),
            MockReply::Status(status) => Err(LlmError::Status {
                status,
                message: "mock error".into(),
            }),
            MockReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LlmError::Timeout)
            }
        }
    }
}
