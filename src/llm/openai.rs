//! OpenAI互換 Chat Completions クライアント
//!
//! `POST {base_url}/chat/completions` に tools と tool_choice を付けて送り、
//! 最初の tool_call を返す。

use super::{LlmClient, LlmError, ToolCall, ToolRequest};
use crate::config::LlmSettings;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// エラーメッセージに含めるレスポンス本文の最大文字数
const MAX_ERROR_BODY_CHARS: usize = 400;

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| LlmError::Communication(format!("HTTPクライアント作成失敗: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body(&self, request: &ToolRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt }
            ],
            "tools": [{
                "type": "function",
                "function": {
                    "name": request.tool_name,
                    "description": request.tool_description,
                    "parameters": request.parameters
                }
            }],
            "tool_choice": {
                "type": "function",
                "function": { "name": request.tool_name }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

/// レスポンスJSONから最初の関数呼び出しを取り出す
fn first_tool_call(response: ChatResponse) -> Option<ToolCall> {
    let choice = response.choices.into_iter().next()?;
    let call = choice.message.tool_calls?.into_iter().next()?;
    Some(ToolCall {
        name: call.function.name,
        arguments: call.function.arguments.unwrap_or_default(),
    })
}

fn map_send_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else if let Some(status) = e.status() {
        LlmError::Status {
            status: status.as_u16(),
            message: e.to_string(),
        }
    } else {
        LlmError::Communication(e.to_string())
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete_with_tool(&self, request: &ToolRequest) -> Result<Option<ToolCall>, LlmError> {
        tracing::debug!(model = %self.model, prompt_chars = request.prompt.chars().count(), "calling chat completions");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(first_tool_call(parsed))
    }
}
