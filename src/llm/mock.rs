//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 可预置一组脚本化回复（测试里用来依次喂出聊天回复与评估 JSON），
//! 脚本耗尽后回显用户最后一条消息，便于无 Key 跑通整个会话流程。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionParams, LlmClient};
use crate::memory::Message;

/// Mock 客户端：按脚本出队，脚本空时回显
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<String>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置脚本化回复，complete 时按顺序出队
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        _params: &CompletionParams,
    ) -> Result<String, String> {
        if let Some(scripted) = self.responses.lock().unwrap().pop_front() {
            return Ok(scripted);
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::memory::Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!("（Mock 回复）{}", last_user))
    }
}
