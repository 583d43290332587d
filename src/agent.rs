//! 无头会话运行时
//!
//! 不依赖 TUI 的单轮对话管线：阶段提示词 → LLM 回复 → 记录本轮 → 评估并应用。
//! 编排器驱动它服务 TUI，测试与其他前端可以直接用。
//! 回复拿到之前不改动任何状态，因此轮中途被打断不会留下半轮记录。

use std::sync::Arc;
use std::time::Duration;

use crate::chat;
use crate::config::AppConfig;
use crate::core::AgentError;
use crate::llm::{CompletionParams, LlmClient};
use crate::memory::ConversationMemory;
use crate::relationship::{RelationshipSnapshot, RelationshipTracker, TurnReport};

/// 单轮对话的产出
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// 完整原始回复（LLM 上下文里存的版本，分段标记保留）
    pub reply: String,
    /// 分段后的显示文本
    pub parts: Vec<String>,
    /// 关系评估报告
    pub report: TurnReport,
}

/// 无头会话：LLM + 对话记忆 + 关系追踪器，服务单个对话
pub struct ChatSession {
    llm: Arc<dyn LlmClient>,
    conversation: ConversationMemory,
    tracker: RelationshipTracker,
    chat_params: CompletionParams,
    request_timeout: Duration,
}

impl ChatSession {
    pub fn new(llm: Arc<dyn LlmClient>, cfg: &AppConfig) -> Self {
        Self {
            llm: llm.clone(),
            conversation: ConversationMemory::new(cfg.app.max_context_turns),
            tracker: RelationshipTracker::new(llm, cfg),
            chat_params: CompletionParams::new(cfg.chat.max_tokens, cfg.chat.temperature),
            request_timeout: Duration::from_secs(cfg.llm.timeouts.request),
        }
    }

    /// 处理单条用户输入，走完整轮管线；评估与应用严格串行，本轮完成前不接下一轮
    pub async fn process_message(&mut self, input: &str) -> Result<ChatTurn, AgentError> {
        let system_prompt = self.tracker.system_prompt();
        let messages = self.conversation.context_messages(&system_prompt, input);

        let reply = tokio::time::timeout(
            self.request_timeout,
            self.llm.complete(&messages, &self.chat_params),
        )
        .await
        .map_err(|_| AgentError::Timeout(self.request_timeout.as_secs()))?
        .map_err(AgentError::Llm)?;

        self.conversation.record_turn(input, reply.clone());

        let report = self.tracker.evaluate_and_update(input, &reply).await;

        let parts = chat::split_reply(&reply);
        Ok(ChatTurn {
            reply,
            parts,
            report,
        })
    }

    /// 当前关系状态（只读）
    pub fn status(&self) -> RelationshipSnapshot {
        self.tracker.status()
    }

    /// 清空对话历史（关系状态保留）
    pub fn clear_conversation(&mut self) {
        self.conversation.clear();
    }

    /// 重置关系（对话历史保留）
    pub fn reset_relationship(&mut self) {
        self.tracker.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::memory::Message;
    use async_trait::async_trait;

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(
            &self,
            _messages: &[Message],
            _params: &CompletionParams,
        ) -> Result<String, String> {
            Err("503".to_string())
        }
    }

    #[tokio::test]
    async fn test_turn_records_conversation_and_applies_evaluation() {
        let llm = Arc::new(MockLlmClient::with_responses([
            "你好呀</>今天过得怎么样？",
            r#"{"familiarity_change": 2, "trust_change": 1, "intimacy_change": 0, "is_key_moment": false, "reason": "初次问候"}"#,
        ]));
        let mut session = ChatSession::new(llm, &AppConfig::default());

        let turn = session.process_message("你好").await.unwrap();
        assert_eq!(turn.parts, ["你好呀", "今天过得怎么样？"]);
        assert_eq!(turn.report.snapshot.familiarity, 2.0);
        assert_eq!(session.status().turn_count, 1);
        assert_eq!(session.conversation.turn_count(), 1);
    }

    #[tokio::test]
    async fn test_llm_failure_leaves_state_untouched() {
        let mut session = ChatSession::new(Arc::new(FailingLlm), &AppConfig::default());

        let err = session.process_message("在吗").await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
        assert!(session.conversation.is_empty());
        assert_eq!(session.status().turn_count, 0);
    }
}
