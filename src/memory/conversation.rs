//! 短期记忆：对话历史
//!
//! 以「轮」为单位保留最近 max_turns 轮对话（user + assistant 成对入库），
//! 超出时整轮剪枝；context_messages 负责拼出发给 LLM 的完整消息列表。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 短期记忆：最近 max_turns 轮对话。
/// 一轮 = 一条 user 消息 + 一条 assistant 回复，整轮写入，整轮剪枝，
/// 因此上下文里永远不会出现缺了回复的半轮。
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_turns,
        }
    }

    /// 记录一轮完整对话（回复成功后才调用，中断的轮不会留下半条记录）
    pub fn record_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push(Message::user(user));
        self.messages.push(Message::assistant(assistant));
        self.prune();
    }

    /// 拼出发给 LLM 的完整消息列表：系统提示词 + 保留历史 + 当前用户输入
    pub fn context_messages(&self, system_prompt: &str, pending_user: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend(self.messages.iter().cloned());
        messages.push(Message::user(pending_user));
        messages
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// 超出 max_turns 轮时丢弃最旧的整轮
    fn prune(&mut self) {
        let keep = self.max_turns * 2;
        if self.messages.len() > keep {
            self.messages.drain(..self.messages.len() - keep);
        }
    }

    /// 已保留的轮数
    pub fn turn_count(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_keeps_recent_turns() {
        let mut mem = ConversationMemory::new(2);
        for i in 0..4 {
            mem.record_turn(format!("u{}", i), format!("a{}", i));
        }

        assert_eq!(mem.turn_count(), 2);
        assert_eq!(mem.messages()[0].content, "u2");
        assert_eq!(mem.messages()[3].content, "a3");
    }

    #[test]
    fn test_context_messages_order() {
        let mut mem = ConversationMemory::new(5);
        mem.record_turn("你好", "你好呀");

        let msgs = mem.context_messages("系统提示", "在吗");
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0].role, Role::System);
        assert_eq!(msgs[3].role, Role::User);
        assert_eq!(msgs[3].content, "在吗");
    }
}
