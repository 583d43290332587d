//! 记忆层：短期对话记忆（供 LLM 上下文与 UI 渲染使用）

pub mod conversation;

pub use conversation::{ConversationMemory, Message, Role};
