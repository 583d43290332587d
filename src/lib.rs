//! Lian - Rust 情感陪伴智能体
//!
//! 模块划分：
//! - **agent**: 无头会话运行时（单轮管线：阶段提示词 → 回复 → 关系评估）
//! - **chat**: 回复分段与打字延迟
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排、状态投影、会话监管、错误类型
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 短期对话记忆（LLM 上下文窗口）
//! - **relationship**: 关系系统（评估适配器 + 阶段状态机 + 阶段提示词）
//! - **ui**: Ratatui TUI 界面

pub mod agent;
pub mod chat;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod relationship;
pub mod ui;

pub use relationship::{RelationshipTracker, Stage};
