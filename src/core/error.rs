//! 会话管线错误类型
//!
//! 只覆盖对话管线本身：LLM 传输失败、请求超时、配置问题。
//! 关系评估没有错误类型——适配器内部用规则降级消化一切失败。

use thiserror::Error;

/// 对话管线可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("Config error: {0}")]
    Config(String),
}
