//! 状态定义：UiState 投影
//!
//! UI 只持有轻量的 UiState（阶段、显示历史、关系快照、锁、错误）；
//! 完整状态由编排器维护并投影过来。显示历史与 LLM 上下文是两份：
//! 回复分段后每段在这里单独成一条，上下文里则存完整原文。

use serde::Serialize;

use crate::memory::Message;
use crate::relationship::RelationshipSnapshot;

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Serialize)]
pub struct UiState {
    pub phase: AgentPhase,
    pub history: Vec<Message>,
    pub relationship: RelationshipSnapshot,
    pub input_locked: bool,
    pub error_message: Option<String>,
}

impl UiState {
    pub fn initial(relationship: RelationshipSnapshot) -> Self {
        Self {
            phase: AgentPhase::Idle,
            history: Vec::new(),
            relationship,
            input_locked: false,
            error_message: None,
        }
    }
}

/// Agent 阶段（UI 投影用）
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum AgentPhase {
    Idle,
    Thinking,
    Replying,
    Error,
}
