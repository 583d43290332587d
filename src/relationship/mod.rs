//! 关系系统：评估适配器 + 阶段状态机 + 阶段提示词
//!
//! RelationshipTracker 把三者拼成对外的完整接口：评估并应用一轮对话、
//! 读取当前状态、重置、产出当前阶段的系统提示词。

pub mod evaluator;
pub mod prompts;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

pub use evaluator::{EvaluationResult, Evaluator};
pub use prompts::StagePrompts;
pub use state::{RelationshipSnapshot, RelationshipState, Stage, StageChange};

use crate::config::AppConfig;
use crate::llm::{CompletionParams, LlmClient};

/// 单轮评估的产出：评估结果、应用后的快照、可能的阶段升级
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub evaluation: EvaluationResult,
    pub snapshot: RelationshipSnapshot,
    pub stage_change: Option<StageChange>,
}

/// 关系追踪器：一个适配器 + 一个状态机 + 一套阶段提示词，服务单个会话
pub struct RelationshipTracker {
    evaluator: Evaluator,
    state: RelationshipState,
    prompts: StagePrompts,
}

impl RelationshipTracker {
    pub fn new(llm: Arc<dyn LlmClient>, cfg: &AppConfig) -> Self {
        let params = CompletionParams::new(cfg.evaluator.max_tokens, cfg.evaluator.temperature);
        let timeout = Duration::from_secs(cfg.llm.timeouts.evaluation);
        Self {
            evaluator: Evaluator::new(llm, params, timeout),
            state: RelationshipState::new(),
            prompts: StagePrompts::new(),
        }
    }

    /// 评估一轮对话并应用到状态机，返回完整报告
    pub async fn evaluate_and_update(&mut self, user_msg: &str, agent_reply: &str) -> TurnReport {
        let current = self.state.snapshot();
        let evaluation = self.evaluator.evaluate(user_msg, agent_reply, &current).await;
        let stage_change = self.state.apply_evaluation(&evaluation);

        if let Some(change) = &stage_change {
            tracing::info!(
                "关系升级！从阶段{} ({}) 升到阶段{} ({})",
                change.from.number(),
                change.from.name(),
                change.to.number(),
                change.to.name()
            );
        }

        TurnReport {
            evaluation,
            snapshot: self.state.snapshot(),
            stage_change,
        }
    }

    /// 当前关系状态（只读，幂等）
    pub fn status(&self) -> RelationshipSnapshot {
        self.state.snapshot()
    }

    /// 重置为全新关系：分数清零、阶段回到陌生期、评估历史清空
    pub fn reset(&mut self) {
        self.state = RelationshipState::new();
        self.evaluator.clear_history();
    }

    /// 当前阶段的完整系统提示词（分数已注入）
    pub fn system_prompt(&self) -> String {
        self.prompts.system_prompt(&self.state.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn tracker() -> RelationshipTracker {
        RelationshipTracker::new(Arc::new(MockLlmClient::new()), &AppConfig::default())
    }

    #[test]
    fn test_status_is_idempotent() {
        let tracker = tracker();
        let a = tracker.status();
        let b = tracker.status();
        assert_eq!(a.stage, b.stage);
        assert_eq!(
            (a.familiarity, a.trust, a.intimacy, a.turn_count),
            (b.familiarity, b.trust, b.intimacy, b.turn_count)
        );
    }

    #[tokio::test]
    async fn test_reset_returns_fresh_state() {
        let mut tracker = tracker();
        tracker.evaluate_and_update("一条足够长的消息让降级规则给出大增量", "嗯嗯").await;
        assert!(tracker.status().turn_count > 0);

        tracker.reset();
        let s = tracker.status();
        assert_eq!(s.stage, Stage::Stranger);
        assert_eq!((s.familiarity, s.trust, s.intimacy), (0.0, 0.0, 0.0));
        assert_eq!(s.turn_count, 0);
    }

    #[tokio::test]
    async fn test_system_prompt_follows_stage() {
        let mut tracker = tracker();
        assert!(tracker.system_prompt().contains("陌生期"));

        // 降级规则足以推进到熟悉期：长消息每轮 +5/+3/+1
        for _ in 0..5 {
            tracker
                .evaluate_and_update("今天发生了好多事情，我想一件一件慢慢讲给你听呀", "好呀，我听着呢")
                .await;
        }
        assert_eq!(tracker.status().stage, Stage::Familiar);
        assert!(tracker.system_prompt().contains("熟悉期"));
    }
}
