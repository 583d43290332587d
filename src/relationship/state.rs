//! 关系阶段状态机
//!
//! 三维分数（熟悉/信任/亲密，各自夹在 0..=100）+ 阶段 + 轮数计数。
//! 唯一的写入口是 apply_evaluation：加增量 → 夹取 → 计轮 → 检查升级。
//! 阶段只升不降，每次调用最多升一级。纯算术状态迁移，不做任何 I/O。

use serde::Serialize;

use crate::relationship::evaluator::EvaluationResult;

/// 关系阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    Stranger,
    Familiar,
    Close,
    Intimate,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Stranger, Stage::Familiar, Stage::Close, Stage::Intimate];

    pub fn number(self) -> u8 {
        match self {
            Stage::Stranger => 1,
            Stage::Familiar => 2,
            Stage::Close => 3,
            Stage::Intimate => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Stranger => "陌生期",
            Stage::Familiar => "熟悉期",
            Stage::Close => "亲近期",
            Stage::Intimate => "暧昧期",
        }
    }

    /// 英文短名（阶段提示词文件名用）
    pub fn slug(self) -> &'static str {
        match self {
            Stage::Stranger => "stranger",
            Stage::Familiar => "familiar",
            Stage::Close => "close",
            Stage::Intimate => "intimate",
        }
    }

    fn next(self) -> Option<Stage> {
        match self {
            Stage::Stranger => Some(Stage::Familiar),
            Stage::Familiar => Some(Stage::Close),
            Stage::Close => Some(Stage::Intimate),
            Stage::Intimate => None,
        }
    }

    /// 进入该阶段所需的最低分 (熟悉, 信任, 亲密)；表中未列的维度要求为 0
    fn thresholds(self) -> (f64, f64, f64) {
        match self {
            Stage::Stranger => (0.0, 0.0, 0.0),
            Stage::Familiar => (25.0, 15.0, 0.0),
            Stage::Close => (55.0, 45.0, 25.0),
            Stage::Intimate => (75.0, 65.0, 50.0),
        }
    }
}

/// 阶段升级事件
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StageChange {
    pub from: Stage,
    pub to: Stage,
}

/// 关系状态的只读投影（UI 渲染与评估提示词用）
#[derive(Clone, Debug, Serialize)]
pub struct RelationshipSnapshot {
    pub stage: Stage,
    pub familiarity: f64,
    pub trust: f64,
    pub intimacy: f64,
    pub turn_count: u64,
}

/// 关系状态机。分数字段私有，外部只能通过 apply_evaluation 变更。
#[derive(Clone, Debug)]
pub struct RelationshipState {
    familiarity: f64,
    trust: f64,
    intimacy: f64,
    stage: Stage,
    turn_count: u64,
}

impl Default for RelationshipState {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationshipState {
    pub fn new() -> Self {
        Self {
            familiarity: 0.0,
            trust: 0.0,
            intimacy: 0.0,
            stage: Stage::Stranger,
            turn_count: 0,
        }
    }

    /// 应用一次评估结果：加增量并独立夹取到 0..=100（越界部分丢弃），
    /// 轮数 +1，然后按升序检查比当前高的阶段，命中第一个满足门槛的即升级。
    /// 一次调用最多升一级，剩下的留给下一轮。
    pub fn apply_evaluation(&mut self, result: &EvaluationResult) -> Option<StageChange> {
        self.familiarity = (self.familiarity + result.familiarity_change).clamp(0.0, 100.0);
        self.trust = (self.trust + result.trust_change).clamp(0.0, 100.0);
        self.intimacy = (self.intimacy + result.intimacy_change).clamp(0.0, 100.0);

        self.turn_count += 1;

        self.check_stage_upgrade()
    }

    fn check_stage_upgrade(&mut self) -> Option<StageChange> {
        let mut candidate = self.stage.next();
        while let Some(stage) = candidate {
            if self.meets_thresholds(stage) {
                let change = StageChange {
                    from: self.stage,
                    to: stage,
                };
                self.stage = stage;
                return Some(change);
            }
            candidate = stage.next();
        }
        None
    }

    fn meets_thresholds(&self, stage: Stage) -> bool {
        let (familiarity, trust, intimacy) = stage.thresholds();
        self.familiarity >= familiarity && self.trust >= trust && self.intimacy >= intimacy
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn turn_count(&self) -> u64 {
        self.turn_count
    }

    pub fn snapshot(&self) -> RelationshipSnapshot {
        RelationshipSnapshot {
            stage: self.stage,
            familiarity: self.familiarity,
            trust: self.trust,
            intimacy: self.intimacy,
            turn_count: self.turn_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(familiarity: f64, trust: f64, intimacy: f64) -> EvaluationResult {
        EvaluationResult {
            familiarity_change: familiarity,
            trust_change: trust,
            intimacy_change: intimacy,
            is_key_moment: false,
            reason: String::new(),
        }
    }

    #[test]
    fn test_scores_stay_clamped() {
        let mut state = RelationshipState::new();
        let deltas = [
            delta(50.0, 120.0, -30.0),
            delta(-200.0, -5.0, 80.0),
            delta(999.0, 0.1, 40.0),
            delta(-0.5, -999.0, -0.5),
        ];

        for d in &deltas {
            state.apply_evaluation(d);
            let s = state.snapshot();
            for score in [s.familiarity, s.trust, s.intimacy] {
                assert!((0.0..=100.0).contains(&score), "score {} out of range", score);
            }
        }
    }

    #[test]
    fn test_stage_never_decreases() {
        let mut state = RelationshipState::new();
        let mut last = state.stage();

        let deltas = [
            delta(30.0, 20.0, 0.0),
            delta(-100.0, -100.0, -100.0),
            delta(60.0, 50.0, 30.0),
            delta(-100.0, -100.0, -100.0),
        ];
        for d in &deltas {
            state.apply_evaluation(d);
            assert!(state.stage() >= last);
            last = state.stage();
        }
    }

    #[test]
    fn test_stage2_boundary_exclusive_below() {
        let mut state = RelationshipState::new();
        state.apply_evaluation(&delta(24.9, 20.0, 0.0));
        assert_eq!(state.stage(), Stage::Stranger);
    }

    #[test]
    fn test_stage2_boundary_inclusive() {
        let mut state = RelationshipState::new();
        state.apply_evaluation(&delta(25.0, 15.0, 0.0));
        assert_eq!(state.stage(), Stage::Familiar);
    }

    #[test]
    fn test_one_stage_per_call() {
        let mut state = RelationshipState::new();
        // 一步满足阶段 2 与阶段 3 的全部门槛，也只能先升到 2
        let change = state.apply_evaluation(&delta(60.0, 50.0, 30.0));
        assert_eq!(state.stage(), Stage::Familiar);
        assert_eq!(
            change,
            Some(StageChange {
                from: Stage::Stranger,
                to: Stage::Familiar
            })
        );

        // 下一轮补上阶段 3
        let change = state.apply_evaluation(&delta(0.0, 0.0, 0.0));
        assert_eq!(state.stage(), Stage::Close);
        assert!(change.is_some());
    }

    #[test]
    fn test_turn_counter_increments_per_evaluation() {
        let mut state = RelationshipState::new();
        for i in 1..=3 {
            state.apply_evaluation(&delta(1.0, 1.0, 1.0));
            assert_eq!(state.turn_count(), i);
        }
    }

    #[test]
    fn test_saturating_progression() {
        let mut state = RelationshipState::new();

        let change = state.apply_evaluation(&delta(30.0, 20.0, 0.0));
        let s = state.snapshot();
        assert_eq!((s.familiarity, s.trust, s.intimacy), (30.0, 20.0, 0.0));
        assert_eq!(state.stage(), Stage::Familiar);
        assert!(change.is_some());

        let change = state.apply_evaluation(&delta(200.0, 50.0, 30.0));
        let s = state.snapshot();
        assert_eq!((s.familiarity, s.trust, s.intimacy), (100.0, 70.0, 30.0));
        assert_eq!(state.stage(), Stage::Close);
        assert_eq!(
            change,
            Some(StageChange {
                from: Stage::Familiar,
                to: Stage::Close
            })
        );
    }
}
