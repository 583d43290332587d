//! 关系评估适配器
//!
//! 把最新一轮对话连同当前关系状态、最近 5 轮历史拼成评估请求，交给 LLM 裁判，
//! 再从自由文本里抠出第一个配平的 JSON 对象解析成增量。任何一步失败（超时、
//! 传输错误、无 JSON、字段类型不对）都落到确定性的规则降级，evaluate 本身永不失败。

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::llm::{CompletionParams, LlmClient};
use crate::memory::Message;
use crate::relationship::state::RelationshipSnapshot;

/// 评估上下文保留的轮数
const HISTORY_TURNS: usize = 5;

/// 内置评估器指令（config/prompts/evaluator.txt 可覆盖）
const DEFAULT_INSTRUCTION: &str = "你是人际关系专家，基于生物学和心理学原理评估对话。";

/// 评估结果：三维有符号增量 + 关键时刻标记 + 简短理由。
/// 所有字段带默认值：缺失的数值按 0 处理，缺失的标记按 false 处理。
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationResult {
    #[serde(default)]
    pub familiarity_change: f64,
    #[serde(default)]
    pub trust_change: f64,
    #[serde(default)]
    pub intimacy_change: f64,
    #[serde(default)]
    pub is_key_moment: bool,
    #[serde(default)]
    pub reason: String,
}

/// 一轮对话记录（仅作评估上下文，不持久化）
#[derive(Debug, Clone)]
struct TurnRecord {
    user: String,
    agent: String,
}

/// 评估适配器：持有裁判 LLM、指令块与自己的历史窗口
pub struct Evaluator {
    llm: Arc<dyn LlmClient>,
    instruction: String,
    params: CompletionParams,
    timeout: Duration,
    history: VecDeque<TurnRecord>,
}

impl Evaluator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        params: CompletionParams,
        timeout: Duration,
    ) -> Self {
        Self {
            llm,
            instruction: load_evaluator_instruction(),
            params,
            timeout,
            history: VecDeque::with_capacity(HISTORY_TURNS + 1),
        }
    }

    /// 评估一轮对话。先把 (user, agent) 记入历史并截到最近 5 轮，
    /// 再构建评估请求调用裁判；解析失败或调用失败时返回规则降级结果。
    pub async fn evaluate(
        &mut self,
        user_msg: &str,
        agent_reply: &str,
        current: &RelationshipSnapshot,
    ) -> EvaluationResult {
        self.history.push_back(TurnRecord {
            user: user_msg.to_string(),
            agent: agent_reply.to_string(),
        });
        while self.history.len() > HISTORY_TURNS {
            self.history.pop_front();
        }

        let prompt = self.build_prompt(current);

        match self.call_judge(&prompt).await {
            Ok(result) => {
                tracing::debug!(
                    "关系评估: 熟悉{:+.1} 信任{:+.1} 亲密{:+.1} 关键={} - {}",
                    result.familiarity_change,
                    result.trust_change,
                    result.intimacy_change,
                    result.is_key_moment,
                    result.reason
                );
                result
            }
            Err(err) => {
                tracing::warn!("评估失败（{}），使用规则降级", err);
                fallback_evaluation(user_msg)
            }
        }
    }

    /// 清空评估历史（关系重置时调用）
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    async fn call_judge(&self, prompt: &str) -> Result<EvaluationResult, String> {
        let messages = [Message::user(prompt)];
        let raw = tokio::time::timeout(self.timeout, self.llm.complete(&messages, &self.params))
            .await
            .map_err(|_| "评估请求超时".to_string())??;
        parse_evaluation(&raw)
    }

    /// 构建评估请求：指令块 + 当前状态（分数保留一位小数）+ 历史 + 输出格式要求
    fn build_prompt(&self, current: &RelationshipSnapshot) -> String {
        let mut history_text = String::new();
        if self.history.is_empty() {
            history_text.push_str("（暂无历史对话）\n");
        } else {
            for (i, turn) in self.history.iter().enumerate() {
                history_text.push_str(&format!(
                    "第{}轮:\n  用户: {}\n  AI: {}\n",
                    i + 1,
                    turn.user,
                    turn.agent
                ));
            }
        }

        format!(
            r#"{instruction}

【当前关系状态】
阶段: {stage_name} (Stage {stage})
熟悉度: {familiarity:.1}/100
信任度: {trust:.1}/100
亲密度: {intimacy:.1}/100
对话轮数: {turns}

【对话历史】（最近{history_len}轮）
{history}
【评估任务】
基于以上信息，评估最新一轮对话对关系的影响。

输出JSON格式（仅JSON，无其他内容）:
{{
  "familiarity_change": 数字（可正可负，可以是小数）,
  "trust_change": 数字（可正可负，可以是小数）,
  "intimacy_change": 数字（可正可负，可以是小数）,
  "is_key_moment": true/false,
  "reason": "简短分析（不超过30字）"
}}

重要提示：
- 客观评估，不被当前分数锚定
- 关键时刻可以产生大幅跃升
- 负面互动应给予负分"#,
            instruction = self.instruction,
            stage_name = current.stage.name(),
            stage = current.stage.number(),
            familiarity = current.familiarity,
            trust = current.trust,
            intimacy = current.intimacy,
            turns = current.turn_count,
            history_len = self.history.len(),
            history = history_text,
        )
    }
}

/// 加载评估器指令（文件优先，内置默认兜底）
fn load_evaluator_instruction() -> String {
    ["config/prompts/evaluator.txt", "../config/prompts/evaluator.txt"]
        .into_iter()
        .find_map(|p| std::fs::read_to_string(p).ok())
        .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string())
}

/// 从裁判的自由文本中解析评估结果
fn parse_evaluation(raw: &str) -> Result<EvaluationResult, String> {
    let json = extract_json_object(raw).ok_or("响应中没有完整的 JSON 对象")?;
    serde_json::from_str(json).map_err(|e| format!("解析评估 JSON 失败: {}", e))
}

/// 取文本中第一个配平的 {...} 子串：从第一个 '{' 起做深度计数，
/// 深度归零即闭合；到结尾仍未闭合则返回 None
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (i, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// 规则降级：长消息（>20 字符）给足量正增量，短消息只加一点熟悉度
fn fallback_evaluation(user_msg: &str) -> EvaluationResult {
    if user_msg.chars().count() > 20 {
        EvaluationResult {
            familiarity_change: 5.0,
            trust_change: 3.0,
            intimacy_change: 1.0,
            is_key_moment: false,
            reason: "rule-based fallback: long message".to_string(),
        }
    } else {
        EvaluationResult {
            familiarity_change: 2.0,
            trust_change: 0.0,
            intimacy_change: 0.0,
            is_key_moment: false,
            reason: "rule-based fallback: short message".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::relationship::state::RelationshipState;
    use async_trait::async_trait;

    /// 永远失败的客户端（外部调用出错的路径）
    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(
            &self,
            _messages: &[Message],
            _params: &CompletionParams,
        ) -> Result<String, String> {
            Err("connection refused".to_string())
        }
    }

    fn evaluator_with(llm: Arc<dyn LlmClient>) -> Evaluator {
        Evaluator::new(llm, CompletionParams::new(200, 0.3), Duration::from_secs(30))
    }

    fn snapshot() -> RelationshipSnapshot {
        RelationshipState::new().snapshot()
    }

    #[test]
    fn test_extract_json_surrounded_by_prose() {
        let raw = "评估如下：\n{\"familiarity_change\": 2.5, \"trust_change\": 1}\n以上。";
        let json = extract_json_object(raw).unwrap();
        assert_eq!(json, "{\"familiarity_change\": 2.5, \"trust_change\": 1}");
    }

    #[test]
    fn test_extract_json_nested_braces() {
        let raw = "x {\"a\": {\"b\": 1}, \"c\": 2} y {\"d\": 3}";
        assert_eq!(extract_json_object(raw).unwrap(), "{\"a\": {\"b\": 1}, \"c\": 2}");
    }

    #[test]
    fn test_extract_json_unclosed_returns_none() {
        assert!(extract_json_object("开头 { 没有闭合").is_none());
        assert!(extract_json_object("没有大括号").is_none());
    }

    #[test]
    fn test_parse_missing_fields_coerced_to_zero() {
        let result = parse_evaluation("{\"familiarity_change\": 4}").unwrap();
        assert_eq!(result.familiarity_change, 4.0);
        assert_eq!(result.trust_change, 0.0);
        assert_eq!(result.intimacy_change, 0.0);
        assert!(!result.is_key_moment);
        assert_eq!(result.reason, "");
    }

    #[test]
    fn test_parse_wrong_field_type_is_error() {
        assert!(parse_evaluation("{\"familiarity_change\": \"很多\"}").is_err());
    }

    #[tokio::test]
    async fn test_valid_judgment_parsed() {
        let llm = Arc::new(MockLlmClient::with_responses([
            r#"{"familiarity_change": 3.5, "trust_change": -1, "intimacy_change": 0.5, "is_key_moment": true, "reason": "深度自我披露"}"#,
        ]));
        let mut evaluator = evaluator_with(llm);

        let result = evaluator.evaluate("我小时候的事…", "我在听。", &snapshot()).await;
        assert_eq!(result.familiarity_change, 3.5);
        assert_eq!(result.trust_change, -1.0);
        assert_eq!(result.intimacy_change, 0.5);
        assert!(result.is_key_moment);
    }

    #[tokio::test]
    async fn test_fallback_long_message() {
        let llm = Arc::new(MockLlmClient::with_responses(["这不是 JSON"]));
        let mut evaluator = evaluator_with(llm);

        let user_msg = "a".repeat(25);
        let result = evaluator.evaluate(&user_msg, "嗯嗯", &snapshot()).await;
        assert_eq!(
            (
                result.familiarity_change,
                result.trust_change,
                result.intimacy_change,
                result.is_key_moment
            ),
            (5.0, 3.0, 1.0, false)
        );
    }

    #[tokio::test]
    async fn test_fallback_short_message() {
        let llm = Arc::new(MockLlmClient::with_responses(["{broken"]));
        let mut evaluator = evaluator_with(llm);

        let result = evaluator.evaluate("hello", "你好", &snapshot()).await;
        assert_eq!(
            (
                result.familiarity_change,
                result.trust_change,
                result.intimacy_change,
                result.is_key_moment
            ),
            (2.0, 0.0, 0.0, false)
        );
    }

    #[tokio::test]
    async fn test_llm_error_falls_back() {
        let mut evaluator = evaluator_with(Arc::new(FailingLlm));

        let result = evaluator.evaluate("在吗", "在的", &snapshot()).await;
        assert_eq!(result.familiarity_change, 2.0);
        assert!(result.reason.contains("fallback"));
    }

    #[tokio::test]
    async fn test_history_window_keeps_last_five() {
        let llm = Arc::new(MockLlmClient::new());
        let mut evaluator = evaluator_with(llm);

        for i in 1..=7 {
            evaluator
                .evaluate(&format!("第{}条", i), &format!("回{}", i), &snapshot())
                .await;
        }

        assert_eq!(evaluator.history.len(), 5);
        let users: Vec<&str> = evaluator.history.iter().map(|t| t.user.as_str()).collect();
        assert_eq!(users, ["第3条", "第4条", "第5条", "第6条", "第7条"]);
    }

    #[tokio::test]
    async fn test_prompt_embeds_scores_and_history() {
        let llm = Arc::new(MockLlmClient::new());
        let mut evaluator = evaluator_with(llm);
        evaluator.evaluate("你好", "你好呀", &snapshot()).await;

        let prompt = evaluator.build_prompt(&snapshot());
        assert!(prompt.contains("熟悉度: 0.0/100"));
        assert!(prompt.contains("陌生期"));
        assert!(prompt.contains("familiarity_change"));
        assert!(prompt.contains("第1轮"));
    }
}
