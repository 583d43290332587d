//! Agent 编排器：主控循环
//!
//! 负责：加载配置、创建 LLM 与会话、建立 cmd/state 双通道，并在后台任务中
//! 消费用户命令（Submit/Clear/Reset/Quit），驱动单轮管线并投影 UiState。
//! 斜杠命令在这里处理；回复按分段逐条上屏，段间按打字延迟 sleep；
//! 正在进行的轮通过 SessionSupervisor 的 token 取消，取消的轮不产生任何状态变更。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::agent::ChatSession;
use crate::chat;
use crate::config::{load_config, AppConfig};
use crate::core::{AgentPhase, SessionSupervisor, UiState};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::Message;
use crate::relationship::RelationshipSnapshot;

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 提交用户输入（普通消息或斜杠命令）
    Submit(String),
    /// 清空对话（关系状态保留）
    Clear,
    /// 重置关系
    Reset,
    /// 退出应用
    Quit,
}

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock）
pub(crate) fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    // 有 DeepSeek Key 或（配置为 deepseek 且仅有 OpenAI Key 时也走 DeepSeek 兼容端点）
    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    if use_deepseek {
        let model = cfg
            .llm
            .deepseek
            .model
            .clone()
            .unwrap_or_else(|| cfg.llm.model.clone());
        tracing::info!("Using DeepSeek LLM ({})", model);
        Arc::new(create_deepseek_client(Some(&model)))
    } else if use_openai {
        let model = cfg
            .llm
            .openai
            .model
            .clone()
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        let base = cfg.llm.base_url.as_deref();
        tracing::info!("Using OpenAI LLM ({})", model);
        Arc::new(OpenAiClient::new(
            base,
            &model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient::new())
    }
}

/// 创建 Agent 运行时：返回命令发送端、状态接收端与会话监管句柄；
/// 后台任务消费命令并更新 state。
pub async fn create_agent(
    config_path: Option<PathBuf>,
) -> anyhow::Result<(
    mpsc::UnboundedSender<Command>,
    watch::Receiver<UiState>,
    Arc<SessionSupervisor>,
)> {
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let llm = create_llm_from_config(&cfg);
    let mut session = ChatSession::new(llm, &cfg);
    let supervisor = Arc::new(SessionSupervisor::new());
    let segmented = cfg.chat.segmented_replies;

    // 双通道：UI -> Core 命令；Core -> UI 状态快照
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(UiState::initial(session.status()));

    let sup = supervisor.clone();
    tokio::spawn(async move {
        // 显示历史与 LLM 上下文分开维护：分段回复每段一条，外加系统通知
        let mut display: Vec<Message> = Vec::new();

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::Submit(input) => {
                    let input = input.trim().to_string();
                    if input.is_empty() {
                        continue;
                    }
                    if let Some(cmd_text) = input.strip_prefix('/') {
                        handle_slash_command(&mut session, &mut display, cmd_text);
                        project(&state_tx, AgentPhase::Idle, &display, &session, false, None);
                        continue;
                    }

                    display.push(Message::user(input.as_str()));
                    project(&state_tx, AgentPhase::Thinking, &display, &session, true, None);

                    let token = sup.turn_token();
                    let outcome = {
                        tokio::select! {
                            _ = token.cancelled() => None,
                            result = session.process_message(&input) => Some(result),
                        }
                    };

                    match outcome {
                        None => {
                            tracing::info!("本轮已被用户取消，未应用任何变更");
                            display.push(Message::system("（已取消）"));
                            project(&state_tx, AgentPhase::Idle, &display, &session, false, None);
                        }
                        Some(Err(e)) => {
                            tracing::error!("对话管线失败: {}", e);
                            display.push(Message::system("抱歉，AI 服务暂时不可用"));
                            project(
                                &state_tx,
                                AgentPhase::Error,
                                &display,
                                &session,
                                false,
                                Some(e.to_string()),
                            );
                        }
                        Some(Ok(turn)) => {
                            if segmented {
                                for (i, part) in turn.parts.iter().enumerate() {
                                    if i > 0 {
                                        tokio::time::sleep(chat::typing_delay(part)).await;
                                    }
                                    display.push(Message::assistant(part.as_str()));
                                    project(
                                        &state_tx,
                                        AgentPhase::Replying,
                                        &display,
                                        &session,
                                        true,
                                        None,
                                    );
                                }
                            } else {
                                display.push(Message::assistant(turn.parts.join("\n")));
                            }

                            if let Some(change) = turn.report.stage_change {
                                display.push(Message::system(format!(
                                    "关系升级：{} → {}",
                                    change.from.name(),
                                    change.to.name()
                                )));
                            }
                            project(&state_tx, AgentPhase::Idle, &display, &session, false, None);
                        }
                    }
                }
                Command::Clear => {
                    session.clear_conversation();
                    display.clear();
                    project(&state_tx, AgentPhase::Idle, &display, &session, false, None);
                }
                Command::Reset => {
                    session.reset_relationship();
                    display.push(Message::system("关系已重置，从陌生期重新开始"));
                    project(&state_tx, AgentPhase::Idle, &display, &session, false, None);
                }
                Command::Quit => break,
            }
        }
    });

    Ok((cmd_tx, state_rx, supervisor))
}

/// 处理斜杠命令，结果以系统消息形式进显示历史
fn handle_slash_command(session: &mut ChatSession, display: &mut Vec<Message>, cmd_text: &str) {
    let command = cmd_text.split_whitespace().next().unwrap_or("");
    match command {
        "help" => {
            display.push(Message::system(
                "可用命令:\n\
                 /help - 显示帮助\n\
                 /status - 查看关系状态\n\
                 /clear - 清空对话历史\n\
                 /reset - 重置关系",
            ));
        }
        "status" => {
            display.push(Message::system(format_status(&session.status())));
        }
        "clear" => {
            session.clear_conversation();
            display.clear();
            display.push(Message::system("已清空对话历史"));
        }
        "reset" => {
            session.reset_relationship();
            display.push(Message::system("关系已重置，从陌生期重新开始"));
        }
        other => {
            display.push(Message::system(format!(
                "未知命令: /{}\n输入 /help 查看可用命令",
                other
            )));
        }
    }
}

fn format_status(s: &RelationshipSnapshot) -> String {
    format!(
        "当前关系状态\n\
         阶段: {} (Stage {})\n\
         熟悉度: {:.1}/100\n\
         信任度: {:.1}/100\n\
         亲密度: {:.1}/100\n\
         对话轮数: {}",
        s.stage.name(),
        s.stage.number(),
        s.familiarity,
        s.trust,
        s.intimacy,
        s.turn_count
    )
}

fn project(
    state_tx: &watch::Sender<UiState>,
    phase: AgentPhase,
    display: &[Message],
    session: &ChatSession,
    input_locked: bool,
    error_message: Option<String>,
) {
    let _ = state_tx.send(UiState {
        phase,
        history: display.to_vec(),
        relationship: session.status(),
        input_locked,
        error_message,
    });
}
