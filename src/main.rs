//! Lian - Rust 情感陪伴智能体
//!
//! 入口：初始化日志、创建会话编排器与 TUI，并运行主循环。

use anyhow::Context;
use lian::{core::create_agent, ui::run_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    lian::observability::init();

    // 创建会话运行时：返回命令发送端、状态接收端、会话监管句柄
    let (cmd_tx, state_rx, supervisor) =
        create_agent(None).await.context("Failed to create agent")?;

    // 启动 TUI 主循环（消费 state，向 cmd_tx 发送用户指令）
    run_app(state_rx, cmd_tx, supervisor)
        .await
        .context("App run failed")?;

    Ok(())
}
