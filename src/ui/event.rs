//! 事件处理
//!
//! 轮询 crossterm 键盘事件：Ctrl+C/Esc 直接触发会话取消（不进命令队列，
//! 轮进行中队列不被消费），Ctrl+L/Ctrl+Q 转为 Command（Clear/Quit），
//! 其余按键交给 run_app 拼 input_buffer，Enter 时 send_submit。

use std::sync::Arc;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::core::{Command, SessionSupervisor};

/// 应用事件：来自快捷键的 Command 或原始 KeyEvent
#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    Cancelled,
    Key(KeyEvent),
}

/// 事件处理器：持有 cmd_tx 与会话监管句柄
pub struct EventHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
    supervisor: Arc<SessionSupervisor>,
}

impl EventHandler {
    pub fn new(cmd_tx: mpsc::UnboundedSender<Command>, supervisor: Arc<SessionSupervisor>) -> Self {
        Self { cmd_tx, supervisor }
    }

    pub fn poll(&self) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(self.handle_key(key)));
                }
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent) -> AppEvent {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.supervisor.cancel();
                AppEvent::Cancelled
            }
            KeyCode::Esc => {
                self.supervisor.cancel();
                AppEvent::Cancelled
            }
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let _ = self.cmd_tx.send(Command::Clear);
                AppEvent::Command(Command::Clear)
            }
            KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                AppEvent::Command(Command::Quit)
            }
            _ => AppEvent::Key(key),
        }
    }

    pub fn send_submit(&self, input: String) {
        let _ = self.cmd_tx.send(Command::Submit(input));
    }

    pub fn send_quit(&self) {
        let _ = self.cmd_tx.send(Command::Quit);
    }
}
