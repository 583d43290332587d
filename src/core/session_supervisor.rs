//! 会话监管：生命周期、中断管理
//!
//! 持有 CancellationToken，用户 Ctrl+C 时取消当前轮。UI 侧拿共享句柄直接
//! 触发取消（不走命令队列，轮进行中队列不被消费）；编排器每轮取 child token
//! 参与 select。已取消的根 token 会在下一轮开始时换新，取消不会粘到下一轮。

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

/// 会话级生命周期管理：取消令牌
#[derive(Debug, Default)]
pub struct SessionSupervisor {
    cancel_token: Mutex<CancellationToken>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发取消（用户 Ctrl+C / Esc）
    pub fn cancel(&self) {
        self.cancel_token.lock().unwrap().cancel();
    }

    /// 为新的一轮取 token：根 token 若已被上一轮取消则换新
    pub fn turn_token(&self) -> CancellationToken {
        let mut token = self.cancel_token.lock().unwrap();
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        token.child_token()
    }
}
