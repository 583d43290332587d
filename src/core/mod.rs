//! 核心编排层：错误类型、状态投影、会话监管、主控循环

pub mod error;
pub mod orchestrator;
pub mod session_supervisor;
pub mod state;

pub use error::AgentError;
pub use orchestrator::{create_agent, Command};
pub use session_supervisor::SessionSupervisor;
pub use state::{AgentPhase, UiState};
