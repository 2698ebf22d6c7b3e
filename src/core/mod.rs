//! 核心编排层：错误类型、回合状态、编排器及其构建器

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use builder::OrchestratorBuilder;
pub use error::{AgentError, StoreError, ToolError};
pub use orchestrator::{Orchestrator, API_KEY_ADVISORY, CONNECTION_ERROR, FALLBACK_REPLY};
pub use state::{TurnPhase, TurnReply, TurnStatus};
