//! 认知层：Planner（模型协作方契约、Tool Call 解析）

pub mod planner;

pub use planner::{parse_llm_output, ModelReply, Planner, ToolCall, ToolRound};
