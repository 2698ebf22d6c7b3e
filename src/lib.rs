//! Nexus - 智能体餐厅点餐核心
//!
//! 模块划分：
//! - **agent**: 会话运行时（显式构建 / 关闭 Store 与编排器）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、回合状态机、编排器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 对话历史
//! - **observability**: tracing 初始化
//! - **react**: Planner（模型协作契约、Tool Call 解析）
//! - **store**: 餐厅状态（菜单、订单、智能体日志、销售统计）
//! - **tools**: 餐厅工具集（getMenu、recommendDish、placeOrder、checkOrderStatus）与注册表

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod store;
pub mod tools;

pub use agent::{create_session, create_session_with_llm, Session};
