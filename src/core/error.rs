//! 错误类型：存储层 / 工具层 / 编排层
//!
//! StoreError 由 RestaurantStore 抛出（类型化失败）；ToolError 在 ToolRegistry 边界统一转为 `{"error": ...}`；
//! AgentError 只在编排层出现，且全部可转成面向用户的提示。

use thiserror::Error;

use crate::store::OrderStatus;

/// 存储层失败：引用无效、校验失败、非法状态迁移
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Item {0} not found")]
    ItemNotFound(String),

    #[error("Order {0} not found")]
    OrderNotFound(String),

    #[error("Item {0} is out of stock")]
    ItemUnavailable(String),

    #[error("Quantity for item {item_id} must be at least 1")]
    InvalidQuantity { item_id: String },

    #[error("An order must contain at least one item")]
    EmptyOrder,

    #[error("Order #{order_id} cannot move from {from} to {to}")]
    IllegalTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// 菜单加载时 id 重复
    #[error("Duplicate menu item id: {0}")]
    DuplicateMenuItem(String),

    #[error("Menu item {0} has a negative price")]
    NegativePrice(String),
}

/// 工具执行失败；Display 文本即返回给模型的 error 字段
#[derive(Error, Debug, Clone)]
pub enum ToolError {
    /// 查询目标不存在（如订单号无效）
    #[error("{0}")]
    NotFound(String),

    /// 参数不符合 schema（ValidationFailure）
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// 其它意外失败（含工具 panic），在分发边界捕获
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

/// 编排层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// 未配置模型（无 API Key 等）
    #[error("Language model is not configured")]
    CollaboratorUnavailable,

    #[error("LLM error: {0}")]
    LlmError(String),

    /// 同一会话已有进行中的回合
    #[error("A turn is already in progress for this session")]
    TurnInFlight,

    #[error("Empty user input")]
    EmptyInput,
}
