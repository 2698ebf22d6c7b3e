//! 工具层：餐厅工具集与注册表
//!
//! 工具持有 RestaurantStore 的共享引用（内部为 Arc），不存在全局状态。

pub mod menu;
pub mod order;
pub mod registry;
pub mod schema;

pub use menu::{GetMenuTool, RecommendDishTool};
pub use order::{CheckOrderStatusTool, PlaceOrderTool};
pub use registry::{Tool, ToolOutcome, ToolRegistry};

use crate::store::RestaurantStore;

/// 构建餐厅工具注册表：getMenu / recommendDish / placeOrder / checkOrderStatus
pub fn restaurant_registry(store: &RestaurantStore) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(GetMenuTool::new(store.clone()));
    registry.register(RecommendDishTool::new(store.clone()));
    registry.register(PlaceOrderTool::new(store.clone()));
    registry.register(CheckOrderStatusTool::new(store.clone()));
    registry
}
