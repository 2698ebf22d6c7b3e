//! 菜单工具：getMenu / recommendDish（Menu Agent）

use async_trait::async_trait;
use serde_json::Value;

use crate::core::ToolError;
use crate::store::{log, LogStatus, RestaurantStore};
use crate::tools::schema::{parse_args, schema_value, RecommendDishArgs};
use crate::tools::Tool;

/// 返回完整菜单（含已下架菜品，available 字段供模型判断）
pub struct GetMenuTool {
    store: RestaurantStore,
}

impl GetMenuTool {
    pub fn new(store: RestaurantStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetMenuTool {
    fn name(&self) -> &str {
        "getMenu"
    }

    fn description(&self) -> &str {
        "Retrieves the full restaurant menu with prices, ingredients, tags and availability."
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        self.store.add_log(
            log::MENU_AGENT,
            "Fetch",
            "Retrieving menu data",
            LogStatus::Success,
        );
        serde_json::to_value(self.store.list_menu()).map_err(|e| ToolError::Unexpected(e.to_string()))
    }
}

/// 按饮食偏好 / 食材检索菜品；无命中返回空数组
pub struct RecommendDishTool {
    store: RestaurantStore,
}

impl RecommendDishTool {
    pub fn new(store: RestaurantStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RecommendDishTool {
    fn name(&self) -> &str {
        "recommendDish"
    }

    fn description(&self) -> &str {
        "Finds menu items matching a dietary preference or ingredient (matches name, description and tags)."
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<RecommendDishArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: RecommendDishArgs = parse_args(args)?;
        self.store.add_log(
            log::MENU_AGENT,
            "Search",
            format!("Searching for '{}'", args.query),
            LogStatus::Thinking,
        );
        let hits = self.store.search_menu(&args.query);
        tracing::debug!(query = %args.query, hits = hits.len(), "recommendDish");
        serde_json::to_value(hits).map_err(|e| ToolError::Unexpected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_menu_returns_catalog_and_logs() {
        let store = RestaurantStore::default();
        let tool = GetMenuTool::new(store.clone());
        let out = tool.execute(json!({})).await.unwrap();
        assert_eq!(out.as_array().unwrap().len(), store.list_menu().len());
        let latest = &store.logs()[0];
        assert_eq!(latest.agent_name, log::MENU_AGENT);
        assert_eq!(latest.action, "Fetch");
    }

    #[tokio::test]
    async fn test_recommend_vegan() {
        let tool = RecommendDishTool::new(RestaurantStore::default());
        let out = tool.execute(json!({"query": "VEGAN"})).await.unwrap();
        let names: Vec<&str> = out
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v["name"].as_str())
            .collect();
        assert!(names.contains(&"Quantum Quinoa Salad"));
        assert!(names.contains(&"Neural Nectar"));
        assert!(!names.contains(&"Nebula Burger"));
    }

    #[tokio::test]
    async fn test_recommend_no_match_is_empty_not_error() {
        let tool = RecommendDishTool::new(RestaurantStore::default());
        let out = tool.execute(json!({"query": "durian"})).await.unwrap();
        assert_eq!(out, json!([]));
    }

    #[tokio::test]
    async fn test_recommend_requires_query() {
        let tool = RecommendDishTool::new(RestaurantStore::default());
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
