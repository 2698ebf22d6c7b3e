//! 工具参数结构与 JSON Schema 生成（schemars 自动生成，注入 system prompt 的工具清单）
//!
//! 参数统一经 parse_args 反序列化；失败即 ValidationFailure（ToolError::InvalidArguments）。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::core::ToolError;
use crate::store::OrderLine;

/// recommendDish 参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecommendDishArgs {
    #[schemars(
        description = "The dietary preference or ingredient to search for (e.g. 'vegan', 'spicy', 'chicken')"
    )]
    pub query: String,
}

/// placeOrder 的单行
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineArgs {
    #[schemars(description = "The ID of the menu item (e.g. 'm1', 'm2')")]
    pub menu_item_id: String,
    #[serde(deserialize_with = "quantity_from_number")]
    #[schemars(with = "u32", description = "Quantity of the item (at least 1)")]
    pub quantity: u32,
    #[serde(default)]
    #[schemars(description = "Special instructions for this item")]
    pub notes: Option<String>,
}

impl From<OrderLineArgs> for OrderLine {
    fn from(a: OrderLineArgs) -> Self {
        OrderLine {
            menu_item_id: a.menu_item_id,
            quantity: a.quantity,
            notes: a.notes,
        }
    }
}

/// placeOrder 参数
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderArgs {
    #[serde(default)]
    #[schemars(description = "Name of the customer")]
    pub customer_name: String,
    #[schemars(description = "List of items to order")]
    pub items: Vec<OrderLineArgs>,
    #[serde(default)]
    #[schemars(description = "Optional note from the agent about the whole order")]
    pub notes: Option<String>,
}

/// checkOrderStatus 参数
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckOrderStatusArgs {
    #[schemars(description = "The unique Order ID")]
    pub order_id: String,
}

/// 接受 2 或 2.0 这类整数值；负数、小数、超界拒绝
fn quantity_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let n = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })
        .ok_or_else(|| serde::de::Error::custom(format!("invalid quantity: {value}")))?;
    u32::try_from(n).map_err(|_| serde::de::Error::custom(format!("quantity too large: {n}")))
}

/// 将 args 反序列化为参数结构；null 视为空对象
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// 生成参数结构的 JSON Schema
pub fn schema_value<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| no_args_schema())
}

/// 无参数工具的 schema
pub fn no_args_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}
