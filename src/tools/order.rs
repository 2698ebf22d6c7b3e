//! 订单工具：placeOrder / checkOrderStatus（Order Agent）

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::ToolError;
use crate::store::{log, LogStatus, OrderLine, RestaurantStore};
use crate::tools::schema::{parse_args, schema_value, CheckOrderStatusArgs, PlaceOrderArgs};
use crate::tools::Tool;

/// 下单；任一行无效则整体失败（ItemNotFound / ItemUnavailable / InvalidQuantity）
pub struct PlaceOrderTool {
    store: RestaurantStore,
}

impl PlaceOrderTool {
    pub fn new(store: RestaurantStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for PlaceOrderTool {
    fn name(&self) -> &str {
        "placeOrder"
    }

    fn description(&self) -> &str {
        "Places a new order for the customer. Confirm the items with the customer first."
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<PlaceOrderArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: PlaceOrderArgs = parse_args(args)?;
        self.store.add_log(
            log::ORDER_AGENT,
            "Action",
            "Creating new order",
            LogStatus::Thinking,
        );
        let lines: Vec<OrderLine> = args.items.into_iter().map(OrderLine::from).collect();
        let order = self
            .store
            .place_order_with_notes(&args.customer_name, &lines, args.notes)?;
        serde_json::to_value(order).map_err(|e| ToolError::Unexpected(e.to_string()))
    }
}

/// 查询订单状态，投影为 {status, total}
pub struct CheckOrderStatusTool {
    store: RestaurantStore,
}

impl CheckOrderStatusTool {
    pub fn new(store: RestaurantStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CheckOrderStatusTool {
    fn name(&self) -> &str {
        "checkOrderStatus"
    }

    fn description(&self) -> &str {
        "Checks the status and total of an existing order by its ID."
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<CheckOrderStatusArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: CheckOrderStatusArgs = parse_args(args)?;
        let order_id = args.order_id.trim().trim_start_matches('#');
        self.store.add_log(
            log::ORDER_AGENT,
            "Query",
            format!("Checking status for #{order_id}"),
            LogStatus::Success,
        );
        let order = self
            .store
            .get_order(order_id)
            .ok_or_else(|| ToolError::NotFound("Order not found".to_string()))?;
        Ok(json!({
            "status": order.status,
            "total": order.total,
        }))
    }
}
