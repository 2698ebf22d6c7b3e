//! 餐厅状态存储：菜单、订单、智能体日志的唯一数据源
//!
//! 所有状态放在同一把 RwLock 后，变更在锁内一次完成，调用方看不到中间态；
//! 订单总额、订单号唯一、日志截断三条不变式在多会话 / 多人员并发修改下同样成立。
//! 下单后的「后厨已收到」日志由分离的 tokio 任务延时写入，不等待、不可取消。

pub mod analytics;
pub mod log;
pub mod menu;
pub mod order;

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::config::StoreSection;
use crate::core::StoreError;

pub use analytics::{PopularItem, SalesSummary};
pub use log::{AgentLog, LogBook, LogStatus};
pub use menu::{seed_menu, Category, MenuItem};
pub use order::{Order, OrderItem, OrderLine, OrderStatus};

/// 订单号长度（短 token，如 "3FA9C"）
const ORDER_ID_LEN: usize = 5;
/// 顾客名为空时的占位
const DEFAULT_CUSTOMER: &str = "Guest";

/// 存储策略
#[derive(Clone, Debug)]
pub struct StorePolicy {
    /// 日志保留条数
    pub log_capacity: usize,
    /// 下单后多久写入后厨通知日志
    pub kitchen_notify_delay: Duration,
    /// update_order_status 是否校验工作流合法边
    pub enforce_workflow: bool,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            log_capacity: log::DEFAULT_LOG_CAPACITY,
            kitchen_notify_delay: Duration::from_millis(500),
            enforce_workflow: false,
        }
    }
}

impl From<&StoreSection> for StorePolicy {
    fn from(s: &StoreSection) -> Self {
        Self {
            log_capacity: s.log_capacity,
            kitchen_notify_delay: Duration::from_millis(s.kitchen_notify_delay_ms),
            enforce_workflow: s.enforce_workflow,
        }
    }
}

#[derive(Debug)]
struct StoreState {
    menu: Vec<MenuItem>,
    /// 最新在前
    orders: Vec<Order>,
    logs: LogBook,
}

impl StoreState {
    fn order_mut(&mut self, order_id: &str) -> Result<&mut Order, StoreError> {
        self.orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))
    }

    fn log(&mut self, agent: &str, action: &str, details: String, status: LogStatus) {
        self.logs.push(AgentLog::new(agent, action, details, status));
    }

    /// 生成当前未被占用的订单号（在写锁内调用，保证唯一）
    fn fresh_order_id(&self) -> String {
        loop {
            let candidate: String = uuid::Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(ORDER_ID_LEN)
                .collect::<String>()
                .to_uppercase();
            if !self.orders.iter().any(|o| o.id == candidate) {
                return candidate;
            }
        }
    }
}

/// 餐厅状态存储；clone 得到同一份共享状态的句柄
#[derive(Clone, Debug)]
pub struct RestaurantStore {
    inner: Arc<RwLock<StoreState>>,
    policy: StorePolicy,
}

impl RestaurantStore {
    /// 以给定菜单创建存储；校验 id 唯一、价格非负
    pub fn new(menu: Vec<MenuItem>, policy: StorePolicy) -> Result<Self, StoreError> {
        let mut seen = HashSet::new();
        for item in &menu {
            if !seen.insert(item.id.as_str()) {
                return Err(StoreError::DuplicateMenuItem(item.id.clone()));
            }
            if item.price.is_sign_negative() {
                return Err(StoreError::NegativePrice(item.id.clone()));
            }
        }
        let mut state = StoreState {
            menu,
            orders: Vec::new(),
            logs: LogBook::new(policy.log_capacity),
        };
        state.log(
            log::ORCHESTRATOR,
            "System Init",
            "Nexus Agentic OS initialized successfully.".to_string(),
            LogStatus::Success,
        );
        Ok(Self {
            inner: Arc::new(RwLock::new(state)),
            policy,
        })
    }

    /// 使用内置种子菜单
    pub fn seeded(policy: StorePolicy) -> Self {
        Self::new(seed_menu(), policy.clone()).unwrap_or_else(|e| {
            // 种子菜单固定合法，这里只为不在库代码中 panic
            tracing::error!("Seed menu rejected ({}), starting with an empty catalog", e);
            Self {
                inner: Arc::new(RwLock::new(StoreState {
                    menu: Vec::new(),
                    orders: Vec::new(),
                    logs: LogBook::new(policy.log_capacity),
                })),
                policy,
            }
        })
    }

    pub fn from_config(section: &StoreSection) -> Self {
        Self::seeded(StorePolicy::from(section))
    }

    pub fn policy(&self) -> &StorePolicy {
        &self.policy
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------- 菜单 ----------

    /// 菜单快照（加载顺序）
    pub fn list_menu(&self) -> Vec<MenuItem> {
        self.read().menu.clone()
    }

    pub fn menu_item(&self, item_id: &str) -> Option<MenuItem> {
        self.read().menu.iter().find(|m| m.id == item_id).cloned()
    }

    /// 名称 / 描述 / 标签的不区分大小写匹配，返回全部命中（不排序）
    pub fn search_menu(&self, query: &str) -> Vec<MenuItem> {
        self.read()
            .menu
            .iter()
            .filter(|m| m.matches(query))
            .cloned()
            .collect()
    }

    /// 切换上下架，返回新状态；未知 id 返回 ItemNotFound
    pub fn toggle_availability(&self, item_id: &str) -> Result<bool, StoreError> {
        let mut state = self.write();
        let item = state
            .menu
            .iter_mut()
            .find(|m| m.id == item_id)
            .ok_or_else(|| StoreError::ItemNotFound(item_id.to_string()))?;
        item.available = !item.available;
        let (name, available) = (item.name.clone(), item.available);
        let label = if available { "Available" } else { "Out of Stock" };
        state.log(
            log::INVENTORY_AGENT,
            "Stock Update",
            format!("{name} is now {label}"),
            LogStatus::Warning,
        );
        tracing::info!(item_id, available, "menu availability toggled");
        Ok(available)
    }

    // ---------- 订单 ----------

    /// 下单：逐行解析菜单、快照价格、计算总额；任一行失败则整体失败，不产生任何变更
    pub fn place_order(&self, customer_name: &str, lines: &[OrderLine]) -> Result<Order, StoreError> {
        self.place_order_with_notes(customer_name, lines, None)
    }

    /// 同 place_order，并附加智能体备注
    pub fn place_order_with_notes(
        &self,
        customer_name: &str,
        lines: &[OrderLine],
        ai_notes: Option<String>,
    ) -> Result<Order, StoreError> {
        if lines.is_empty() {
            return Err(StoreError::EmptyOrder);
        }

        let order = {
            let mut state = self.write();
            let mut items = Vec::with_capacity(lines.len());
            for line in lines {
                let menu_item = state
                    .menu
                    .iter()
                    .find(|m| m.id == line.menu_item_id)
                    .ok_or_else(|| StoreError::ItemNotFound(line.menu_item_id.clone()))?;
                if line.quantity == 0 {
                    return Err(StoreError::InvalidQuantity {
                        item_id: line.menu_item_id.clone(),
                    });
                }
                if !menu_item.available {
                    return Err(StoreError::ItemUnavailable(menu_item.name.clone()));
                }
                items.push(OrderItem {
                    menu_item_id: menu_item.id.clone(),
                    quantity: line.quantity,
                    name: menu_item.name.clone(),
                    price: menu_item.price,
                    notes: line.notes.clone().filter(|n| !n.trim().is_empty()),
                });
            }

            let total = order::compute_total(&items);
            let customer = customer_name.trim();
            let customer = if customer.is_empty() {
                DEFAULT_CUSTOMER
            } else {
                customer
            };
            let now = Utc::now();
            let order = Order {
                id: state.fresh_order_id(),
                customer_name: customer.to_string(),
                items,
                total,
                status: OrderStatus::Pending,
                created_at: now,
                updated_at: now,
                ai_notes: ai_notes.filter(|n| !n.trim().is_empty()),
            };
            state.orders.insert(0, order.clone());
            state.log(
                log::ORDER_AGENT,
                "New Order",
                format!(
                    "Order #{} received from {}. Total: ${}",
                    order.id,
                    order.customer_name,
                    format_money(order.total)
                ),
                LogStatus::Success,
            );
            order
        };

        tracing::info!(order_id = %order.id, total = %order.total, "order placed");
        self.schedule_kitchen_notification(&order.id);
        Ok(order)
    }

    /// 延时写入后厨通知；有 tokio 运行时则分离任务，否则立即写入
    fn schedule_kitchen_notification(&self, order_id: &str) {
        let details = format!("Kitchen alerted for Order #{order_id}");
        let delay = self.policy.kitchen_notify_delay;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    let mut state = inner.write().unwrap_or_else(PoisonError::into_inner);
                    state.log(log::KITCHEN_AGENT, "Notification", details, LogStatus::Thinking);
                });
            }
            Err(_) => {
                self.write()
                    .log(log::KITCHEN_AGENT, "Notification", details, LogStatus::Thinking);
            }
        }
    }

    /// 更新订单状态；默认不校验迁移合法性（policy.enforce_workflow 打开时校验）
    pub fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<(), StoreError> {
        let enforce = self.policy.enforce_workflow;
        let mut state = self.write();
        let order = state.order_mut(order_id)?;
        if enforce && !order.status.can_transition_to(status) {
            return Err(StoreError::IllegalTransition {
                order_id: order_id.to_string(),
                from: order.status,
                to: status,
            });
        }
        order.status = status;
        order.updated_at = Utc::now();
        state.log(
            log::KITCHEN_AGENT,
            "Status Update",
            format!("Order #{order_id} moved to {status}"),
            LogStatus::Success,
        );
        tracing::info!(order_id, %status, "order status updated");
        Ok(())
    }

    /// 后厨工作流：前进一步，返回新状态
    pub fn advance_order(&self, order_id: &str) -> Result<OrderStatus, StoreError> {
        let mut state = self.write();
        let order = state.order_mut(order_id)?;
        let from = order.status;
        let next = from.next().ok_or_else(|| StoreError::IllegalTransition {
            order_id: order_id.to_string(),
            from,
            to: from,
        })?;
        order.status = next;
        order.updated_at = Utc::now();
        state.log(
            log::KITCHEN_AGENT,
            "Status Update",
            format!("Order #{order_id} moved to {next}"),
            LogStatus::Success,
        );
        Ok(next)
    }

    /// 取消非终态订单
    pub fn cancel_order(&self, order_id: &str) -> Result<(), StoreError> {
        let mut state = self.write();
        let order = state.order_mut(order_id)?;
        if !order.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(StoreError::IllegalTransition {
                order_id: order_id.to_string(),
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        state.log(
            log::KITCHEN_AGENT,
            "Cancellation",
            format!("Order #{order_id} cancelled"),
            LogStatus::Warning,
        );
        Ok(())
    }

    /// 点查；不存在不是错误
    pub fn get_order(&self, order_id: &str) -> Option<Order> {
        self.read().orders.iter().find(|o| o.id == order_id).cloned()
    }

    /// 全部订单，最新在前
    pub fn orders(&self) -> Vec<Order> {
        self.read().orders.clone()
    }

    /// 后厨看板的某一列
    pub fn orders_with_status(&self, status: OrderStatus) -> Vec<Order> {
        self.read()
            .orders
            .iter()
            .filter(|o| o.status == status)
            .cloned()
            .collect()
    }

    pub fn sales_summary(&self) -> SalesSummary {
        analytics::summarize(&self.read().orders)
    }

    // ---------- 日志 ----------

    pub fn add_log(
        &self,
        agent_name: &str,
        action: &str,
        details: impl Into<String>,
        status: LogStatus,
    ) {
        self.write().log(agent_name, action, details.into(), status);
    }

    /// 最新在前
    pub fn logs(&self) -> Vec<AgentLog> {
        self.read().logs.entries()
    }
}

impl Default for RestaurantStore {
    fn default() -> Self {
        Self::seeded(StorePolicy::default())
    }
}

/// 金额保留两位小数输出
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}
