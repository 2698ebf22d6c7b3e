//! 经营统计：营收、订单数、客单价、热销菜品（管理后台使用）

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::store::{Order, OrderStatus};

/// 热销榜保留条数
const POPULAR_LIMIT: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PopularItem {
    pub name: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_revenue: Decimal,
    pub order_count: usize,
    pub average_order_value: Decimal,
    pub popular_items: Vec<PopularItem>,
}

/// 汇总订单；已取消订单不计入
pub fn summarize(orders: &[Order]) -> SalesSummary {
    let counted: Vec<&Order> = orders
        .iter()
        .filter(|o| o.status != OrderStatus::Cancelled)
        .collect();

    let total_revenue: Decimal = counted.iter().map(|o| o.total).sum();
    let order_count = counted.len();
    let average_order_value = if order_count > 0 {
        (total_revenue / Decimal::from(order_count as u64)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let mut counts: HashMap<&str, u32> = HashMap::new();
    for order in &counted {
        for item in &order.items {
            *counts.entry(item.name.as_str()).or_insert(0) += item.quantity;
        }
    }
    let mut popular_items: Vec<PopularItem> = counts
        .into_iter()
        .map(|(name, quantity)| PopularItem {
            name: name.to_string(),
            quantity,
        })
        .collect();
    // 数量降序，同数量按名称排序保证稳定
    popular_items.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.name.cmp(&b.name)));
    popular_items.truncate(POPULAR_LIMIT);

    SalesSummary {
        total_revenue,
        order_count,
        average_order_value,
        popular_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OrderItem;
    use chrono::Utc;

    fn order(id: &str, status: OrderStatus, lines: &[(&str, i64, u32)]) -> Order {
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|(name, cents, qty)| OrderItem {
                menu_item_id: format!("id-{name}"),
                quantity: *qty,
                name: name.to_string(),
                price: Decimal::new(*cents, 2),
                notes: None,
            })
            .collect();
        let total = crate::store::order::compute_total(&items);
        Order {
            id: id.to_string(),
            customer_name: "Guest".into(),
            items,
            total,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ai_notes: None,
        }
    }

    #[test]
    fn test_empty_summary() {
        let s = summarize(&[]);
        assert_eq!(s.order_count, 0);
        assert_eq!(s.total_revenue, Decimal::ZERO);
        assert_eq!(s.average_order_value, Decimal::ZERO);
        assert!(s.popular_items.is_empty());
    }

    #[test]
    fn test_summary_excludes_cancelled_and_ranks_items() {
        let orders = vec![
            order("A", OrderStatus::Pending, &[("Burger", 1000, 2), ("Fries", 500, 1)]),
            order("B", OrderStatus::Delivered, &[("Fries", 500, 3)]),
            order("C", OrderStatus::Cancelled, &[("Cake", 900, 10)]),
        ];
        let s = summarize(&orders);
        assert_eq!(s.order_count, 2);
        assert_eq!(s.total_revenue, Decimal::new(4000, 2));
        assert_eq!(s.average_order_value, Decimal::new(2000, 2));
        assert_eq!(s.popular_items[0], PopularItem { name: "Fries".into(), quantity: 4 });
        assert_eq!(s.popular_items[1], PopularItem { name: "Burger".into(), quantity: 2 });
        assert!(s.popular_items.iter().all(|p| p.name != "Cake"));
    }
}
