//! Order and user types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cache::keys::{ListFingerprint, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};

pub const RECORD_ACTIVE: &str = "active";
pub const RECORD_DELETED: &str = "deleted";

/// Fulfilment state of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub user_id: u64,
    pub product_id: String,
    pub quantity: u32,
    pub total_price: f64,
    pub order_status: OrderStatus,
    /// Record status ("active" or "deleted").
    pub status: String,
    /// Unix seconds.
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: u64,
    pub product_id: String,
    pub quantity: u32,
    pub total_price: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    pub order_status: Option<OrderStatus>,
}

/// Query string of the list endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub user_id: Option<u64>,
    pub order_status: Option<OrderStatus>,
    pub status: Option<String>,
    pub product_id: Option<String>,
}

impl ListOrdersQuery {
    pub fn apply_defaults(&mut self) {
        if self.page.map_or(true, |p| p <= 0) {
            self.page = Some(DEFAULT_PAGE);
        }
        if self.page_size.map_or(true, |s| s <= 0) {
            self.page_size = Some(DEFAULT_PAGE_SIZE);
        }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(DEFAULT_PAGE)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn offset(&self) -> usize {
        ((self.page().max(1) - 1) * self.page_size().max(1)) as usize
    }

    /// Cache key for this query.
    pub fn fingerprint(&self) -> ListFingerprint {
        ListFingerprint::new("orders")
            .page(self.page())
            .page_size(self.page_size())
            .filter("user_id", self.user_id)
            .filter("order_status", self.order_status)
            .filter("status", self.status.as_deref())
            .filter("product_id", self.product_id.as_deref())
    }
}

/// One page of orders, as cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: i64,
}

/// User record served by the user service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub age: u32,
    pub status: String,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == RECORD_ACTIVE
    }
}

/// Order enriched with its user, when the user service could provide it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithUser {
    #[serde(flatten)]
    pub order: Order,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_normalize_pagination() {
        let mut query = ListOrdersQuery {
            page: Some(0),
            page_size: Some(-1),
            ..Default::default()
        };
        query.apply_defaults();
        assert_eq!((query.page(), query.page_size(), query.offset()), (1, 10, 0));

        let query = ListOrdersQuery {
            page: Some(3),
            page_size: Some(20),
            ..Default::default()
        };
        assert_eq!(query.offset(), 40);
    }

    #[test]
    fn fingerprint_covers_every_filter() {
        let base = ListOrdersQuery::default();
        let key = base.fingerprint().key();
        assert_eq!(
            key,
            "orders:list:p1:ps10:order_status=any:product_id=any:status=any:user_id=any:search=all"
        );

        let filtered = ListOrdersQuery {
            user_id: Some(4),
            order_status: Some(OrderStatus::Shipped),
            ..Default::default()
        };
        assert_eq!(
            filtered.fingerprint().key(),
            "orders:list:p1:ps10:order_status=shipped:product_id=any:status=any:user_id=4:search=all"
        );
    }

    #[test]
    fn order_with_user_flattens() {
        let order = Order {
            id: 1,
            user_id: 2,
            product_id: "sku-1".into(),
            quantity: 1,
            total_price: 9.5,
            order_status: OrderStatus::Pending,
            status: RECORD_ACTIVE.into(),
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_value(OrderWithUser { order, user: None }).unwrap();
        assert_eq!(json["order_status"], "pending");
        assert!(json.get("user").is_none());
    }
}
