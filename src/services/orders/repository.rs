//! Order storage.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ServiceError;
use crate::services::orders::model::{CreateOrderRequest, ListOrdersQuery, Order, OrderStatus, RECORD_ACTIVE};

/// Source of truth for orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, request: &CreateOrderRequest) -> Result<Order, ServiceError>;

    async fn find_by_id(&self, id: u64) -> Result<Option<Order>, ServiceError>;

    async fn update(&self, order: &Order) -> Result<(), ServiceError>;

    /// Returns false when the order did not exist.
    async fn delete(&self, id: u64) -> Result<bool, ServiceError>;

    /// One page of matching orders, newest first, plus the total match count.
    async fn list(&self, query: &ListOrdersQuery) -> Result<(Vec<Order>, i64), ServiceError>;
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    next_id: AtomicU64,
    orders: RwLock<BTreeMap<u64, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, request: &CreateOrderRequest) -> Result<Order, ServiceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let now = unix_now();
        let order = Order {
            id,
            user_id: request.user_id,
            product_id: request.product_id.clone(),
            quantity: request.quantity,
            total_price: request.total_price,
            order_status: OrderStatus::Pending,
            status: RECORD_ACTIVE.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.orders.write().await.insert(id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<Order>, ServiceError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update(&self, order: &Order) -> Result<(), ServiceError> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(ServiceError::not_found("order")),
        }
    }

    async fn delete(&self, id: u64) -> Result<bool, ServiceError> {
        Ok(self.orders.write().await.remove(&id).is_some())
    }

    async fn list(&self, query: &ListOrdersQuery) -> Result<(Vec<Order>, i64), ServiceError> {
        let orders = self.orders.read().await;
        let matching: Vec<&Order> = orders
            .values()
            .rev()
            .filter(|o| query.user_id.map_or(true, |u| o.user_id == u))
            .filter(|o| query.order_status.map_or(true, |s| o.order_status == s))
            .filter(|o| query.status.as_deref().map_or(true, |s| o.status == s))
            .filter(|o| query.product_id.as_deref().map_or(true, |p| o.product_id == p))
            .collect();

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset())
            .take(query.page_size().max(1) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user_id: u64, product: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            user_id,
            product_id: product.into(),
            quantity: 1,
            total_price: 10.0,
        }
    }

    #[tokio::test]
    async fn crud() {
        let repo = InMemoryOrderRepository::new();
        let mut order = repo.create(&request(1, "sku-1")).await.unwrap();
        assert_eq!(order.id, 1);

        order.order_status = OrderStatus::Shipped;
        repo.update(&order).await.unwrap();
        assert_eq!(
            repo.find_by_id(1).await.unwrap().unwrap().order_status,
            OrderStatus::Shipped
        );

        assert!(repo.delete(1).await.unwrap());
        assert!(!repo.delete(1).await.unwrap());
        assert_eq!(repo.find_by_id(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let repo = InMemoryOrderRepository::new();
        for i in 0..5 {
            repo.create(&request(if i % 2 == 0 { 1 } else { 2 }, "sku")).await.unwrap();
        }

        let query = ListOrdersQuery {
            user_id: Some(1),
            page: Some(1),
            page_size: Some(2),
            ..Default::default()
        };
        let (page, total) = repo.list(&query).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.iter().map(|o| o.id).collect::<Vec<_>>(), vec![5, 3]);
    }
}
