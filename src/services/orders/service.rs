//! Order business logic.
//!
//! Entity reads go through the cache; writes hit the repository first and then
//! refresh (update) or evict (delete) the entity key. List pages are cached
//! under their query fingerprint and left to expire.

use std::sync::Arc;

use crate::cache::{CacheAside, EntityKey};
use crate::error::ServiceError;
use crate::resilience::dependency_client::{degrade, Degradation};
use crate::services::orders::model::{
    CreateOrderRequest, ListOrdersQuery, Order, OrderPage, OrderWithUser, UpdateOrderRequest,
};
use crate::services::orders::repository::{unix_now, OrderRepository};
use crate::services::orders::user_client::{UserDirectory, USER_SERVICE};

pub fn order_key(id: u64) -> EntityKey {
    EntityKey::new("order", id)
}

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    users: Arc<dyn UserDirectory>,
    cache: CacheAside,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>, users: Arc<dyn UserDirectory>, cache: CacheAside) -> Self {
        Self { repo, users, cache }
    }

    /// Create an order after checking its user.
    ///
    /// If the user service is unavailable the order is created anyway and
    /// returned without user data.
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderWithUser, ServiceError> {
        if request.quantity == 0 {
            return Err(ServiceError::Validation("quantity must be at least 1".into()));
        }
        if !(request.total_price.is_finite() && request.total_price >= 0.0) {
            return Err(ServiceError::Validation("total_price must be at least 0".into()));
        }

        let user = degrade(
            self.users.get_user(request.user_id).await,
            Degradation::ProceedWithout,
            USER_SERVICE,
        )?;
        if let Some(user) = &user {
            if !user.is_active() {
                return Err(ServiceError::BadRequest("user is not active".into()));
            }
        }

        let order = self.repo.create(&request).await?;
        self.cache.set_entity(&order_key(order.id), &order).await;

        tracing::info!(order_id = order.id, user_id = order.user_id, user_verified = user.is_some(), "Order created");
        Ok(OrderWithUser { order, user })
    }

    /// Fetch an order, enriched with its user when the user service answers.
    pub async fn get_order(&self, id: u64) -> Result<OrderWithUser, ServiceError> {
        let order = self
            .cache
            .get_or_load_entity(&order_key(id), || self.load(id))
            .await?;

        let user = match self.users.get_user(order.user_id).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(order_id = id, error = %e, "User lookup failed, returning order without user");
                None
            }
        };

        Ok(OrderWithUser { order, user })
    }

    pub async fn update_order(&self, id: u64, request: UpdateOrderRequest) -> Result<Order, ServiceError> {
        let mut order = self.load(id).await?;

        if let Some(status) = request.order_status {
            order.order_status = status;
        }
        order.updated_at = unix_now();

        self.repo.update(&order).await?;
        self.cache.set_entity(&order_key(id), &order).await;
        Ok(order)
    }

    pub async fn delete_order(&self, id: u64) -> Result<(), ServiceError> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::not_found("order"));
        }
        self.cache.delete_entity(&order_key(id)).await;
        Ok(())
    }

    /// One page of orders. Pages are served from cache until their TTL runs
    /// out, even if orders change in the meantime.
    pub async fn list_orders(&self, mut query: ListOrdersQuery) -> Result<(ListOrdersQuery, OrderPage), ServiceError> {
        query.apply_defaults();
        let fingerprint = query.fingerprint();

        if let Some(page) = self.cache.get_list::<OrderPage>(&fingerprint).await {
            return Ok((query, page));
        }

        let (orders, total) = self.repo.list(&query).await?;
        let page = OrderPage { orders, total };
        self.cache.set_list(&fingerprint, &page, None).await;
        Ok((query, page))
    }

    async fn load(&self, id: u64) -> Result<Order, ServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::{CacheBackend, MemoryCache};
    use crate::clock::MockClock;
    use crate::config::CacheConfig;
    use crate::services::orders::model::{OrderStatus, User};
    use crate::services::orders::repository::InMemoryOrderRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers with a fixed outcome and counts lookups.
    struct FixedUsers {
        status: Option<&'static str>,
        unavailable: bool,
        calls: AtomicUsize,
    }

    impl FixedUsers {
        fn active() -> Self {
            Self { status: Some("active"), unavailable: false, calls: AtomicUsize::new(0) }
        }

        fn inactive() -> Self {
            Self { status: Some("inactive"), unavailable: false, calls: AtomicUsize::new(0) }
        }

        fn down() -> Self {
            Self { status: None, unavailable: true, calls: AtomicUsize::new(0) }
        }

        fn missing() -> Self {
            Self { status: None, unavailable: false, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl UserDirectory for FixedUsers {
        async fn get_user(&self, id: u64) -> Result<User, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(ServiceError::CircuitOpen { dependency: USER_SERVICE.into() });
            }
            match self.status {
                Some(status) => Ok(User {
                    id,
                    email: format!("user{}@example.com", id),
                    name: "Ada".into(),
                    age: 36,
                    status: status.into(),
                }),
                None => Err(ServiceError::not_found("user")),
            }
        }
    }

    struct Fixture {
        service: OrderService,
        repo: Arc<InMemoryOrderRepository>,
        backend: Arc<MemoryCache>,
        clock: MockClock,
    }

    fn fixture(users: FixedUsers) -> Fixture {
        let clock = MockClock::new();
        let backend = Arc::new(MemoryCache::new(Arc::new(clock.clone())));
        let repo = Arc::new(InMemoryOrderRepository::new());
        let cache = CacheAside::new(backend.clone(), &CacheConfig::default());
        Fixture {
            service: OrderService::new(repo.clone(), Arc::new(users), cache),
            repo,
            backend,
            clock,
        }
    }

    fn new_order(user_id: u64) -> CreateOrderRequest {
        CreateOrderRequest {
            user_id,
            product_id: "sku-1".into(),
            quantity: 2,
            total_price: 19.98,
        }
    }

    #[tokio::test]
    async fn create_with_active_user_caches_entity() {
        let f = fixture(FixedUsers::active());
        let created = f.service.create_order(new_order(7)).await.unwrap();

        assert_eq!(created.user.as_ref().map(|u| u.id), Some(7));
        assert!(f.backend.get("order:1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn create_rejects_inactive_user() {
        let f = fixture(FixedUsers::inactive());
        let err = f.service.create_order(new_order(7)).await.unwrap_err();

        assert!(matches!(err, ServiceError::BadRequest(_)));
        assert!(f.repo.find_by_id(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_proceeds_without_user_when_dependency_down() {
        let f = fixture(FixedUsers::down());
        let created = f.service.create_order(new_order(7)).await.unwrap();

        assert_eq!(created.user, None);
        assert_eq!(created.order.id, 1);
    }

    #[tokio::test]
    async fn create_fails_for_unknown_user() {
        let f = fixture(FixedUsers::missing());
        let err = f.service.create_order(new_order(7)).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn create_validates_quantity() {
        let f = fixture(FixedUsers::active());
        let err = f
            .service
            .create_order(CreateOrderRequest { quantity: 0, ..new_order(1) })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn get_serves_from_cache_after_first_read() {
        let f = fixture(FixedUsers::active());
        let order = f.repo.create(&new_order(3)).await.unwrap();

        f.service.get_order(order.id).await.unwrap();
        assert!(f.backend.get("order:1").await.unwrap().is_some());

        // Bypass the service so only the cache still knows the order.
        f.repo.delete(order.id).await.unwrap();
        let cached = f.service.get_order(order.id).await.unwrap();
        assert_eq!(cached.order, order);
    }

    #[tokio::test]
    async fn get_returns_order_without_user_on_any_lookup_error() {
        let f = fixture(FixedUsers::missing());
        let order = f.repo.create(&new_order(3)).await.unwrap();

        let fetched = f.service.get_order(order.id).await.unwrap();
        assert_eq!(fetched.user, None);
    }

    #[tokio::test]
    async fn get_unknown_order_is_not_found() {
        let f = fixture(FixedUsers::active());
        let err = f.service.get_order(42).await.unwrap_err();
        assert_eq!(err.to_string(), "order not found");
    }

    #[tokio::test]
    async fn update_refreshes_cached_entity() {
        let f = fixture(FixedUsers::active());
        let created = f.service.create_order(new_order(1)).await.unwrap();

        f.service
            .update_order(created.order.id, UpdateOrderRequest { order_status: Some(OrderStatus::Shipped) })
            .await
            .unwrap();

        let fetched = f.service.get_order(created.order.id).await.unwrap();
        assert_eq!(fetched.order.order_status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn delete_evicts_entity() {
        let f = fixture(FixedUsers::active());
        let created = f.service.create_order(new_order(1)).await.unwrap();

        f.service.delete_order(created.order.id).await.unwrap();
        assert!(f.backend.get("order:1").await.unwrap().is_none());
        assert!(matches!(
            f.service.get_order(created.order.id).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            f.service.delete_order(created.order.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn list_pages_stay_stale_until_ttl() {
        let f = fixture(FixedUsers::active());
        f.service.create_order(new_order(1)).await.unwrap();

        let (query, page) = f.service.list_orders(ListOrdersQuery::default()).await.unwrap();
        assert_eq!((query.page(), query.page_size(), page.total), (1, 10, 1));

        f.service.create_order(new_order(1)).await.unwrap();
        let (_, stale) = f.service.list_orders(ListOrdersQuery::default()).await.unwrap();
        assert_eq!(stale.total, 1);

        f.clock.advance(Duration::from_secs(60));
        let (_, fresh) = f.service.list_orders(ListOrdersQuery::default()).await.unwrap();
        assert_eq!(fresh.total, 2);
    }
}
