//! User lookups against the user service.

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::dependency_client::DependencyClient;
use crate::services::orders::model::User;

/// Name of the user dependency in configuration.
pub const USER_SERVICE: &str = "user-service";

/// Where orders get user data from.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: u64) -> Result<User, ServiceError>;
}

/// [`UserDirectory`] backed by `GET /api/v1/users/{id}`.
#[derive(Debug, Clone)]
pub struct UserClient {
    client: DependencyClient,
}

impl UserClient {
    pub fn new(client: DependencyClient) -> Self {
        Self { client }
    }

    pub fn breaker_state(&self) -> CircuitState {
        self.client.breaker().state()
    }
}

#[async_trait]
impl UserDirectory for UserClient {
    async fn get_user(&self, id: u64) -> Result<User, ServiceError> {
        self.client
            .get_json("user", &format!("/api/v1/users/{}", id))
            .await
    }
}
