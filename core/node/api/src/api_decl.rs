use std::sync::Arc;

use anchor_config::ApiConfig;
use anchor_policy::WitnessPolicyStore;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;

pub struct RestApi {
    pub policy_store: WitnessPolicyStore,
    config: ApiConfig,
}

impl RestApi {
    pub fn new(config: ApiConfig, policy_store: WitnessPolicyStore) -> Self {
        Self {
            policy_store,
            config,
        }
    }

    pub fn into_router(self) -> axum::Router<()> {
        let timeout = self.config.request_timeout();
        let shared_state = Arc::new(self);

        axum::Router::new()
            .route(
                "/policy",
                axum::routing::get(Self::get_policy).post(Self::set_policy),
            )
            .with_state(shared_state)
            .layer(ServiceBuilder::new().layer(TimeoutLayer::new(timeout)).into_inner())
    }
}
