use std::sync::Arc;

use anchor_policy::PolicyStoreError;
use axum::{extract::State, http::StatusCode, response::Response};

use super::{api_decl::RestApi, error::ApiError};

fn ok_text(body: String) -> Response<String> {
    Response::builder()
        .status(StatusCode::OK)
        .body(body)
        .expect("response is valid")
}

impl RestApi {
    pub async fn get_policy(
        State(self_): State<Arc<Self>>,
    ) -> Result<Response<String>, ApiError> {
        match self_.policy_store.get().await? {
            Some(policy) => Ok(ok_text(policy)),
            None => Err(ApiError::NotFound("no policy is configured".to_string())),
        }
    }

    pub async fn set_policy(
        State(self_): State<Arc<Self>>,
        body: String,
    ) -> Result<Response<String>, ApiError> {
        match self_.policy_store.set(&body).await {
            Ok(()) => Ok(ok_text(String::new())),
            Err(PolicyStoreError::Policy(err)) => Err(ApiError::BadRequest(err.to_string())),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use anchor_config::ApiConfig;
    use anchor_policy::WitnessPolicyStore;
    use anchor_storage::{MemStoreProvider, StoreProvider};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;

    async fn router() -> axum::Router<()> {
        let provider = MemStoreProvider::new();
        let store = provider.open_store("anchor-config").await.unwrap();
        RestApi::new(ApiConfig::for_tests(), WitnessPolicyStore::new(store)).into_router()
    }

    #[tokio::test]
    async fn get_before_set_is_not_found() {
        let router = router().await;

        let response = router
            .oneshot(Request::get("/policy").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let router = router().await;

        let response = router
            .clone()
            .oneshot(
                Request::post("/policy")
                    .body(Body::from("OutOf(1,system) AND MinPercent(50,batch)"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/policy").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, "OutOf(1,system) AND MinPercent(50,batch)");
    }

    #[tokio::test]
    async fn invalid_policy_is_a_bad_request() {
        let router = router().await;

        let response = router
            .oneshot(
                Request::post("/policy")
                    .body(Body::from("Test(2,3)"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
