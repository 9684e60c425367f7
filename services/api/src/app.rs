//! Trellis HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! Caches are created here and injected; nothing in the access path keeps
//! process-global state.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::auth::SessionVerifier;
use crate::config::ApiConfig;
use crate::middleware::{AccessCacheKey, RateLimiter, ResolvedAccess};
use crate::store::{DirectoryStore, StoreDepartmentDirectory};
use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use trellis_access::{
    DepartmentDirectory, DepartmentResolver, PermissionEvaluator, QueryFilterBuilder,
    ResourceFieldRegistry, SelfScopedResources, TtlCache,
};
use utoipa::OpenApi;

pub const SERVICE_NAME: &str = "trellis-api";

#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub api_version: String,
    pub store: Arc<dyn DirectoryStore>,
    pub sessions: SessionVerifier,
    pub filters: QueryFilterBuilder,
    pub rate_limiter: Arc<RateLimiter>,
    pub trust_proxy_headers: bool,
    pub access_cache: Arc<TtlCache<AccessCacheKey, ResolvedAccess>>,
}

impl AppState {
    pub fn new(config: &ApiConfig, store: Arc<dyn DirectoryStore>) -> anyhow::Result<Self> {
        let sessions =
            SessionVerifier::new(&config.session_secret).context("build session verifier")?;
        let directory: Arc<dyn DepartmentDirectory> =
            Arc::new(StoreDepartmentDirectory::new(store.clone()));
        let department_cache = Arc::new(TtlCache::new(
            Some(config.department_cache.ttl()),
            config.department_cache.capacity,
        ));
        let filters = QueryFilterBuilder::new(
            PermissionEvaluator::new(SelfScopedResources::default()),
            ResourceFieldRegistry::default(),
            DepartmentResolver::new(directory, department_cache),
        );
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit.window(),
            config.rate_limit.max_requests,
        ));
        let access_cache = Arc::new(TtlCache::new(
            Some(config.context_cache.ttl()),
            config.context_cache.capacity,
        ));
        Ok(Self {
            service_name: SERVICE_NAME.to_string(),
            api_version: "v1".to_string(),
            store,
            sessions,
            filters,
            rate_limiter,
            trust_proxy_headers: config.rate_limit.trust_proxy_headers,
            access_cache,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route("/api/v1/system/info", get(api::system::system_info))
        .route("/api/v1/system/health", get(api::system::system_health))
        .route("/api/v1/me", get(api::me::me))
        .route("/api/v1/me/permissions", get(api::me::my_permissions))
        .route(
            "/api/v1/admin/caches/clear",
            post(api::admin::clear_caches),
        )
        .route(
            "/api/v1/data/:resource",
            get(api::records::list_records).post(api::records::create_record),
        )
        .route(
            "/api/v1/data/:resource/:id",
            get(api::records::get_record)
                .patch(api::records::patch_record)
                .delete(api::records::delete_record),
        )
        .route(
            "/api/v1/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        )
        .layer(trace_layer)
        .with_state(state)
}
