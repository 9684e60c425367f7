#![allow(dead_code)]

use axum::Router;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use trellis_api::app::{AppState, build_router};
use trellis_api::config::{ApiConfig, CacheConfig, RateLimitConfig};
use trellis_api::store::memory::{InMemoryStore, SeedData};

pub const SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const ENGINEERING_ID: &str = "64f0000000000000000000ab";
pub const SALES_ID: &str = "64f0000000000000000000cd";

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".parse().expect("bind"),
        metrics_bind: "127.0.0.1:0".parse().expect("metrics"),
        session_secret: SECRET.to_string(),
        rate_limit: RateLimitConfig::default(),
        context_cache: CacheConfig {
            ttl_secs: 30,
            capacity: 64,
        },
        department_cache: CacheConfig {
            ttl_secs: 600,
            capacity: 64,
        },
        seed_path: None,
    }
}

/// A small org: superadmin, an Engineering manager `m1`, agents `u1`
/// (reports to `m1`) and `u2` (reports to `u1`), an auditor, a disabled
/// account, and `l1`, an older record that names its department instead of
/// storing the id.
pub fn seed() -> SeedData {
    serde_json::from_value(json!({
        "departments": [
            {"_id": ENGINEERING_ID, "name": "Engineering"},
            {"_id": SALES_ID, "name": "Sales"}
        ],
        "roles": [
            {"_id": "r0", "name": "superadmin", "permissions": []},
            {"_id": "r1", "name": "manager", "permissions": [
                {"resource": "tasks", "actions": ["read", "create", "update"],
                 "conditions": {"own": true, "subordinates": true}},
                {"resource": "projects", "actions": ["read"], "conditions": {"department": true}},
                {"resource": "users", "actions": ["read"], "conditions": {"department": true}}
            ]},
            {"_id": "r2", "name": "agent", "permissions": [
                {"resource": "tasks", "actions": ["read", "create", "update"],
                 "conditions": {"assigned": true}},
                {"resource": "projects", "actions": ["read"], "conditions": {"assigned": true}},
                {"resource": "clients", "actions": ["read"], "conditions": {"own": true}},
                {"resource": "users", "actions": ["read"]}
            ]},
            {"_id": "r3", "name": "auditor", "permissions": [
                {"resource": "tasks", "actions": ["*"], "conditions": {"unrestricted": true}}
            ]}
        ],
        "users": [
            {"_id": "admin", "email": "admin@example.com", "name": "Admin", "role": "superadmin"},
            {"_id": "m1", "email": "m1@example.com", "name": "Mia", "role": "manager",
             "department": ENGINEERING_ID},
            {"_id": "u1", "email": "u1@example.com", "name": "Uma", "role": "agent",
             "department": ENGINEERING_ID, "managerId": "m1"},
            {"_id": "u2", "email": "u2@example.com", "name": "Uri", "role": "agent",
             "department": SALES_ID, "managerId": "u1"},
            {"_id": "a1", "email": "a1@example.com", "name": "Ari", "role": "auditor"},
            {"_id": "l1", "email": "l1@example.com", "name": "Lou", "role": "manager",
             "department": "Sales"},
            {"_id": "gone", "email": "gone@example.com", "name": "Gone", "role": "agent",
             "active": false}
        ],
        "tasks": [
            {"_id": "t1", "title": "Ship", "createdBy": "m1", "assignedTo": "u1", "department": ENGINEERING_ID},
            {"_id": "t2", "title": "Review", "createdBy": "u1", "assignedTo": "u2", "department": SALES_ID},
            {"_id": "t3", "title": "Other", "createdBy": "x9", "assignedTo": "x9"},
            {"_id": "t4", "title": "Old", "createdBy": "u2", "assignedTo": "u1", "isDeleted": true}
        ],
        "projects": [
            {"_id": "p1", "ownerId": "x9", "department": ENGINEERING_ID, "teamMembers": ["u1"]},
            {"_id": "p2", "ownerId": "x9", "department": SALES_ID, "teamMembers": ["u2", "u1"]},
            {"_id": "p3", "ownerId": "x9", "department": SALES_ID, "teamMembers": []}
        ],
        "clients": [
            {"_id": "c1", "name": "Acme", "createdBy": "x9", "accountManager": "u1"}
        ]
    }))
    .expect("seed")
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: InMemoryStore,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ApiConfig) -> Self {
        let store = InMemoryStore::with_seed(seed()).expect("seeded store");
        let state = AppState::new(&config, Arc::new(store.clone())).expect("state");
        Self {
            router: build_router(state.clone()),
            state,
            store,
        }
    }

    pub fn token(&self, user_id: &str) -> String {
        self.state
            .sessions
            .mint(user_id, &format!("{user_id}@example.com"), Duration::from_secs(300))
            .expect("token")
    }
}
