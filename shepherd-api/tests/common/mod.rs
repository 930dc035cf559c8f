//! Common test utilities for API integration tests
//!
//! Builds the router in-process over the in-memory store and the local
//! identity provider, and drives it with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use shepherd_api::{
    app::{build_router, AppState},
    config::Config,
};
use shepherd_shared::{
    gateway::{memory::MemoryEntityStore, EntityStore, NewRecord},
    identity::local::LocalIdentityProvider,
    models::{role::Assignment, user::CreateUser},
    testing::Fixture,
};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

pub const PASSWORD: &str = "Corr3ct-horse";

/// Zone Z with area A1 (3 cells, 40 members) and area A2 (2 cells, 15
/// members), plus one account per level
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryEntityStore>,
    pub identity: Arc<LocalIdentityProvider>,

    pub zone: Uuid,
    pub a1: Uuid,
    pub a2: Uuid,
    pub a1_cells: Vec<Uuid>,
    pub a2_cells: Vec<Uuid>,

    pub admin: Uuid,
    pub zone_leader: Uuid,
    pub a1_leader: Uuid,
    pub cell_leader: Uuid,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut f = Fixture::new();
        let zone = f.zone("Zone Z");
        let a1 = f.area(zone, "A1");
        let a2 = f.area(zone, "A2");
        let a1_cells: Vec<Uuid> = (1..=3).map(|i| f.cell(a1, &format!("A1 cell {i}"))).collect();
        let a2_cells: Vec<Uuid> = (1..=2).map(|i| f.cell(a2, &format!("A2 cell {i}"))).collect();
        for (cell, count) in a1_cells.iter().zip([14, 13, 13]) {
            f.members(*cell, count);
        }
        for (cell, count) in a2_cells.iter().zip([8, 7]) {
            f.members(*cell, count);
        }
        f.meeting(a1_cells[0], "2024-03-04", 10, "100.00");
        f.meeting(a1_cells[1], "2024-03-06", 13, "50.50");
        f.meeting(a2_cells[0], "2024-03-12", 6, "20.00");

        let store = Arc::new(MemoryEntityStore::with_snapshot(f.snapshot()));
        let identity = Arc::new(
            LocalIdentityProvider::new(JWT_SECRET)
                .with_profile_store(store.clone() as Arc<dyn EntityStore>),
        );

        let state = AppState::new(store.clone(), identity.clone(), Config::local(JWT_SECRET));
        let app = build_router(state);

        let mut test_app = TestApp {
            app,
            store,
            identity,
            zone,
            a1,
            a2,
            a1_cells,
            a2_cells,
            admin: Uuid::nil(),
            zone_leader: Uuid::nil(),
            a1_leader: Uuid::nil(),
            cell_leader: Uuid::nil(),
        };

        test_app.admin = test_app
            .account("priscilla@example.org", Assignment::SuperAdmin)
            .await;
        test_app.zone_leader = test_app
            .account("grace@example.org", Assignment::ZoneLeader { zone_id: Some(zone) })
            .await;
        test_app.a1_leader = test_app
            .account("lydia@example.org", Assignment::AreaLeader { area_id: Some(a1) })
            .await;
        let first_cell = test_app.a1_cells[0];
        test_app.cell_leader = test_app
            .account(
                "phoebe@example.org",
                Assignment::CellLeader { cell_id: Some(first_cell) },
            )
            .await;

        test_app
    }

    /// Registers an account with [`PASSWORD`] and stores its profile
    pub async fn account(&self, email: &str, assignment: Assignment) -> Uuid {
        let id = self
            .identity
            .register(email, PASSWORD, assignment.role())
            .await
            .unwrap();

        let name = email.split('@').next().unwrap_or(email).to_string();
        self.store
            .create(NewRecord::User(CreateUser {
                id,
                email: email.to_string(),
                name,
                phone: None,
                assignment,
            }))
            .await
            .unwrap();
        id
    }

    /// Signs in and returns the whole login response
    pub async fn login_response(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Signs in with [`PASSWORD`] and returns the API access token
    pub async fn token(&self, email: &str) -> String {
        let (status, body) = self.login_response(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }
}
